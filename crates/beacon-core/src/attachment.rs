//! Attachments: auxiliary `(type, content hash)` references hung off an
//! alert.
//!
//! The registry stores only the hash string. Fetching and verifying the bytes
//! behind it is the content store's business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ValidationError, alert::AlertId, principal::Principal};

/// A stored attachment reference. Attachments for an alert are append-only
/// and always listed in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
  pub alert_id:     AlertId,
  /// Short tag, e.g. `"image"` or `"document"`.
  #[serde(rename = "type")]
  pub kind:         String,
  pub content_hash: String,
  pub added_by:     Principal,
  pub appended_at:  DateTime<Utc>,
}

/// Input to [`crate::store::AlertRegistry::add_attachment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
  #[serde(rename = "type")]
  pub kind:         String,
  pub content_hash: String,
}

impl NewAttachment {
  pub fn new(kind: impl Into<String>, content_hash: impl Into<String>) -> Self {
    Self { kind: kind.into(), content_hash: content_hash.into() }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.kind.trim().is_empty() {
      return Err(ValidationError::EmptyAttachmentType);
    }
    if self.content_hash.trim().is_empty() {
      return Err(ValidationError::EmptyContentHash);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_fields_are_rejected() {
    assert_eq!(
      NewAttachment::new("", "QmImageHash").validate(),
      Err(ValidationError::EmptyAttachmentType)
    );
    assert_eq!(
      NewAttachment::new("image", " ").validate(),
      Err(ValidationError::EmptyContentHash)
    );
    assert_eq!(NewAttachment::new("image", "QmImageHash").validate(), Ok(()));
  }

  #[test]
  fn kind_is_serialised_as_type() {
    let json = serde_json::to_value(NewAttachment::new("image", "QmImageHash")).unwrap();
    assert_eq!(json["type"], "image");
    assert_eq!(json["content_hash"], "QmImageHash");
  }
}
