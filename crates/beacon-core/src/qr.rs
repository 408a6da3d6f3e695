//! QR tokens: the secondary lookup key printed on scannable codes.
//!
//! Tokens are derived, not drawn: `SHA-256(domain ‖ salt ‖ alert_id)` cut to
//! 128 bits and hex-encoded. The salt is generated once per registry and never
//! leaves it, so a token cannot be guessed from its alert id, yet the same
//! registry always derives the same token for the same id.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::alert::AlertId;

const DOMAIN: &[u8] = b"beacon/qr-token/v1";

/// Bytes of digest kept in a token.
pub const TOKEN_BYTES: usize = 16;

/// Length of a per-registry salt.
pub const SALT_BYTES: usize = 32;

/// An opaque lookup token bound to exactly one alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrToken(String);

impl QrToken {
  /// Wrap a caller-supplied token string for lookup. No format is enforced;
  /// an unknown token simply fails to resolve.
  pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }

  /// Derive the token for `alert_id` under `salt`.
  pub fn mint(salt: &[u8], alert_id: AlertId) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    hasher.update((salt.len() as u64).to_be_bytes());
    hasher.update(salt);
    hasher.update(alert_id.get().to_be_bytes());
    let digest = hasher.finalize();
    Self(hex::encode(&digest[..TOKEN_BYTES]))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for QrToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}
