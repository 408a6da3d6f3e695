//! Alert records and their status lifecycle.
//!
//! An alert's body (title, location, type, issuer, creation time and
//! coordinates) is immutable once written. The only post-creation mutation is
//! a single status change out of [`AlertStatus::Active`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result, ValidationError, principal::Principal, qr::QrToken};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Sequential alert identifier. The first alert ever created is `1`; ids are
/// never reused or skipped.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AlertId(pub u64);

impl AlertId {
  pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for AlertId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Severity class of an alert.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertType {
  Emergency,
  Warning,
  Information,
  Safe,
}

impl AlertType {
  pub fn parse(s: &str) -> Result<Self, ValidationError> {
    s.parse().map_err(|_| ValidationError::UnknownVariant {
      field: "alert type",
      value: s.to_owned(),
    })
  }
}

/// Lifecycle status of an alert.
///
/// ```text
///            ┌──> Resolved
///   Active ──┤
///            └──> Expired
/// ```
///
/// `Resolved` and `Expired` are both terminal and unreachable from each
/// other. Nothing moves back into `Active`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertStatus {
  Active,
  Resolved,
  Expired,
}

impl AlertStatus {
  pub fn parse(s: &str) -> Result<Self, ValidationError> {
    s.parse().map_err(|_| ValidationError::UnknownVariant {
      field: "alert status",
      value: s.to_owned(),
    })
  }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::Active) }

  /// Validate a status change for alert `id` and return the new status.
  pub fn transition(self, id: AlertId, to: AlertStatus) -> Result<AlertStatus> {
    if self.is_terminal() || !to.is_terminal() {
      return Err(Error::InvalidTransition { id, from: self, to });
    }
    Ok(to)
  }
}

// ─── Coordinates ─────────────────────────────────────────────────────────────

/// Fixed-point scale for coordinates: decimal degrees × 10⁶.
pub const MICRODEGREES: i64 = 1_000_000;
pub const MAX_LATITUDE: i64 = 90 * MICRODEGREES;
pub const MAX_LONGITUDE: i64 = 180 * MICRODEGREES;

// ─── Alert ───────────────────────────────────────────────────────────────────

/// A stored alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
  pub alert_id:    AlertId,
  pub title:       String,
  pub location:    String,
  pub alert_type:  AlertType,
  pub status:      AlertStatus,
  /// Opaque content hash pointing at the off-registry detail payload.
  pub content_ref: String,
  pub issuer:      Principal,
  /// Supplied by the registry's clock at creation; never changes.
  pub created_at:  DateTime<Utc>,
  /// Microdegrees.
  pub latitude:    i64,
  /// Microdegrees.
  pub longitude:   i64,
  pub qr_token:    QrToken,
}

// ─── NewAlert ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::AlertRegistry::create_alert`].
///
/// The id, status, issuer, timestamp and token are assigned by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
  pub title:       String,
  pub location:    String,
  pub alert_type:  AlertType,
  pub content_ref: String,
  pub latitude:    i64,
  pub longitude:   i64,
}

impl NewAlert {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.title.trim().is_empty() {
      return Err(ValidationError::EmptyTitle);
    }
    if self.location.trim().is_empty() {
      return Err(ValidationError::EmptyLocation);
    }
    if !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&self.latitude) {
      return Err(ValidationError::LatitudeOutOfRange(self.latitude));
    }
    if !(-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&self.longitude) {
      return Err(ValidationError::LongitudeOutOfRange(self.longitude));
    }
    Ok(())
  }
}
