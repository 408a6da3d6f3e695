//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enumerations are stored as
//! their lowercase tags. Alert ids are SQLite integers.

use std::collections::BTreeSet;

use beacon_core::{
  ValidationError,
  alert::{Alert, AlertId, AlertStatus, AlertType},
  attachment::Attachment,
  principal::Principal,
  qr::{QrToken, SALT_BYTES},
  role::{Role, RoleAction, RoleEvent},
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, types::Type};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AlertId ─────────────────────────────────────────────────────────────────

/// `None` if the id cannot exist in SQLite (above `i64::MAX`).
pub fn encode_alert_id(id: AlertId) -> Option<i64> { i64::try_from(id.get()).ok() }

pub fn decode_alert_id(raw: i64) -> Result<AlertId> {
  u64::try_from(raw)
    .map(AlertId)
    .map_err(|_| Error::Corrupt(format!("negative alert id {raw}")))
}

// ─── Enumerations and principals ─────────────────────────────────────────────

fn corrupt(e: ValidationError) -> Error { Error::Corrupt(e.to_string()) }

pub fn decode_principal(s: String) -> Result<Principal> {
  Principal::new(s).map_err(corrupt)
}

/// Parse a text column inside a connection closure, reporting failures as a
/// rusqlite conversion error on column `idx`.
pub fn parse_column<T>(
  idx: usize,
  value: &str,
  parse: fn(&str) -> std::result::Result<T, ValidationError>,
) -> rusqlite::Result<T> {
  parse(value)
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_role_action(s: &str) -> std::result::Result<RoleAction, ValidationError> {
  s.parse().map_err(|_| ValidationError::UnknownVariant {
    field: "role action",
    value: s.to_owned(),
  })
}

// ─── Salt ────────────────────────────────────────────────────────────────────

pub fn decode_salt(s: &str) -> Result<[u8; SALT_BYTES]> {
  let bytes = hex::decode(s).map_err(|e| Error::Corrupt(format!("qr salt: {e}")))?;
  bytes
    .try_into()
    .map_err(|b: Vec<u8>| Error::Corrupt(format!("qr salt has {} bytes", b.len())))
}

// ─── Shared queries ──────────────────────────────────────────────────────────

/// Roles currently held by `principal`.
pub fn held_roles(conn: &Connection, principal: &Principal) -> rusqlite::Result<BTreeSet<Role>> {
  let mut stmt = conn.prepare_cached("SELECT role FROM roles WHERE principal = ?1")?;
  let tags = stmt
    .query_map([principal.as_str()], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  tags.iter().map(|t| parse_column(0, t, Role::parse)).collect()
}

pub fn alert_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM alerts WHERE alert_id = ?1)",
    [id],
    |r| r.get(0),
  )
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawAlert::from_row`].
pub const ALERT_SELECT: &str = "
  SELECT a.alert_id, a.title, a.location, a.alert_type, a.status,
         a.content_ref, a.issuer, a.created_at, a.latitude, a.longitude,
         q.token
  FROM alerts a
  LEFT JOIN qr_codes q ON q.alert_id = a.alert_id";

/// Raw values read directly from an `alerts` row joined with its token.
pub struct RawAlert {
  pub alert_id:    i64,
  pub title:       String,
  pub location:    String,
  pub alert_type:  String,
  pub status:      String,
  pub content_ref: String,
  pub issuer:      String,
  pub created_at:  String,
  pub latitude:    i64,
  pub longitude:   i64,
  pub qr_token:    Option<String>,
}

impl RawAlert {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:    row.get(0)?,
      title:       row.get(1)?,
      location:    row.get(2)?,
      alert_type:  row.get(3)?,
      status:      row.get(4)?,
      content_ref: row.get(5)?,
      issuer:      row.get(6)?,
      created_at:  row.get(7)?,
      latitude:    row.get(8)?,
      longitude:   row.get(9)?,
      qr_token:    row.get(10)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    let alert_id = decode_alert_id(self.alert_id)?;
    let qr_token = self
      .qr_token
      .map(QrToken::new)
      .ok_or_else(|| Error::Corrupt(format!("alert {alert_id} has no qr token")))?;

    Ok(Alert {
      alert_id,
      title: self.title,
      location: self.location,
      alert_type: AlertType::parse(&self.alert_type).map_err(corrupt)?,
      status: AlertStatus::parse(&self.status).map_err(corrupt)?,
      content_ref: self.content_ref,
      issuer: decode_principal(self.issuer)?,
      created_at: decode_dt(&self.created_at)?,
      latitude: self.latitude,
      longitude: self.longitude,
      qr_token,
    })
  }
}

/// Raw values read directly from an `attachments` row.
pub struct RawAttachment {
  pub alert_id:     i64,
  pub kind:         String,
  pub content_hash: String,
  pub added_by:     String,
  pub appended_at:  String,
}

impl RawAttachment {
  pub fn into_attachment(self) -> Result<Attachment> {
    Ok(Attachment {
      alert_id:     decode_alert_id(self.alert_id)?,
      kind:         self.kind,
      content_hash: self.content_hash,
      added_by:     decode_principal(self.added_by)?,
      appended_at:  decode_dt(&self.appended_at)?,
    })
  }
}

/// Raw values read directly from a `role_events` row.
pub struct RawRoleEvent {
  pub principal:   String,
  pub role:        String,
  pub action:      String,
  pub actor:       String,
  pub recorded_at: String,
}

impl RawRoleEvent {
  pub fn into_event(self) -> Result<RoleEvent> {
    Ok(RoleEvent {
      principal:   decode_principal(self.principal)?,
      role:        Role::parse(&self.role).map_err(corrupt)?,
      action:      parse_role_action(&self.action).map_err(corrupt)?,
      actor:       decode_principal(self.actor)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alert_ids_beyond_i64_cannot_be_encoded() {
    assert_eq!(encode_alert_id(AlertId(5)), Some(5));
    assert_eq!(encode_alert_id(AlertId(u64::MAX)), None);
  }

  #[test]
  fn salt_must_have_exact_length() {
    assert!(decode_salt(&hex::encode([1u8; SALT_BYTES])).is_ok());
    assert!(matches!(decode_salt("abcd"), Err(Error::Corrupt(_))));
    assert!(matches!(decode_salt("not hex"), Err(Error::Corrupt(_))));
  }

  #[test]
  fn dt_roundtrip_preserves_instant() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }
}
