//! Roles and the permission table vocabulary.
//!
//! Permissions are a flat tag set per principal, not a hierarchy: holding
//! [`Role::Admin`] does not imply [`Role::Authority`] or vice versa. Each
//! operation names the roles that may perform it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result, ValidationError, principal::Principal};

/// A permission tag a principal may hold.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  /// May grant and revoke roles.
  Admin,
  /// May create alerts and change their status.
  Authority,
}

impl Role {
  /// Parse the lowercase tag used on the wire and in storage.
  pub fn parse(s: &str) -> Result<Self, ValidationError> {
    s.parse().map_err(|_| ValidationError::UnknownVariant {
      field: "role",
      value: s.to_owned(),
    })
  }
}

/// Roles permitted to create alerts.
pub const CREATE_ALERT: &[Role] = &[Role::Authority];
/// Roles permitted to move an alert out of `Active`.
pub const CHANGE_STATUS: &[Role] = &[Role::Authority, Role::Admin];
/// Roles permitted to manage role membership.
pub const MANAGE_ROLES: &[Role] = &[Role::Admin];
/// Roles permitted to append attachments when attachments are restricted.
pub const ADD_ATTACHMENT: &[Role] = &[Role::Authority, Role::Admin];

/// Succeeds iff `held` contains at least one of `allowed`.
pub fn authorize(
  principal: &Principal,
  held: &BTreeSet<Role>,
  allowed: &[Role],
  action: &'static str,
) -> Result<()> {
  if allowed.iter().any(|r| held.contains(r)) {
    Ok(())
  } else {
    Err(Error::Unauthorized { principal: principal.clone(), action })
  }
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoleAction {
  Granted,
  Revoked,
}

/// One effective change to the permission table. Idempotent no-op grants and
/// revocations are not recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEvent {
  pub principal:   Principal,
  pub role:        Role,
  pub action:      RoleAction,
  /// The admin who made the change, or the bootstrap principal itself for
  /// the initial admin grant.
  pub actor:       Principal,
  pub recorded_at: DateTime<Utc>,
}
