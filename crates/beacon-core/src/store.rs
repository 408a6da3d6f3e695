//! The `AlertRegistry` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `beacon-store-sqlite`).
//! Higher layers (`beacon-api`, `beacon-server`) depend on this abstraction,
//! not on any concrete backend.

use std::{collections::BTreeSet, future::Future};

use serde::Deserialize;

use crate::{
  Error,
  alert::{Alert, AlertId, AlertStatus, NewAlert},
  attachment::{Attachment, NewAttachment},
  principal::Principal,
  qr::QrToken,
  role::{Role, RoleEvent},
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Registry-wide behaviour switches.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RegistryPolicy {
  /// When set, `add_attachment` requires the caller to hold
  /// [`Role::Authority`] or [`Role::Admin`]. Off by default: any caller may
  /// attach to an existing alert.
  #[serde(default)]
  pub restrict_attachments: bool,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Implemented by backend error types so callers can tell a registry
/// rejection (bad input, missing role, ...) apart from an infrastructure
/// failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The registry rejection behind this error, if it is one.
  fn registry_error(&self) -> Option<&Error>;
}

impl StoreError for Error {
  fn registry_error(&self) -> Option<&Error> { Some(self) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Beacon registry backend.
///
/// Every mutating method takes the verified `caller` and checks its roles,
/// validates input, and applies the change as one atomic step against a
/// single serialization point: a rejected call leaves no trace. Reads never
/// observe a half-applied change.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AlertRegistry: Send + Sync {
  type Error: StoreError;

  // ── Bootstrap ─────────────────────────────────────────────────────────

  /// Grant [`Role::Admin`] to `admin` if the registry has no admin yet.
  /// Returns `true` if the grant happened.
  fn initialize(
    &self,
    admin: Principal,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Access control ────────────────────────────────────────────────────

  /// Add `role` to `principal`. The caller must be an admin. Granting a role
  /// that is already held is a no-op.
  fn grant_role(
    &self,
    caller: Principal,
    principal: Principal,
    role: Role,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove `role` from `principal`. The caller must be an admin. Revoking
  /// an absent role is a no-op; revoking the last admin is rejected.
  ///
  /// Alerts the principal already issued are unaffected.
  fn revoke_role(
    &self,
    caller: Principal,
    principal: Principal,
    role: Role,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn has_role(
    &self,
    principal: Principal,
    role: Role,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn roles_of(
    &self,
    principal: Principal,
  ) -> impl Future<Output = Result<BTreeSet<Role>, Self::Error>> + Send + '_;

  /// The role audit trail, oldest first, optionally for one principal.
  fn role_events(
    &self,
    principal: Option<Principal>,
  ) -> impl Future<Output = Result<Vec<RoleEvent>, Self::Error>> + Send + '_;

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Create an alert issued by `caller`, who must hold [`Role::Authority`].
  ///
  /// Assigns the next sequential id, sets status to `Active`, stamps the
  /// creation time from the registry's clock and binds a fresh QR token, all
  /// in one step. The new id is `alert.alert_id`.
  fn create_alert(
    &self,
    caller: Principal,
    input: NewAlert,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  /// Fails with [`Error::AlertNotFound`] for unknown ids.
  fn get_alert_by_id(
    &self,
    id: AlertId,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  /// Up to `count` alerts in ascending id order, skipping the first `offset`.
  /// An `offset` past the end yields an empty list.
  fn get_alerts(
    &self,
    offset: usize,
    count: usize,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + '_;

  fn alert_count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Move alert `id` from `Active` to `new_status`. The caller must hold
  /// [`Role::Authority`] or [`Role::Admin`]. Only the status field changes.
  fn change_alert_status(
    &self,
    caller: Principal,
    id: AlertId,
    new_status: AlertStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── QR index ──────────────────────────────────────────────────────────

  /// Bind a token to an existing alert that has none. Since
  /// [`create_alert`](Self::create_alert) always binds one, calling this for
  /// any created alert fails with [`Error::AlreadyBound`].
  fn generate_qr_code(
    &self,
    alert_id: AlertId,
  ) -> impl Future<Output = Result<QrToken, Self::Error>> + Send + '_;

  /// Fails with [`Error::TokenNotFound`] for unknown tokens.
  fn get_alert_id_by_qr_code(
    &self,
    token: QrToken,
  ) -> impl Future<Output = Result<AlertId, Self::Error>> + Send + '_;

  /// Reverse lookup. Fails with [`Error::AlertNotFound`] for unknown alerts.
  fn get_qr_code_by_alert_id(
    &self,
    alert_id: AlertId,
  ) -> impl Future<Output = Result<QrToken, Self::Error>> + Send + '_;

  // ── Attachments ───────────────────────────────────────────────────────

  /// Append an attachment to an existing alert. Role requirements depend on
  /// [`RegistryPolicy::restrict_attachments`].
  fn add_attachment(
    &self,
    caller: Principal,
    alert_id: AlertId,
    input: NewAttachment,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  /// All attachments of an existing alert in insertion order; empty if it
  /// has none.
  fn get_attachments(
    &self,
    alert_id: AlertId,
  ) -> impl Future<Output = Result<Vec<Attachment>, Self::Error>> + Send + '_;
}
