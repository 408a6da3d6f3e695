//! JSON REST API for Beacon.
//!
//! Exposes an axum [`Router`] backed by any
//! [`beacon_core::store::AlertRegistry`]. Authentication, TLS, and transport
//! concerns are the caller's responsibility: mutating routes read the
//! already-verified principal from [`caller::PRINCIPAL_HEADER`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", beacon_api::api_router(store.clone()))
//! ```

pub mod alerts;
pub mod attachments;
pub mod caller;
pub mod error;
pub mod qr;
pub mod roles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use beacon_core::store::AlertRegistry;

pub use caller::{Caller, PRINCIPAL_HEADER};
pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AlertRegistry + 'static,
{
  Router::new()
    // Alerts
    .route("/alerts", get(alerts::list::<S>).post(alerts::create::<S>))
    .route("/alerts/count", get(alerts::count::<S>))
    .route("/alerts/{id}", get(alerts::get_one::<S>))
    .route("/alerts/{id}/status", post(alerts::change_status::<S>))
    // QR index
    .route("/alerts/{id}/qr", get(qr::token_of::<S>).post(qr::generate::<S>))
    .route("/qr/{token}", get(qr::resolve::<S>))
    // Attachments
    .route(
      "/alerts/{id}/attachments",
      get(attachments::list::<S>).post(attachments::add::<S>),
    )
    // Access control
    .route("/roles/{principal}", get(roles::list::<S>))
    .route(
      "/roles/{principal}/{role}",
      get(roles::check::<S>).put(roles::grant::<S>).delete(roles::revoke::<S>),
    )
    .route("/role-events", get(roles::events::<S>))
    .with_state(store)
}
