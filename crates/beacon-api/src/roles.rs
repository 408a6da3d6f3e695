//! Handlers for `/roles` and `/role-events`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/roles/{principal}` | Array of role tags |
//! | `GET`    | `/roles/{principal}/{role}` | `{"has_role": bool}` |
//! | `PUT`    | `/roles/{principal}/{role}` | Grant; admin only; 204 |
//! | `DELETE` | `/roles/{principal}/{role}` | Revoke; admin only; 204 |
//! | `GET`    | `/role-events` | Optional `?principal=`; oldest first |

use std::{collections::BTreeSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use beacon_core::{
  principal::Principal,
  role::{Role, RoleEvent},
  store::AlertRegistry,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{caller::Caller, error::ApiError};

/// `GET /roles/{principal}`
pub async fn list<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Path(principal): Path<Principal>,
) -> Result<Json<BTreeSet<Role>>, ApiError> {
  let roles = store.roles_of(principal).await.map_err(ApiError::store)?;
  Ok(Json(roles))
}

/// `GET /roles/{principal}/{role}`
pub async fn check<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Path((principal, role)): Path<(Principal, Role)>,
) -> Result<Json<Value>, ApiError> {
  let has_role = store.has_role(principal, role).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "has_role": has_role })))
}

/// `PUT /roles/{principal}/{role}`
pub async fn grant<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  Path((principal, role)): Path<(Principal, Role)>,
) -> Result<StatusCode, ApiError> {
  store.grant_role(caller, principal, role).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /roles/{principal}/{role}`
pub async fn revoke<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  Path((principal, role)): Path<(Principal, Role)>,
) -> Result<StatusCode, ApiError> {
  store.revoke_role(caller, principal, role).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct EventParams {
  pub principal: Option<Principal>,
}

/// `GET /role-events[?principal=<id>]`
pub async fn events<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Query(params): Query<EventParams>,
) -> Result<Json<Vec<RoleEvent>>, ApiError> {
  let events = store.role_events(params.principal).await.map_err(ApiError::store)?;
  Ok(Json(events))
}
