//! Handlers for `/alerts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/alerts` | Optional `?offset=&count=`; ascending id order |
//! | `POST` | `/alerts` | Body: [`NewAlert`]; returns 201 + stored alert |
//! | `GET`  | `/alerts/count` | `{"count": n}` |
//! | `GET`  | `/alerts/{id}` | 404 if not found |
//! | `POST` | `/alerts/{id}/status` | Body: `{"status":"resolved"}`; returns 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use beacon_core::{
  alert::{Alert, AlertId, AlertStatus, NewAlert},
  store::AlertRegistry,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  caller::Caller,
  error::{ApiError, JsonBody},
};

/// Page size used when `count` is omitted.
pub const DEFAULT_PAGE_SIZE: usize = 20;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub offset: usize,
  pub count:  Option<usize>,
}

/// `GET /alerts[?offset=<n>][&count=<n>]`
pub async fn list<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Alert>>, ApiError> {
  let alerts = store
    .get_alerts(params.offset, params.count.unwrap_or(DEFAULT_PAGE_SIZE))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(alerts))
}

/// `GET /alerts/count`
pub async fn count<S: AlertRegistry>(
  State(store): State<Arc<S>>,
) -> Result<Json<Value>, ApiError> {
  let n = store.alert_count().await.map_err(ApiError::store)?;
  Ok(Json(json!({ "count": n })))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /alerts`: returns 201 + the stored [`Alert`].
pub async fn create<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  JsonBody(body): JsonBody<NewAlert>,
) -> Result<impl IntoResponse, ApiError> {
  let alert = store.create_alert(caller, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(alert)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /alerts/{id}`
pub async fn get_one<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Path(id): Path<AlertId>,
) -> Result<Json<Alert>, ApiError> {
  let alert = store.get_alert_by_id(id).await.map_err(ApiError::store)?;
  Ok(Json(alert))
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: AlertStatus,
}

/// `POST /alerts/{id}/status` with body `{"status":"resolved"|"expired"}`
pub async fn change_status<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  Path(id): Path<AlertId>,
  JsonBody(body): JsonBody<StatusBody>,
) -> Result<StatusCode, ApiError> {
  store
    .change_alert_status(caller, id, body.status)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
