//! Handlers for QR token lookups.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/qr/{token}` | `{"alert_id": n}`; 404 for unknown tokens |
//! | `GET`  | `/alerts/{id}/qr` | `{"token": "..."}` |
//! | `POST` | `/alerts/{id}/qr` | 409 once the alert has a token, which is always |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use beacon_core::{alert::AlertId, qr::QrToken, store::AlertRegistry};
use serde_json::{Value, json};

use crate::error::ApiError;

/// `GET /qr/{token}`
pub async fn resolve<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Path(token): Path<String>,
) -> Result<Json<Value>, ApiError> {
  let alert_id = store
    .get_alert_id_by_qr_code(QrToken::new(token))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "alert_id": alert_id })))
}

/// `GET /alerts/{id}/qr`
pub async fn token_of<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Path(id): Path<AlertId>,
) -> Result<Json<Value>, ApiError> {
  let token = store.get_qr_code_by_alert_id(id).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "token": token })))
}

/// `POST /alerts/{id}/qr`
pub async fn generate<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Path(id): Path<AlertId>,
) -> Result<impl IntoResponse, ApiError> {
  let token = store.generate_qr_code(id).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(json!({ "token": token }))))
}
