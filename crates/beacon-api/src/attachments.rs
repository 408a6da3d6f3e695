//! Handlers for `/alerts/{id}/attachments`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/alerts/{id}/attachments` | Insertion order; 404 if the alert is unknown |
//! | `POST` | `/alerts/{id}/attachments` | Body: `{"type":"image","content_hash":"Qm..."}`; returns 201 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use beacon_core::{
  alert::AlertId,
  attachment::{Attachment, NewAttachment},
  store::AlertRegistry,
};

use crate::{
  caller::Caller,
  error::{ApiError, JsonBody},
};

/// `GET /alerts/{id}/attachments`
pub async fn list<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Path(id): Path<AlertId>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
  let attachments = store.get_attachments(id).await.map_err(ApiError::store)?;
  Ok(Json(attachments))
}

/// `POST /alerts/{id}/attachments`: returns 201 + the stored [`Attachment`].
pub async fn add<S: AlertRegistry>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  Path(id): Path<AlertId>,
  JsonBody(body): JsonBody<NewAttachment>,
) -> Result<impl IntoResponse, ApiError> {
  let attachment = store.add_attachment(caller, id, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(attachment)))
}
