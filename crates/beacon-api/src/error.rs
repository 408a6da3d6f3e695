//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{FromRequest, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use beacon_core::{ErrorKind, store::StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No verified principal accompanied the request.
  #[error("missing or empty caller principal")]
  MissingCaller,

  /// The registry refused the call.
  #[error("{message}")]
  Rejected { kind: ErrorKind, message: String },

  /// The request body was not valid JSON for the route's input type.
  #[error("{0}")]
  Body(#[from] JsonRejection),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: registry rejections keep their kind,
  /// everything else is an internal failure.
  pub fn store<E: StoreError>(e: E) -> Self {
    if let Some(rejection) = e.registry_error() {
      return Self::Rejected { kind: rejection.kind(), message: rejection.to_string() };
    }
    Self::Store(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::MissingCaller => StatusCode::UNAUTHORIZED,
      ApiError::Rejected { kind, .. } => match kind {
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidTransition | ErrorKind::AlreadyBound => StatusCode::CONFLICT,
      },
      ApiError::Body(rejection) => rejection.status(),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

/// [`Json`] extractor whose rejections use the API's JSON error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
