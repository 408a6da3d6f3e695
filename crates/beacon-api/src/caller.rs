//! Extractor for the verified caller principal.
//!
//! Authentication happens upstream (a reverse proxy or gateway); by the time
//! a request arrives here its principal has been verified and placed in
//! [`PRINCIPAL_HEADER`]. This layer trusts that value as-is.

use axum::{extract::FromRequestParts, http::request::Parts};
use beacon_core::principal::Principal;

use crate::error::ApiError;

pub const PRINCIPAL_HEADER: &str = "x-beacon-principal";

/// The principal on whose behalf the request is made.
pub struct Caller(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(PRINCIPAL_HEADER)
      .and_then(|v| v.to_str().ok())
      .ok_or(ApiError::MissingCaller)?;
    let principal = Principal::new(raw).map_err(|_| ApiError::MissingCaller)?;
    Ok(Caller(principal))
  }
}
