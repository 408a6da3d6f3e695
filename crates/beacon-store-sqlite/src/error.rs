//! Error type for `beacon-store-sqlite`.

use beacon_core::{ValidationError, store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The registry rejected the call; nothing was written.
  #[error(transparent)]
  Registry(#[from] beacon_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row does not decode into a domain value.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl From<ValidationError> for Error {
  fn from(e: ValidationError) -> Self { Self::Registry(e.into()) }
}

impl StoreError for Error {
  fn registry_error(&self) -> Option<&beacon_core::Error> {
    match self {
      Self::Registry(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
