//! Error types for `beacon-core`.
//!
//! Every rejection the registry can produce is one of five kinds (see
//! [`ErrorKind`]). All of them are detected before any state is touched, so a
//! returned error always means "nothing changed".

use thiserror::Error;

use crate::{
  alert::{AlertId, AlertStatus},
  principal::Principal,
  qr::QrToken,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{principal} is not permitted to {action}")]
  Unauthorized {
    principal: Principal,
    action:    &'static str,
  },

  #[error("alert not found: {0}")]
  AlertNotFound(AlertId),

  #[error("qr token not found: {0}")]
  TokenNotFound(QrToken),

  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  #[error("alert {id} cannot move from {from} to {to}")]
  InvalidTransition {
    id:   AlertId,
    from: AlertStatus,
    to:   AlertStatus,
  },

  #[error("alert {0} already has a qr token")]
  AlreadyBound(AlertId),
}

/// Malformed or missing input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("principal cannot be empty")]
  EmptyPrincipal,

  #[error("title cannot be empty")]
  EmptyTitle,

  #[error("location cannot be empty")]
  EmptyLocation,

  #[error("latitude {0} is outside ±90 degrees")]
  LatitudeOutOfRange(i64),

  #[error("longitude {0} is outside ±180 degrees")]
  LongitudeOutOfRange(i64),

  #[error("attachment type cannot be empty")]
  EmptyAttachmentType,

  #[error("content hash cannot be empty")]
  EmptyContentHash,

  #[error("unrecognised {field} value: {value:?}")]
  UnknownVariant {
    field: &'static str,
    value: String,
  },

  #[error("{0} is the last admin and cannot lose the admin role")]
  LastAdmin(Principal),
}

/// Coarse classification of an [`Error`], used by transport layers to pick a
/// response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Unauthorized,
  NotFound,
  Validation,
  InvalidTransition,
  AlreadyBound,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthorized { .. } => ErrorKind::Unauthorized,
      Self::AlertNotFound(_) | Self::TokenNotFound(_) => ErrorKind::NotFound,
      Self::Validation(_) => ErrorKind::Validation,
      Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Self::AlreadyBound(_) => ErrorKind::AlreadyBound,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
