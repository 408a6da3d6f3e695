//! Principal: the opaque caller identity handed to the registry.
//!
//! The registry never authenticates anyone. Whatever sits in front of it
//! (a reverse proxy, a wallet bridge, an admin shell) verifies the caller and
//! passes the resulting identity along as a [`Principal`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// A verified caller identity, e.g. an account id or an address.
///
/// Guaranteed non-blank; surrounding whitespace is stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
  pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
    let s = s.into();
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Err(ValidationError::EmptyPrincipal);
    }
    if trimmed.len() == s.len() {
      Ok(Self(s))
    } else {
      Ok(Self(trimmed.to_owned()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Principal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for Principal {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl TryFrom<String> for Principal {
  type Error = ValidationError;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::new(s) }
}

impl From<Principal> for String {
  fn from(p: Principal) -> Self { p.0 }
}
