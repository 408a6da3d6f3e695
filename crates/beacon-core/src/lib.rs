//! Core types and trait definitions for the Beacon alert registry.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it performs no I/O of its own.

pub mod alert;
pub mod attachment;
pub mod clock;
pub mod error;
pub mod principal;
pub mod qr;
pub mod role;
pub mod store;

pub use error::{Error, ErrorKind, Result, ValidationError};
