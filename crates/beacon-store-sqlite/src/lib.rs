//! SQLite backend for the Beacon alert registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on one dedicated
//! connection thread without blocking the async runtime. That thread is the
//! registry's single serialization point: every mutating call runs as one
//! closure inside one transaction on it.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
