//! Beacon server wiring: configuration and the top-level HTTP router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use beacon_core::{
  principal::Principal,
  store::{AlertRegistry, RegistryPolicy},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BEACON_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Granted the admin role when the registry has no admin yet.
  pub bootstrap_admin:      Principal,
  /// Require authority or admin to add attachments.
  #[serde(default)]
  pub restrict_attachments: bool,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BEACON"))
      .build()?
      .try_deserialize()
  }

  pub fn policy(&self) -> RegistryPolicy {
    RegistryPolicy { restrict_attachments: self.restrict_attachments }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API under `/api`, a liveness probe at `/healthz`, and request tracing.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: AlertRegistry + 'static,
{
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", beacon_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
