//! beacon server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite registry, makes sure it has an admin, and serves the JSON API over
//! HTTP.
//!
//! # Offline administration
//!
//! Role management can also be done directly against the store file, acting
//! as an existing admin:
//!
//! ```text
//! beacon grant --as ops alice authority
//! beacon roles alice
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use beacon_core::{principal::Principal, role::Role, store::AlertRegistry};
use beacon_server::{ServerConfig, expand_tilde};
use beacon_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Beacon alert registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Grant a role, acting as an existing admin.
  Grant {
    /// The admin performing the grant.
    #[arg(long = "as")]
    caller:    Principal,
    principal: Principal,
    role:      Role,
  },
  /// Revoke a role, acting as an existing admin.
  Revoke {
    #[arg(long = "as")]
    caller:    Principal,
    principal: Principal,
    role:      Role,
  },
  /// List the roles a principal holds.
  Roles { principal: Principal },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_policy(server_cfg.policy());

  if store
    .initialize(server_cfg.bootstrap_admin.clone())
    .await
    .context("failed to initialise registry")?
  {
    tracing::info!(admin = %server_cfg.bootstrap_admin, "granted admin to bootstrap principal");
  }

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::Grant { caller, principal, role } => {
      store
        .grant_role(caller, principal.clone(), role)
        .await
        .context("grant failed")?;
      println!("{principal} now holds {role}");
      Ok(())
    }
    Command::Revoke { caller, principal, role } => {
      store
        .revoke_role(caller, principal.clone(), role)
        .await
        .context("revoke failed")?;
      println!("{principal} no longer holds {role}");
      Ok(())
    }
    Command::Roles { principal } => {
      let roles = store.roles_of(principal).await.context("role lookup failed")?;
      for role in roles {
        println!("{role}");
      }
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  tracing::info!(
    restrict_attachments = store.policy().restrict_attachments,
    "attachment policy"
  );
  let app = beacon_server::app(Arc::new(store));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
