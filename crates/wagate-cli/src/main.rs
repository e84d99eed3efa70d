//! CLI entry point for wagate.
//!
//! The `wagate` binary wires the session store, channel registry, push
//! channel and gateway together and dispatches the subcommands. The wire
//! protocol itself lives out of tree: deployments link a backend crate
//! implementing [`ProtocolConnector`] and register it in
//! [`protocol_connector`]; without one the session subcommands refuse to
//! run, while `migrate` and `status` work against the store alone.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wagate_session::{
    ProtocolConnector, PushChannel, SendOutcome, SessionError, SessionGateway, StartOutcome,
};
use wagate_store::{ChannelRegistry, Database, DocumentStore, SqliteDocumentStore};

mod cli;
mod config;
mod migrate;

use cli::{Cli, Commands};
use config::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let cli = Cli::parse();
    let config = GatewayConfig::load();

    match cli.command {
        Commands::Migrate {
            auth_dir,
            client_id,
        } => cmd_migrate(&config, &auth_dir, &client_id).await,
        Commands::StartSession { user_id } => cmd_start_session(&config, &user_id).await,
        Commands::Send {
            user_id,
            target,
            message,
        } => cmd_send(&config, &user_id, &target, &message).await,
        Commands::Status => cmd_status(&config).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn cmd_migrate(config: &GatewayConfig, auth_dir: &Path, client_id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let report = migrate::import_auth_dir(&store, auth_dir, client_id, config.retention()).await?;

    println!(
        "migrated {} rows for {client_id} ({} failed, {} skipped)",
        report.migrated, report.failed, report.skipped
    );
    Ok(())
}

async fn cmd_start_session(config: &GatewayConfig, user_id: &str) -> Result<()> {
    let gateway = build_gateway(config).await?;

    match gateway.start_session(user_id).await {
        Ok(StartOutcome::AlreadyActive { .. }) => {
            println!("session for {user_id} is already active");
            Ok(())
        }
        Ok(StartOutcome::Paired { .. }) => {
            println!("session for {user_id} paired");
            Ok(())
        }
        Err(SessionError::ExpiredSession) => {
            anyhow::bail!("pairing was rejected; stored credentials are no longer valid")
        }
        Err(SessionError::ConnectionTimeout) => {
            anyhow::bail!(
                "pairing timed out after {}s; no token was scanned",
                config.pairing_timeout_secs
            )
        }
        Err(err) => Err(err).context("start-session failed"),
    }
}

async fn cmd_send(config: &GatewayConfig, user_id: &str, target: &str, message: &str) -> Result<()> {
    let gateway = build_gateway(config).await?;

    match gateway.send_message(user_id, target, message).await {
        Ok(SendOutcome::NoSession) => {
            anyhow::bail!("{user_id} has no active session; run start-session first")
        }
        Ok(SendOutcome::Sent { message_id }) => {
            println!("sent {message_id} to {target}");
            Ok(())
        }
        Err(SessionError::ExpiredSession) => {
            anyhow::bail!("session expired; re-pair with start-session")
        }
        Err(SessionError::ConnectionTimeout) => {
            anyhow::bail!(
                "connection did not open within {}s",
                config.send_timeout_secs
            )
        }
        Err(err) => Err(err).context("send failed"),
    }
}

async fn cmd_status(config: &GatewayConfig) -> Result<()> {
    let db = Database::open_and_migrate(config.db_path.clone())
        .await
        .context("opening session database")?;

    let (clients, rows, connections) = db
        .execute(|conn| {
            let clients: i64 = conn.query_row(
                "SELECT count(DISTINCT client_id) FROM session_rows",
                [],
                |row| row.get(0),
            )?;
            let rows: i64 =
                conn.query_row("SELECT count(*) FROM session_rows", [], |row| row.get(0))?;
            let connections: i64 = conn.query_row(
                "SELECT count(*) FROM channel_connections",
                [],
                |row| row.get(0),
            )?;
            Ok((clients, rows, connections))
        })
        .await?;

    println!("database:            {}", config.db_path.display());
    println!("clients:             {clients}");
    println!("session rows:        {rows}");
    println!("channel connections: {connections}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

async fn open_store(config: &GatewayConfig) -> Result<Arc<dyn DocumentStore>> {
    let db = Database::open_and_migrate(config.db_path.clone())
        .await
        .context("opening session database")?;
    Ok(Arc::new(SqliteDocumentStore::new(db)))
}

async fn build_gateway(config: &GatewayConfig) -> Result<SessionGateway> {
    let connector = protocol_connector()?;

    let db = Database::open_and_migrate(config.db_path.clone())
        .await
        .context("opening session database")?;
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(db.clone()));

    anyhow::ensure!(
        !config.push_endpoint.is_empty(),
        "push_endpoint is not configured; set it in {} or WAGATE_PUSH_ENDPOINT",
        config::CONFIG_FILE
    );
    let push = PushChannel::new(&config.push_endpoint).context("configuring push endpoint")?;

    Ok(SessionGateway::new(
        store,
        ChannelRegistry::new(db),
        push,
        connector,
        config.retention(),
        config.timeouts(),
    ))
}

/// The protocol backend registration point.
///
/// The messaging wire protocol is deliberately not part of this workspace;
/// an embedding build provides a [`ProtocolConnector`] implementation here.
fn protocol_connector() -> Result<Arc<dyn ProtocolConnector>> {
    anyhow::bail!("no messaging protocol backend is linked into this build")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
