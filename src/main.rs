//! TradeSim - trading-simulation rewards backend
//!
//! Start-up order:
//!
//! ```text
//! config/{env}.yaml → logging → store → ledger recovery → OTP sweeper → gateway
//! ```
//!
//! Usage: `tradesim [--env|-e <env>] [--port <port>]`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use tradesim::clock::SystemClock;
use tradesim::config::{AppConfig, EmailProvider, StorageBackend};
use tradesim::gateway::{self, state::AppState};
use tradesim::otp::{EmailSender, HttpEmailSender, LogEmailSender, spawn_sweeper};
use tradesim::services::Services;
use tradesim::store::{DocumentStore, MemoryStore, PgStore};
use tradesim::user_auth::provider_from_config;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Postgres => {
            let url = config
                .storage
                .postgres_url
                .as_deref()
                .context("storage.postgres_url is required for the postgres backend")?;
            let store = PgStore::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            store.migrate().await.context("Failed to migrate schema")?;
            Ok(Arc::new(store))
        }
    }
}

fn email_sender(config: &AppConfig) -> Result<Arc<dyn EmailSender>> {
    Ok(match config.email.provider {
        EmailProvider::Log => Arc::new(LogEmailSender),
        EmailProvider::Http => Arc::new(HttpEmailSender::new(&config.email)?),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = tradesim::logging::init_logging(&app_config);

    info!(env = %env, version = env!("GIT_HASH"), "TradeSim starting");

    let store = open_store(&app_config).await?;
    info!(backend = store.name(), "Document store ready");

    let services = Services::build(
        &app_config,
        store,
        email_sender(&app_config)?,
        provider_from_config(&app_config.oauth)?,
        Arc::new(SystemClock),
    );

    // Resolve entries left pending by an interrupted run before serving
    let report = services
        .ledger
        .recover()
        .await
        .context("Ledger recovery failed")?;
    info!(
        committed = report.committed,
        discarded = report.discarded,
        positions_repaired = report.positions_repaired,
        "Ledger recovery complete"
    );

    let _sweeper = spawn_sweeper(
        services.otp.clone(),
        Duration::from_secs(app_config.otp.sweep_interval_secs.max(1)),
    );

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    let state = Arc::new(AppState::new(services));
    gateway::run_server(&app_config.gateway.host, port, state).await
}
