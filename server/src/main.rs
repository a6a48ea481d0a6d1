mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use atelier_core::api::v1::{self, ApiState};
use atelier_core::chat_log::SqliteConversationStore;
use atelier_core::db::init_db;
use atelier_core::settings::SqliteSettingsStore;
use atelier_core::AiGateway;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let db = init_db(config.data_dir.clone()).context("failed to init db")?;
    let gateway = AiGateway::new().context("failed to initialise AI gateway")?;
    let state = ApiState {
        settings: SqliteSettingsStore::new(db.clone()),
        conversations: Arc::new(SqliteConversationStore::new(db.clone())),
        gateway: Arc::new(gateway),
        db,
    };

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    log::info!(
        "assistant API listening on {} (data dir {})",
        config.bind,
        config.data_dir.display()
    );
    axum::serve(listener, v1::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for shutdown signal: {err}");
    }
    log::info!("shutting down");
}
