use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::auth::{SessionProvider, TrustedHeaderSessions};
use crate::config::PicksConfig;
use crate::db::{connect_to_postgres_db, create_schema};
use crate::picks::{PicksService, PicksServiceFactory};

use super::routes::PicksServer;

const LOG_TARGET: &str = "cup_picks::server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    /// Create missing tables before serving.
    pub create_schema: bool,
    pub picks: PicksConfig,
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    if config.picks.admin_emails().is_empty() {
        bail!("at least one admin e-mail must be configured (PICKS_ADMIN_EMAILS)");
    }

    let db = connect_to_postgres_db(&config.database_url, config.max_connections).await?;
    if config.create_schema {
        create_schema(&db).await?;
    }

    let picks: Arc<dyn PicksService> =
        Arc::new(PicksServiceFactory::from_sea_orm(db, config.picks.clone()));
    let sessions: Arc<dyn SessionProvider> = Arc::new(TrustedHeaderSessions);

    let router = PicksServer::new(picks, sessions).into_router();
    let make_service = router.into_make_service();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(
        target: LOG_TARGET,
        %local_addr,
        admins = config.picks.admin_emails().len(),
        "cup picks server listening"
    );

    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}
