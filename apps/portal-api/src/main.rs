//! # Portal API Server
//!
//! ```text
//! portal-api [--config <path>]
//! ```
//!
//! Configuration comes from the TOML file (default under the platform
//! config directory) overlaid with `LGU_*` environment variables.

use std::path::PathBuf;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lgu_db::{Database, DbConfig};
use lgu_portal_api::{app, reconcile, AppState, PortalConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lgu=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting LGU portal API...");

    let config = PortalConfig::load(config_path_arg()).context("loading configuration")?;
    info!(
        bind = %config.server.bind_address(),
        database = %config.database.path.display(),
        environment = ?config.environment.mode,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(config.database.path.clone()).max_connections(config.database.max_connections),
    )
    .await
    .context("opening database")?;
    info!("Database ready");

    let state = AppState::new(db.clone(), config.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = config
        .reconcile
        .enabled
        .then(|| reconcile::spawn(state.clone(), shutdown_rx));

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("binding {}", config.server.bind_address()))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Shutting down...");
    let _ = shutdown_tx.send(true);
    if let Some(worker) = worker {
        if let Err(e) = worker.await {
            warn!(error = %e, "Reconciliation worker ended abnormally");
        }
    }
    db.close().await;

    info!("Shutdown complete");
    Ok(())
}

fn config_path_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => return args.next().map(PathBuf::from),
            _ => {}
        }
    }
    None
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
