//! EBill Service - HTTP API for the account ledger
//!
//! This is the main entry point for the ebill service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ebill_core::credentials::{password_salted_hash, PASSWORD_SALT};
use ebill_service::{create_router, AppState, ServiceConfig};
use ebill_store::{SqliteStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ebill=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EBill Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_url = %config.database_url,
        mail_configured = %config.smtp_host.is_some(),
        "Service configuration loaded"
    );

    // Open the store and make sure the bootstrap identity exists
    tracing::info!(url = %config.database_url, "Opening SQLite store");
    let store = SqliteStore::open(&config.database_url).await?;
    store.initialize().await?;
    let store: Arc<dyn Store> = Arc::new(store);

    // Build app state
    let state = AppState::new(Arc::clone(&store), config.clone());

    match config.root_password.as_deref() {
        Some(password) => {
            let root = state
                .ledger
                .bootstrap_user(&password_salted_hash(password, PASSWORD_SALT));
            if store.ensure_bootstrap(&root).await? {
                tracing::info!("Bootstrap identity initialized");
            }
        }
        None => tracing::warn!("ROOT_PASSWORD not set - bootstrap identity will not be created"),
    }

    // Create the router
    let app = create_router(state.clone());
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining background work");
    state.shutdown().await;

    Ok(())
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
