//! Wallet Service - Main Application Entry Point
//!
//! This is a REST API server for a personal-finance wallet. Users register, verify their email, and
//! then deposit, withdraw, purchase and transfer money, with every balance change recorded in a
//! categorized ledger that feeds spending analytics.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries) behind a `Store` / `UnitOfWork` abstraction
//! - **Authentication**: HS256 JWT bearer tokens, Argon2id password hashes
//! - **Email**: Transactional email HTTP API (log-only when no API key is set)
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Serve until Ctrl-C / SIGTERM, then drain requests and close the pool

mod app;
mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod middleware;
mod models;
mod security;
mod services;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    services::email_service::{EmailSender, HttpEmailSender, LogEmailSender},
    state::AppState,
    store::postgres::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let mailer: Arc<dyn EmailSender> = match config.email_api_key.clone() {
        Some(api_key) => Arc::new(HttpEmailSender::new(
            config.email_api_url.clone(),
            api_key,
            config.email_sender.clone(),
        )?),
        None => {
            tracing::warn!("EMAIL_API_KEY not set, outgoing emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState::new(config, Arc::new(PgStore::new(pool.clone())), mailer);
    let app = app::router(state);

    // Bind to network address and start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
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
                tracing::error!("failed to listen for SIGTERM: {e}");
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

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
