//! Alga marketplace server - Main Application Entry Point
//!
//! REST API backend for a property-rental marketplace: listings, bookings with a
//! fixed-rate fee breakdown, Alga Pay checkout across Chapa, Stripe and Arifpay,
//! host payouts, consent, feature flags, image uploads and ID verification.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing
//! - **Payments**: provider HTTP APIs via reqwest, behind the `PaymentProvider` trait
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Initialize logging
//! 3. Create database connection pool and run migrations
//! 4. Register payment providers and storage in `AppState`
//! 5. Start the payout job
//! 6. Serve HTTP until SIGINT/SIGTERM

mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod jobs;
mod logging;
mod middleware;
mod models;
mod payments;
mod routes;
mod services;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use std::time::Duration;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env().context("failed to load configuration")?;
    config.validate()?;

    logging::init(config.json_logs());
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create upload dir {}", config.upload_dir))?;

    let state = state::AppState::from_config(pool, config)?;

    let payout_task = if state.config.payout_enabled {
        let every = Duration::from_secs(state.config.payout_interval_secs);
        tracing::info!(interval_secs = every.as_secs(), "payout job scheduled");
        Some(state.payouts.clone().spawn(every))
    } else {
        tracing::info!("payout job disabled");
        None
    };

    let addr = format!("0.0.0.0:{}", state.config.server_port);
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = payout_task {
        task.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
