//! # acequiad — acequia daemon
//!
//! Composition root that wires the storage adapter into the application
//! services and hosts the liveness sweep.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Construct application services, injecting repositories via port traits
//! - Run the liveness sweep on its configured cadence
//! - Handle graceful shutdown (SIGINT)
//!
//! The HTTP/API layer that feeds telemetry into the core is an external
//! collaborator and not part of this binary.
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use acequia_adapter_storage_sqlite_sqlx::SqliteDeviceRepository;
use acequia_app::liveness::LivenessSweeper;
use acequia_app::services::device_service::DeviceService;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = acequia_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Services
    let device_service = DeviceService::new(SqliteDeviceRepository::new(pool));
    let sweeper = LivenessSweeper::new(device_service, config.offline_after());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweep_task = if config.sweep.enabled {
        let interval = config.sweep_interval();
        tracing::info!(
            interval_secs = config.sweep.interval_secs,
            offline_after_secs = config.sweep.offline_after_secs,
            "starting liveness sweep"
        );
        Some(tokio::spawn(async move {
            sweeper.run(interval, shutdown_rx).await;
        }))
    } else {
        tracing::info!("liveness sweep disabled by configuration");
        None
    };

    tracing::info!(database = config.database_url(), "acequiad running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown_tx.send(true).ok();
    if let Some(task) = sweep_task {
        task.await?;
    }

    Ok(())
}
