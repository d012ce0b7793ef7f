// Copyright (c) 2025 - Cowboy AI, Inc.
//! Health Service
//!
//! Liveness and readiness endpoints for the container behind the load
//! balancer. Reads its database settings once from the task environment,
//! attempts a schema bootstrap at start-up, then serves.
//!
//! Run with: cargo run --bin health-service --features health-service

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use cim_stack::health::http;
use cim_stack::health::postgres::PostgresDatabase;
use cim_stack::health::{DatabaseSettings, HealthService};

/// Port the target group forwards to
const SERVICE_PORT: u16 = 5000;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = DatabaseSettings::from_env().context("Invalid database settings")?;
    info!(
        environment = %settings.environment,
        region = %settings.region,
        host = %settings.host,
        "Starting health service"
    );

    let database = Arc::new(PostgresDatabase::new(settings));
    let service = Arc::new(HealthService::new(database.clone(), database));

    if !service.startup().await {
        info!("Database not ready yet; readiness probes will retry the bootstrap");
    }

    let port = std::env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(SERVICE_PORT);

    http::serve(service, port)
        .await
        .context("Health service stopped")
}
