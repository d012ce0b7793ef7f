// Copyright (c) 2025 - Cowboy AI, Inc.
//! HTTP surface of the health service

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use super::{HealthResponse, HealthService};

/// `GET /ping` (liveness) and `GET /` (readiness)
pub fn router(service: Arc<HealthService>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/", get(readiness))
        .with_state(service)
}

/// Serve until the listener fails
pub async fn serve(service: Arc<HealthService>, port: u16) -> std::io::Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(%address, "Health service listening");
    axum::serve(listener, router(service)).await
}

async fn ping(State(service): State<Arc<HealthService>>) -> Response {
    respond(service.liveness())
}

async fn readiness(State(service): State<Arc<HealthService>>) -> Response {
    respond(service.readiness().await)
}

fn respond(response: HealthResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}
