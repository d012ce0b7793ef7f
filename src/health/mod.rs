// Copyright (c) 2025 - Cowboy AI, Inc.
//! Health Service Boundary
//!
//! The container behind the load balancer answers two probes:
//!
//! - `GET /ping`: liveness, always 200 while the process runs
//! - `GET /`: readiness, 200 only once the database answers
//!
//! Readiness is computed from an explicit [`ReadinessState`]. A missing
//! database or table is [`ReadinessState::NeedsBootstrap`]: the service
//! creates it and reports `initializing`; the next probe then sees `Ready`.
//! A failed bootstrap is reported as unhealthy and retried on the next probe.
//!
//! Settings and credentials are read once at start-up from the variables the
//! compute tier injects (`DB_HOST`, `DB_CREDENTIALS`, `DB_PORT`, `DB_NAME`,
//! `DB_TABLE`, `ENVIRONMENT`, `AWS_REGION`).

#[cfg(feature = "health-service")]
pub mod http;
#[cfg(feature = "health-service")]
pub mod postgres;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_REGION;

/// SQLSTATE raised when the requested database does not exist
pub const SQLSTATE_INVALID_CATALOG: &str = "3D000";

/// SQLSTATE raised when a table does not exist
pub const SQLSTATE_UNDEFINED_TABLE: &str = "42P01";

/// Health service error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HealthError {
    #[error("Missing environment variable {0}")]
    MissingVariable(&'static str),

    #[error("Invalid environment variable {name}: {reason}")]
    InvalidVariable { name: &'static str, reason: String },

    #[error("Invalid database credentials: {0}")]
    Credentials(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Outcome of one database probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
    Ready,
    /// Database or table missing; create it, then probe again
    NeedsBootstrap,
    Unavailable(String),
}

impl ReadinessState {
    /// Classify a failed probe by its SQLSTATE code
    pub fn from_failure(sqlstate: Option<&str>, message: impl Into<String>) -> Self {
        match sqlstate {
            Some(SQLSTATE_INVALID_CATALOG) | Some(SQLSTATE_UNDEFINED_TABLE) => Self::NeedsBootstrap,
            _ => Self::Unavailable(message.into()),
        }
    }
}

/// Checks that the database and its table answer
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn probe(&self) -> ReadinessState;
}

/// Creates the database and table when missing
#[async_trait]
pub trait SchemaBootstrap: Send + Sync {
    async fn bootstrap(&self) -> Result<(), HealthError>;
}

/// HTTP status plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl HealthResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    fn healthy() -> Self {
        Self {
            status: 200,
            body: json!({"status": "healthy", "database": "connected"}),
        }
    }

    fn initializing() -> Self {
        Self {
            status: 200,
            body: json!({
                "status": "initializing",
                "message": "Database created, restarting connection"
            }),
        }
    }

    fn unhealthy(error: &str) -> Self {
        Self {
            status: 503,
            body: json!({"status": "unhealthy", "error": error}),
        }
    }
}

/// Answers liveness and readiness probes
#[derive(Clone)]
pub struct HealthService {
    probe: Arc<dyn DatabaseProbe>,
    bootstrap: Arc<dyn SchemaBootstrap>,
}

impl HealthService {
    pub fn new(probe: Arc<dyn DatabaseProbe>, bootstrap: Arc<dyn SchemaBootstrap>) -> Self {
        Self { probe, bootstrap }
    }

    /// Liveness never looks at the database
    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: 200,
            body: json!({"status": "container running"}),
        }
    }

    pub async fn readiness(&self) -> HealthResponse {
        match self.probe.probe().await {
            ReadinessState::Ready => {
                debug!("Database connection successful");
                HealthResponse::healthy()
            }
            ReadinessState::NeedsBootstrap => {
                warn!("Database or table missing, bootstrapping schema");
                match self.bootstrap.bootstrap().await {
                    Ok(()) => {
                        info!("Database bootstrap complete");
                        HealthResponse::initializing()
                    }
                    Err(err) => {
                        error!(error = %err, "Database bootstrap failed");
                        HealthResponse::unhealthy(&err.to_string())
                    }
                }
            }
            ReadinessState::Unavailable(reason) => {
                error!(error = %reason, "Health check failed");
                HealthResponse::unhealthy(&reason)
            }
        }
    }

    /// Bootstrap attempt at start-up; a failure is logged, never fatal
    pub async fn startup(&self) -> bool {
        match self.bootstrap.bootstrap().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Could not bootstrap database during startup");
                false
            }
        }
    }
}

/// Credentials read from the `DB_CREDENTIALS` secret
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

impl DatabaseCredentials {
    /// Parse the secret's JSON (`{"username": .., "password": ..}`)
    pub fn from_secret_json(raw: &str) -> Result<Self, HealthError> {
        let credentials: Self =
            serde_json::from_str(raw).map_err(|e| HealthError::Credentials(e.to_string()))?;
        if credentials.username.is_empty() {
            return Err(HealthError::Credentials("empty username".to_string()));
        }
        Ok(credentials)
    }
}

impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings, resolved once at start-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub table_name: String,
    pub environment: String,
    pub region: String,
    pub credentials: DatabaseCredentials,
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self, HealthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HealthError> {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let host = get("DB_HOST").ok_or(HealthError::MissingVariable("DB_HOST"))?;
        let secret = get("DB_CREDENTIALS").ok_or(HealthError::MissingVariable("DB_CREDENTIALS"))?;
        let credentials = DatabaseCredentials::from_secret_json(&secret)?;

        let port = match get("DB_PORT") {
            Some(raw) => raw.parse().map_err(|_| HealthError::InvalidVariable {
                name: "DB_PORT",
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => 5432,
        };

        let settings = Self {
            host,
            port,
            database_name: get("DB_NAME").unwrap_or_else(|| "flaskdb".to_string()),
            table_name: get("DB_TABLE").unwrap_or_else(|| "user".to_string()),
            environment: get("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()),
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credentials,
        };

        for (name, value) in [
            ("DB_NAME", &settings.database_name),
            ("DB_TABLE", &settings.table_name),
        ] {
            if !is_plain_identifier(value) {
                return Err(HealthError::InvalidVariable {
                    name,
                    reason: format!("'{value}' is not a plain SQL identifier"),
                });
            }
        }

        Ok(settings)
    }
}

/// Letters, digits and underscores, not starting with a digit
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
