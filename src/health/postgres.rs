// Copyright (c) 2025 - Cowboy AI, Inc.
//! PostgreSQL probe and schema bootstrap

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info};

use super::{DatabaseProbe, DatabaseSettings, HealthError, ReadinessState, SchemaBootstrap};

/// Maintenance database every cluster has
const MAINTENANCE_DATABASE: &str = "postgres";

/// Probe and bootstrap against one PostgreSQL cluster
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    settings: DatabaseSettings,
}

impl PostgresDatabase {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self { settings }
    }

    fn options(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .username(&self.settings.credentials.username)
            .password(&self.settings.credentials.password)
            .database(database)
    }

    async fn connect(&self, database: &str) -> Result<PgConnection, sqlx::Error> {
        PgConnection::connect_with(&self.options(database)).await
    }

    async fn check(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.connect(&self.settings.database_name).await?;
        sqlx::query(&format!(
            "SELECT 1 FROM {} LIMIT 1",
            quote_identifier(&self.settings.table_name)
        ))
        .fetch_optional(&mut conn)
        .await?;
        conn.close().await
    }

    async fn create_database(&self) -> Result<(), sqlx::Error> {
        let name = &self.settings.database_name;
        let mut conn = self.connect(MAINTENANCE_DATABASE).await?;

        let exists = sqlx::query("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(name)
            .fetch_optional(&mut conn)
            .await?
            .is_some();

        if exists {
            debug!(database = %name, "Database already exists");
        } else {
            info!(database = %name, "Creating database");
            sqlx::query(&format!("CREATE DATABASE {}", quote_identifier(name)))
                .execute(&mut conn)
                .await?;
        }
        conn.close().await
    }

    async fn create_table(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.connect(&self.settings.database_name).await?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                id SERIAL PRIMARY KEY, \
                username VARCHAR(80) UNIQUE NOT NULL, \
                email VARCHAR(120) UNIQUE NOT NULL\
            )",
            quote_identifier(&self.settings.table_name)
        ))
        .execute(&mut conn)
        .await?;
        conn.close().await
    }
}

#[async_trait]
impl DatabaseProbe for PostgresDatabase {
    async fn probe(&self) -> ReadinessState {
        match self.check().await {
            Ok(()) => ReadinessState::Ready,
            Err(err) => classify(&err),
        }
    }
}

#[async_trait]
impl SchemaBootstrap for PostgresDatabase {
    async fn bootstrap(&self) -> Result<(), HealthError> {
        self.create_database()
            .await
            .map_err(|e| HealthError::Database(e.to_string()))?;
        self.create_table()
            .await
            .map_err(|e| HealthError::Database(e.to_string()))?;
        info!(
            database = %self.settings.database_name,
            table = %self.settings.table_name,
            "Database initialization complete"
        );
        Ok(())
    }
}

/// Map a driver error to a readiness state by its SQLSTATE
pub fn classify(err: &sqlx::Error) -> ReadinessState {
    let code = match err {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    };
    ReadinessState::from_failure(code.as_deref(), err.to_string())
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("user"), "\"user\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_non_database_errors_are_unavailable() {
        let state = classify(&sqlx::Error::PoolTimedOut);
        assert!(matches!(state, ReadinessState::Unavailable(_)));
    }
}
