// Copyright (c) 2025 - Cowboy AI, Inc.
//! Health Service Tests
//!
//! Drives the readiness flow against an in-memory database.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use cim_stack::health::{
    DatabaseProbe, HealthError, HealthService, ReadinessState, SchemaBootstrap,
};

/// Database that is missing until bootstrapped
#[derive(Default)]
struct InMemoryDatabase {
    created: AtomicBool,
    bootstraps: AtomicUsize,
    reachable_error: Option<String>,
    bootstrap_error: Option<String>,
}

impl InMemoryDatabase {
    fn ready() -> Self {
        let db = Self::default();
        db.created.store(true, Ordering::SeqCst);
        db
    }

    fn unreachable(reason: &str) -> Self {
        Self {
            reachable_error: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl DatabaseProbe for InMemoryDatabase {
    async fn probe(&self) -> ReadinessState {
        if let Some(reason) = &self.reachable_error {
            return ReadinessState::from_failure(None, reason.clone());
        }
        if self.created.load(Ordering::SeqCst) {
            ReadinessState::Ready
        } else {
            ReadinessState::from_failure(Some("3D000"), "database \"flaskdb\" does not exist")
        }
    }
}

#[async_trait]
impl SchemaBootstrap for InMemoryDatabase {
    async fn bootstrap(&self) -> Result<(), HealthError> {
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.bootstrap_error {
            return Err(HealthError::Database(reason.clone()));
        }
        self.created.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn service(db: Arc<InMemoryDatabase>) -> HealthService {
    HealthService::new(db.clone(), db)
}

#[tokio::test]
async fn test_liveness_ignores_the_database() {
    let service = service(Arc::new(InMemoryDatabase::unreachable("connection refused")));
    let response = service.liveness();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"status": "container running"}));
}

#[tokio::test]
async fn test_ready_database_is_healthy() {
    let service = service(Arc::new(InMemoryDatabase::ready()));
    let response = service.readiness().await;
    assert!(response.is_success());
    assert_eq!(response.body, json!({"status": "healthy", "database": "connected"}));
}

#[tokio::test]
async fn test_missing_database_is_bootstrapped_once() {
    let db = Arc::new(InMemoryDatabase::default());
    let service = service(db.clone());

    let first = service.readiness().await;
    assert_eq!(first.status, 200);
    assert_eq!(first.body["status"], "initializing");

    let second = service.readiness().await;
    assert_eq!(second.body["status"], "healthy");
    assert_eq!(db.bootstraps.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_bootstrap_is_unhealthy() {
    let db = Arc::new(InMemoryDatabase {
        bootstrap_error: Some("permission denied to create database".to_string()),
        ..Default::default()
    });
    let service = service(db.clone());

    let response = service.readiness().await;
    assert_eq!(response.status, 503);
    assert_eq!(response.body["status"], "unhealthy");
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("permission denied to create database"));

    // Retried on the next probe.
    service.readiness().await;
    assert_eq!(db.bootstraps.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreachable_database_is_unhealthy_without_bootstrap() {
    let db = Arc::new(InMemoryDatabase::unreachable("connection refused"));
    let service = service(db.clone());

    let response = service.readiness().await;
    assert_eq!(response.status, 503);
    assert_eq!(
        response.body,
        json!({"status": "unhealthy", "error": "connection refused"})
    );
    assert_eq!(db.bootstraps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_startup_bootstrap_is_never_fatal() {
    let db = Arc::new(InMemoryDatabase {
        bootstrap_error: Some("timeout".to_string()),
        ..Default::default()
    });
    assert!(!service(db).startup().await);

    let db = Arc::new(InMemoryDatabase::default());
    assert!(service(db.clone()).startup().await);
    assert!(db.created.load(Ordering::SeqCst));
}
