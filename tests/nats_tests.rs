// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS Publication Tests
//!
//! Live tests need a server on `nats://localhost:4222` and are ignored by
//! default.

#![cfg(feature = "nats")]

use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

use cim_stack::domain::ResourceKind;
use cim_stack::events::{EventPublisher, ProvisioningEvent};
use cim_stack::state_machine::ProvisioningStatus;
use cim_stack::subjects::SubjectBuilder;
use cim_stack::{NatsClient, NatsConfig, NatsEventPublisher};

fn created_event() -> ProvisioningEvent {
    ProvisioningEvent::new(
        Uuid::now_v7(),
        None,
        Utc::now(),
        "natstest",
        "DatabaseCluster",
        ResourceKind::DatabaseCluster,
        ProvisioningStatus::Creating,
        ProvisioningStatus::Available,
    )
}

#[test]
fn test_nats_config_default() {
    let config = NatsConfig::default();
    assert_eq!(config.servers, vec!["nats://localhost:4222"]);
    assert_eq!(config.name, "cim-stack");
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.request_timeout, Duration::from_secs(5));
}

#[tokio::test]
async fn test_connect_failure_is_a_publish_error() {
    let config = NatsConfig {
        servers: vec!["nats://127.0.0.1:1".to_string()],
        connect_timeout: Duration::from_millis(200),
        ..Default::default()
    };
    assert!(NatsEventPublisher::connect(config).await.is_err());
}

#[tokio::test]
#[ignore = "requires NATS server"]
async fn test_event_published_on_its_subject() {
    let client = NatsClient::new(NatsConfig::default()).await.unwrap();
    let mut subscriber = client
        .subscribe(&SubjectBuilder::new("natstest").build_wildcard())
        .await
        .unwrap();
    client.flush().await.unwrap();

    let publisher = NatsEventPublisher::new(client);
    let event = created_event();
    publisher.publish(&event).await.unwrap();

    let message = tokio::time::timeout(
        Duration::from_secs(5),
        futures::StreamExt::next(&mut subscriber),
    )
    .await
    .expect("timed out waiting for event")
    .expect("subscription closed");

    assert_eq!(message.subject.to_string(), "stack.natstest.database_cluster.created");
    let received: ProvisioningEvent = serde_json::from_slice(&message.payload).unwrap();
    assert_eq!(received, event);
}
