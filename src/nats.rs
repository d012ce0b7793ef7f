// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS publication of provisioning events

use async_nats::{Client, ConnectOptions, Subscriber};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{SynthesisError, SynthesisResult};
use crate::events::{EventPublisher, ProvisioningEvent};

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "cim-stack".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// NATS client wrapper
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    pub async fn new(config: NatsConfig) -> SynthesisResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout)
            .request_timeout(Some(config.request_timeout));

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| SynthesisError::EventPublish(format!("connection failed: {e}")))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Publish a JSON message to a subject
    pub async fn publish<T>(&self, subject: &str, message: &T) -> SynthesisResult<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| SynthesisError::EventPublish(e.to_string()))?;

        debug!("Published message to subject: {}", subject);
        Ok(())
    }

    pub async fn subscribe(&self, subject: &str) -> SynthesisResult<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| SynthesisError::EventPublish(e.to_string()))?;

        info!("Subscribed to subject: {}", subject);
        Ok(subscriber)
    }

    /// Flush pending publications
    pub async fn flush(&self) -> SynthesisResult<()> {
        self.client
            .flush()
            .await
            .map_err(|e| SynthesisError::EventPublish(e.to_string()))
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Publishes provisioning events on `stack.{environment}.{kind}.{operation}`
#[derive(Clone)]
pub struct NatsEventPublisher {
    client: NatsClient,
}

impl NatsEventPublisher {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }

    pub async fn connect(config: NatsConfig) -> SynthesisResult<Self> {
        Ok(Self::new(NatsClient::new(config).await?))
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: &ProvisioningEvent) -> SynthesisResult<()> {
        let subject = event
            .subject()
            .map_err(|e| SynthesisError::EventPublish(e.to_string()))?;
        self.client.publish(&subject, event).await
    }
}
