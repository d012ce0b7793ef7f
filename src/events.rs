// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Events
//!
//! Immutable facts emitted for every lifecycle transition a resource takes
//! during one apply run. All events of a run share its correlation id; each
//! event's causation id is the previous event for the same resource.
//!
//! Events are versioned through `event_version`; start at 1 and increment
//! when the schema changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ResourceKind;
use crate::errors::SynthesisResult;
use crate::state_machine::ProvisioningStatus;
use crate::subjects::{Operation, SubjectBuilder, SubjectError};

/// Current event schema version
pub const EVENT_VERSION: u32 = 1;

/// A resource changed provisioning status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningEvent {
    pub event_version: u32,

    /// Unique event identifier (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// Apply run this event belongs to
    pub correlation_id: Uuid,

    /// Previous event for the same resource in this run
    pub causation_id: Option<Uuid>,

    pub timestamp: DateTime<Utc>,

    pub environment: String,
    pub logical_id: String,
    pub resource_kind: ResourceKind,
    pub from: ProvisioningStatus,
    pub to: ProvisioningStatus,
}

impl ProvisioningEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        correlation_id: Uuid,
        causation_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
        environment: impl Into<String>,
        logical_id: impl Into<String>,
        resource_kind: ResourceKind,
        from: ProvisioningStatus,
        to: ProvisioningStatus,
    ) -> Self {
        Self {
            event_version: EVENT_VERSION,
            event_id: Uuid::now_v7(),
            correlation_id,
            causation_id,
            timestamp,
            environment: environment.into(),
            logical_id: logical_id.into(),
            resource_kind,
            from,
            to,
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        Operation::for_transition(&self.from, &self.to)
    }

    /// Subject this event is published on
    pub fn subject(&self) -> Result<String, SubjectError> {
        let operation = self
            .operation()
            .ok_or(SubjectError::Incomplete("operation"))?;
        SubjectBuilder::new(self.environment.as_str())
            .resource_kind(self.resource_kind)
            .operation(operation)
            .build()
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.to, ProvisioningStatus::Failed(_))
    }
}

/// Sink for provisioning events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &ProvisioningEvent) -> SynthesisResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(from: ProvisioningStatus, to: ProvisioningStatus) -> ProvisioningEvent {
        ProvisioningEvent::new(
            Uuid::now_v7(),
            None,
            Utc::now(),
            "dev",
            "DatabaseCluster",
            ResourceKind::DatabaseCluster,
            from,
            to,
        )
    }

    #[test]
    fn test_event_subject() {
        let created = event(ProvisioningStatus::Creating, ProvisioningStatus::Available);
        assert_eq!(
            created.subject().unwrap(),
            "stack.dev.database_cluster.created"
        );
        assert_eq!(created.event_version, EVENT_VERSION);
    }

    #[test]
    fn test_failure_event() {
        let failed = event(
            ProvisioningStatus::Creating,
            ProvisioningStatus::Failed("limit exceeded".to_string()),
        );
        assert!(failed.is_failure());
        assert_eq!(failed.subject().unwrap(), "stack.dev.database_cluster.failed");
    }

    #[test]
    fn test_event_serialization() {
        let original = event(ProvisioningStatus::Pending, ProvisioningStatus::Creating);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: ProvisioningEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
