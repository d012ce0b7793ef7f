// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for provisioning events
//!
//! # Subject Pattern
//!
//! ```text
//! stack.{environment}.{resource_kind}.{operation}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`stack.prod.database_cluster.failed`)
//! - Environment-level wildcards (`stack.prod.>`)
//! - Kind-level wildcards across environments (`stack.*.load_balancer.>`)
//! - Global subscriptions (`stack.>`)
//!
//! # Examples
//!
//! ```rust
//! use cim_stack::domain::ResourceKind;
//! use cim_stack::subjects::{Operation, SubjectBuilder};
//!
//! let subject = SubjectBuilder::new("prod")
//!     .resource_kind(ResourceKind::DatabaseCluster)
//!     .operation(Operation::Created)
//!     .build()
//!     .unwrap();
//! assert_eq!(subject, "stack.prod.database_cluster.created");
//!
//! let wildcard = SubjectBuilder::new("prod").build_wildcard();
//! assert_eq!(wildcard, "stack.prod.>");
//! ```

use std::fmt;
use thiserror::Error;

use crate::domain::ResourceKind;
use crate::state_machine::ProvisioningStatus;

/// Root namespace for all stack subjects
pub const STACK_ROOT: &str = "stack";

/// Subject construction error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("Subject is missing its {0} token")]
    Incomplete(&'static str),

    #[error("Invalid subject token '{0}'")]
    InvalidToken(String),
}

/// Provisioning operations (last subject token)
///
/// Named after the status a resource just entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
    Retained,
    Failed,
}

impl Operation {
    /// Operation announcing a transition into `status`
    ///
    /// `Available` is reported as `Created` or `Updated` depending on the
    /// status it was reached from.
    pub fn for_transition(from: &ProvisioningStatus, to: &ProvisioningStatus) -> Option<Self> {
        match to {
            ProvisioningStatus::Pending => None,
            ProvisioningStatus::Creating => Some(Self::Creating),
            ProvisioningStatus::Updating => Some(Self::Updating),
            ProvisioningStatus::Available => match from {
                ProvisioningStatus::Updating => Some(Self::Updated),
                _ => Some(Self::Created),
            },
            ProvisioningStatus::Deleting => Some(Self::Deleting),
            ProvisioningStatus::Deleted => Some(Self::Deleted),
            ProvisioningStatus::Retained => Some(Self::Retained),
            ProvisioningStatus::Failed(_) => Some(Self::Failed),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Creating => write!(f, "creating"),
            Operation::Created => write!(f, "created"),
            Operation::Updating => write!(f, "updating"),
            Operation::Updated => write!(f, "updated"),
            Operation::Deleting => write!(f, "deleting"),
            Operation::Deleted => write!(f, "deleted"),
            Operation::Retained => write!(f, "retained"),
            Operation::Failed => write!(f, "failed"),
        }
    }
}

/// Builder for stack NATS subjects
#[derive(Debug, Clone)]
pub struct SubjectBuilder {
    environment: String,
    resource_kind: Option<ResourceKind>,
    operation: Option<Operation>,
}

impl SubjectBuilder {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            resource_kind: None,
            operation: None,
        }
    }

    pub fn resource_kind(mut self, kind: ResourceKind) -> Self {
        self.resource_kind = Some(kind);
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Build the complete subject string
    pub fn build(self) -> Result<String, SubjectError> {
        let environment = validate_token(&self.environment)?;
        let kind = self
            .resource_kind
            .ok_or(SubjectError::Incomplete("resource kind"))?;
        let operation = self.operation.ok_or(SubjectError::Incomplete("operation"))?;
        Ok(format!(
            "{}.{}.{}.{}",
            STACK_ROOT,
            environment,
            kind.as_str(),
            operation
        ))
    }

    /// Wildcard for every event of the environment, or of one kind in it
    ///
    /// Returns `stack.{environment}.>` or `stack.{environment}.{kind}.>`.
    pub fn build_wildcard(self) -> String {
        match self.resource_kind {
            Some(kind) => format!("{}.{}.{}.>", STACK_ROOT, self.environment, kind.as_str()),
            None => format!("{}.{}.>", STACK_ROOT, self.environment),
        }
    }

    /// Subscription for all stack events
    pub fn build_all() -> String {
        format!("{}.>", STACK_ROOT)
    }
}

fn validate_token(token: &str) -> Result<&str, SubjectError> {
    let invalid = token.is_empty()
        || token
            .chars()
            .any(|c| c == '.' || c == '*' || c == '>' || c.is_whitespace());
    if invalid {
        return Err(SubjectError::InvalidToken(token.to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_builder() {
        let subject = SubjectBuilder::new("dev")
            .resource_kind(ResourceKind::ComputeService)
            .operation(Operation::Updated)
            .build()
            .unwrap();

        assert_eq!(subject, "stack.dev.compute_service.updated");
    }

    #[test]
    fn test_incomplete_subject() {
        let result = SubjectBuilder::new("dev")
            .operation(Operation::Created)
            .build();
        assert_eq!(result, Err(SubjectError::Incomplete("resource kind")));
    }

    #[test]
    fn test_invalid_environment_token() {
        let result = SubjectBuilder::new("dev.eu")
            .resource_kind(ResourceKind::Network)
            .operation(Operation::Created)
            .build();
        assert!(matches!(result, Err(SubjectError::InvalidToken(_))));
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(SubjectBuilder::new("prod").build_wildcard(), "stack.prod.>");
        assert_eq!(
            SubjectBuilder::new("prod")
                .resource_kind(ResourceKind::LoadBalancer)
                .build_wildcard(),
            "stack.prod.load_balancer.>"
        );
        assert_eq!(SubjectBuilder::build_all(), "stack.>");
    }

    #[test]
    fn test_operation_for_transition() {
        use ProvisioningStatus::*;
        assert_eq!(Operation::for_transition(&Creating, &Available), Some(Operation::Created));
        assert_eq!(Operation::for_transition(&Updating, &Available), Some(Operation::Updated));
        assert_eq!(
            Operation::for_transition(&Deleting, &Failed("x".to_string())),
            Some(Operation::Failed)
        );
        assert_eq!(Operation::for_transition(&Pending, &Pending), None);
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Retained.to_string(), "retained");
        assert_eq!(Operation::Deleting.to_string(), "deleting");
    }
}
