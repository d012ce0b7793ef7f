// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for stack synthesis and deployment

use thiserror::Error;

use crate::domain::{DnsNameError, EnvironmentError, NetworkError, ValidationError};
use crate::graph::GraphError;
use crate::state_machine::TransitionError;
use crate::tiers::security::PolicyError;

/// Errors that can occur while synthesizing or applying a stack
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// A required deployment parameter is absent
    #[error("missing required deployment parameter: '{0}'")]
    MissingParameter(&'static str),

    /// A deployment parameter is present but unusable
    #[error("invalid deployment parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Address space or port sizing error
    #[error("invalid network topology: {0}")]
    Topology(#[from] NetworkError),

    /// DNS name or zone error
    #[error("invalid DNS name: {0}")]
    Dns(#[from] DnsNameError),

    /// Environment name or retention flag error
    #[error("invalid environment: {0}")]
    Environment(#[from] EnvironmentError),

    /// Security policy violation
    #[error("security policy violation: {0}")]
    PolicyViolation(#[from] PolicyError),

    /// Resource graph error
    #[error("resource graph error: {0}")]
    Graph(#[from] GraphError),

    /// Stack invariant violated
    #[error("stack invariant violated: {0}")]
    Validation(#[from] ValidationError),

    /// Provisioning lifecycle rejected a step
    #[error("provisioning lifecycle error: {0}")]
    Lifecycle(#[from] TransitionError),

    /// Provisioning engine failure, message carried verbatim
    #[error("{resource}: {message}")]
    Engine { resource: String, message: String },

    /// Configuration file could not be read
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Template serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Event publication error
    #[error("Event publish error: {0}")]
    EventPublish(String),
}

/// Result type for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;

impl SynthesisError {
    /// Whether the error was raised before any resource was touched
    pub fn is_pre_synthesis(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_) | Self::InvalidParameter { .. } | Self::Configuration(_)
        )
    }
}

#[cfg(feature = "nats")]
impl From<async_nats::Error> for SynthesisError {
    fn from(err: async_nats::Error) -> Self {
        SynthesisError::EventPublish(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_names_the_key() {
        let err = SynthesisError::MissingParameter("hosted_zone_id");
        assert!(err.to_string().contains("hosted_zone_id"));
        assert!(err.is_pre_synthesis());
    }

    #[test]
    fn test_engine_message_is_verbatim() {
        let err = SynthesisError::Engine {
            resource: "DatabaseCluster".to_string(),
            message: "The parameter MasterUsername is not a valid identifier.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "DatabaseCluster: The parameter MasterUsername is not a valid identifier."
        );
        assert!(!err.is_pre_synthesis());
    }
}
