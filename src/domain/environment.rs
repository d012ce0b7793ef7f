// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Environment Value Objects
//!
//! An environment name scopes every logical resource id, the public
//! subdomain and the credential secret name. The data retention flag is the
//! explicit, per-environment teardown policy for stateful resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::dns::{validate_label, DnsNameError};

/// Environment validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Environment name must be a DNS label: {0}")]
    InvalidName(#[from] DnsNameError),

    #[error("Environment name must be lowercase: {0}")]
    NotLowercase(String),

    #[error("Unknown data retention policy '{0}' (expected 'destroy' or 'retain')")]
    UnknownRetention(String),
}

/// Environment identifier (`dev`, `staging`, `prod`, ...)
///
/// # Invariants
/// - Valid DNS label (it becomes the environment subdomain)
/// - Lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Name used when the deployment parameters carry none
    pub const DEVELOPMENT: &'static str = "dev";

    pub fn new(name: impl Into<String>) -> Result<Self, EnvironmentError> {
        let name = name.into();
        validate_label(&name)?;
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(EnvironmentError::NotLowercase(name));
        }
        Ok(Self(name))
    }

    /// The default development environment
    pub fn development() -> Self {
        Self(Self::DEVELOPMENT.to_string())
    }

    pub fn is_development(&self) -> bool {
        self.0 == Self::DEVELOPMENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scoped logical name, e.g. `dev-vpc`
    pub fn scoped(&self, suffix: &str) -> String {
        format!("{}-{}", self.0, suffix)
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for EnvironmentName {
    type Error = EnvironmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EnvironmentName> for String {
    fn from(value: EnvironmentName) -> Self {
        value.0
    }
}

/// What happens to stateful resources when the environment is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRetention {
    /// Ephemeral environment: teardown deletes data
    Destroy,
    /// Persistent environment: teardown keeps data
    Retain,
}

impl DataRetention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Destroy => "destroy",
            Self::Retain => "retain",
        }
    }

    /// Deletion policy applied to stateful resources
    pub fn deletion_policy(&self) -> DeletionPolicy {
        match self {
            Self::Destroy => DeletionPolicy::Delete,
            Self::Retain => DeletionPolicy::Retain,
        }
    }
}

impl FromStr for DataRetention {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "destroy" | "delete" | "ephemeral" => Ok(Self::Destroy),
            "retain" | "persistent" => Ok(Self::Retain),
            other => Err(EnvironmentError::UnknownRetention(other.to_string())),
        }
    }
}

impl fmt::Display for DataRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-resource deletion policy rendered into the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Retain,
}

impl DeletionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Retain => "Retain",
        }
    }
}

/// Environment identity plus its teardown policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: EnvironmentName,
    pub retention: DataRetention,
}

impl Environment {
    pub fn new(name: EnvironmentName, retention: DataRetention) -> Self {
        Self { name, retention }
    }

    /// Whether stateful resources are protected against deletion
    pub fn deletion_protection(&self) -> bool {
        self.retention == DataRetention::Retain
    }
}
