// Copyright (c) 2025 - Cowboy AI, Inc.
//! DNS Value Objects with Validation Invariants
//!
//! Hosted zone names, record names and hosted zone identifiers. Every name
//! the stack publishes (the environment subdomain, the certificate domain)
//! is derived from these, so validation happens once, at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// DNS validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnsNameError {
    #[error("Domain name is empty")]
    Empty,

    #[error("Domain name exceeds maximum length of 253 characters: {0}")]
    TooLong(usize),

    #[error("Label exceeds maximum length of 63 characters: {0}")]
    LabelTooLong(String),

    #[error("Invalid character in domain name: {0}")]
    InvalidCharacter(char),

    #[error("Label cannot start or end with hyphen: {0}")]
    InvalidLabelFormat(String),

    #[error("Top-level label cannot be all numeric: {0}")]
    NumericLabel(String),

    #[error("Invalid hosted zone identifier: {0}")]
    InvalidZoneId(String),
}

/// Maximum total length for a domain name (RFC 1123)
pub const MAX_NAME_LENGTH: usize = 253;

/// Maximum length for a single label (RFC 1123)
pub const MAX_LABEL_LENGTH: usize = 63;

/// Validate a single DNS label
///
/// # Invariants
/// - Non-empty, at most 63 characters
/// - ASCII alphanumerics and hyphens only
/// - Does not start or end with a hyphen
pub fn validate_label(label: &str) -> Result<(), DnsNameError> {
    if label.is_empty() {
        return Err(DnsNameError::Empty);
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(DnsNameError::LabelTooLong(label.to_string()));
    }

    if let Some(ch) = label
        .chars()
        .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
    {
        return Err(DnsNameError::InvalidCharacter(ch));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(DnsNameError::InvalidLabelFormat(label.to_string()));
    }

    Ok(())
}

/// Fully qualified domain name value object
///
/// Stored in canonical form: lowercase, without the trailing root dot.
///
/// # Examples
///
/// ```rust
/// use cim_stack::domain::DomainName;
///
/// let zone = DomainName::new("Example.COM.").unwrap();
/// assert_eq!(zone.as_str(), "example.com");
///
/// let fqdn = zone.subdomain("staging").unwrap();
/// assert_eq!(fqdn.as_str(), "staging.example.com");
///
/// assert!(DomainName::new("-bad.example.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Create a new domain name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, DnsNameError> {
        let name = name.into();
        let name = name.strip_suffix('.').unwrap_or(name.as_str()).to_ascii_lowercase();

        if name.is_empty() {
            return Err(DnsNameError::Empty);
        }

        if name.len() > MAX_NAME_LENGTH {
            return Err(DnsNameError::TooLong(name.len()));
        }

        for label in name.split('.') {
            validate_label(label)?;
        }

        if let Some(tld) = name.rsplit('.').next() {
            if tld.chars().all(|c| c.is_ascii_digit()) {
                return Err(DnsNameError::NumericLabel(tld.to_string()));
            }
        }

        Ok(Self(name))
    }

    /// Prefix this name with one label
    pub fn subdomain(&self, label: &str) -> Result<Self, DnsNameError> {
        validate_label(label)?;
        Self::new(format!("{label}.{}", self.0))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything after the first label
    pub fn parent(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, parent)| parent)
    }

    /// Get labels as a vector
    pub fn labels(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = DnsNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for DomainName {
    type Error = DnsNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DomainName> for String {
    fn from(value: DomainName) -> Self {
        value.0
    }
}

/// Hosted zone identifier as issued by the DNS service (e.g. `Z0123456789ABC`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostedZoneId(String);

impl HostedZoneId {
    pub fn new(id: impl Into<String>) -> Result<Self, DnsNameError> {
        let id = id.into();
        let id = id.trim();
        let id = id.strip_prefix("/hostedzone/").unwrap_or(id);

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DnsNameError::InvalidZoneId(id.to_string()));
        }

        Ok(Self(id.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostedZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for HostedZoneId {
    type Error = DnsNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HostedZoneId> for String {
    fn from(value: HostedZoneId) -> Self {
        value.0
    }
}

/// A hosted zone: identifier plus apex name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostedZone {
    pub id: HostedZoneId,
    pub name: DomainName,
}
