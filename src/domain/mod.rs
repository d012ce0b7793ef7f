// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Domain Models
//!
//! Core domain concepts for deployment stack synthesis: the resource
//! taxonomy, network addressing, DNS naming, environments, and the pure
//! invariant functions every tier is checked against.
//!
//! # Value Objects with Invariants
//!
//! - [`Ipv4Cidr`] - IPv4 network block, carvable into subnets
//! - [`PortRange`] - Inclusive TCP port range
//! - [`AvailabilityZone`] - Zone within a region
//! - [`SubnetTier`] / [`RoutingMode`] - Subnet roles and how they route
//! - [`DomainName`] / [`HostedZoneId`] - RFC 1123 names and zone identifiers
//! - [`EnvironmentName`] / [`DataRetention`] - Environment identity and teardown policy
//! - [`ResourceKind`] - Closed platform resource taxonomy

pub mod dns;
pub mod environment;
pub mod invariants;
pub mod network;
pub mod resource_type;

// Re-export value objects
pub use dns::{validate_label, DnsNameError, DomainName, HostedZone, HostedZoneId};
pub use environment::{
    DataRetention, DeletionPolicy, Environment, EnvironmentError, EnvironmentName,
};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{AvailabilityZone, Ipv4Cidr, NetworkError, PortRange, RoutingMode, SubnetTier};
pub use resource_type::{ResourceCategory, ResourceKind};
