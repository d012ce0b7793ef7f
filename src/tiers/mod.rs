// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Tiers
//!
//! One builder per tier. Each borrows the [`StackConfig`] and the outputs of
//! the tiers it depends on, adds its resources to the graph, and returns a
//! struct of handles for the next tier. The dependency order
//! Network → Security → Data → Compute → Edge → Observability is enforced by
//! the builder signatures: a tier cannot be built without the handles of the
//! tiers before it.

pub mod compute;
pub mod data;
pub mod edge;
pub mod network;
pub mod observability;
pub mod security;

pub use compute::{ComputeTier, ComputeTierProvisioner, EnvironmentBindings};
pub use data::{BootstrapContract, DataTier, DataTierProvisioner};
pub use edge::{EdgeSecurityLayer, EdgeTier, FirewallRule, FirewallRuleSet};
pub use network::{EgressGateway, NetworkTopology, NetworkTopologyBuilder, Subnet};
pub use observability::{ObservabilityLayer, ObservabilityTier};
pub use security::{
    ExposureLevel, GroupRole, IngressRule, PolicyError, RuleSource, SecurityGroups,
    SecurityPolicy, SecurityPolicyGraph,
};

use crate::config::StackConfig;
use crate::graph::{GraphError, LogicalId, Value};

/// Name and environment tags carried by every resource
pub(crate) fn tags(config: &StackConfig, suffix: &str) -> Value {
    let environment = &config.environment.name;
    Value::list([
        Value::map([
            ("Key", Value::from("Name")),
            ("Value", Value::from(environment.scoped(suffix))),
        ]),
        Value::map([
            ("Key", Value::from("Environment")),
            ("Value", Value::from(environment.as_str())),
        ]),
    ])
}

pub(crate) fn logical_id(id: impl Into<String>) -> Result<LogicalId, GraphError> {
    LogicalId::new(id)
}
