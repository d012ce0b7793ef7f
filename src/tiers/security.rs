// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Graph
//!
//! Three security groups (edge, compute, data) and the directed allow-edges
//! between them. Each group has an exposure level, and an edge is accepted
//! only when its source is allowed for the target's exposure:
//!
//! ```text
//! Public     <- any address range
//! Internal   <- a Public group
//! Restricted <- an Internal group
//! ```
//!
//! An edge from an address range into a Restricted group is rejected as a
//! policy violation, never pruned. The graph is append-only until
//! [`SecurityPolicyGraph::seal`], after which it cannot change.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use super::{logical_id, tags};
use crate::config::StackConfig;
use crate::domain::{Ipv4Cidr, PortRange, ResourceKind};
use crate::errors::SynthesisResult;
use crate::graph::{ResourceGraph, ResourceHandle, ResourceNode, Value};
use crate::tiers::network::NetworkTopology;

/// Security policy violation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{source_range} may not reach the {target} group directly; only {allowed} sources are allowed")]
    InternetToRestricted {
        source_range: Ipv4Cidr,
        target: GroupRole,
        allowed: ExposureLevel,
    },

    #[error("{target} group ({exposure}) does not accept traffic from {origin}")]
    SourceNotAllowed {
        target: GroupRole,
        exposure: ExposureLevel,
        origin: String,
    },

    #[error("Group {0} is not part of the policy")]
    UnknownGroup(GroupRole),

    #[error("Group {0} is already defined")]
    DuplicateGroup(GroupRole),

    #[error("Rule into {target} from {origin} duplicates an existing rule")]
    DuplicateRule { target: GroupRole, origin: String },

    #[error("Rule into {0} allows no ports")]
    NoPorts(GroupRole),
}

/// How exposed a group is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExposureLevel {
    /// Reachable from the internet
    Public,
    /// Reachable from public groups only
    Internal,
    /// Reachable from internal groups only
    Restricted,
}

impl ExposureLevel {
    /// Exposure a source group must have to add an edge into this level
    pub fn allowed_source(&self) -> Option<ExposureLevel> {
        match self {
            Self::Public => None,
            Self::Internal => Some(Self::Public),
            Self::Restricted => Some(Self::Internal),
        }
    }
}

impl fmt::Display for ExposureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Internal => write!(f, "internal"),
            Self::Restricted => write!(f, "restricted"),
        }
    }
}

/// Role of a security group in the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupRole {
    /// Load balancer
    Edge,
    /// Container service
    Compute,
    /// Database cluster
    Data,
}

impl GroupRole {
    pub const ALL: [GroupRole; 3] = [Self::Edge, Self::Compute, Self::Data];

    pub fn exposure(&self) -> ExposureLevel {
        match self {
            Self::Edge => ExposureLevel::Public,
            Self::Compute => ExposureLevel::Internal,
            Self::Data => ExposureLevel::Restricted,
        }
    }

    fn logical_name(&self) -> &'static str {
        match self {
            Self::Edge => "LoadBalancer",
            Self::Compute => "Service",
            Self::Data => "Database",
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            Self::Edge => "lb",
            Self::Compute => "app",
            Self::Data => "db",
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edge => write!(f, "edge"),
            Self::Compute => write!(f, "compute"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// Where allowed traffic comes from: an address range or a group, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleSource {
    Cidr(Ipv4Cidr),
    Group(GroupRole),
}

impl RuleSource {
    /// The whole internet
    pub fn internet() -> Self {
        Self::Cidr(Ipv4Cidr::ANY)
    }
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cidr(cidr) => write!(f, "{cidr}"),
            Self::Group(role) => write!(f, "{role} group"),
        }
    }
}

/// One directed allow-edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub target: GroupRole,
    pub source: RuleSource,
    pub ports: Vec<PortRange>,
    pub description: String,
}

/// A group's settings
#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupSpec {
    description: String,
    allow_all_outbound: bool,
}

/// Append-only policy under construction
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicyGraph {
    groups: BTreeMap<GroupRole, GroupSpec>,
    rules: Vec<IngressRule>,
}

impl SecurityPolicyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three groups and three edges of the standard stack
    ///
    /// internet → edge on 80/443, edge → compute on the service port,
    /// compute → data on the database port.
    pub fn standard(config: &StackConfig) -> SynthesisResult<Self> {
        let env = &config.environment.name;
        let mut policy = Self::new();

        policy.add_group(
            GroupRole::Edge,
            format!("Security group for {env} load balancer"),
            true,
        )?;
        policy.add_group(
            GroupRole::Compute,
            format!("Security group for {env} application"),
            true,
        )?;
        policy.add_group(
            GroupRole::Data,
            format!("Security group for {env} database"),
            false,
        )?;

        policy.add_rule(IngressRule {
            target: GroupRole::Edge,
            source: RuleSource::internet(),
            ports: vec![PortRange::single(80)?, PortRange::single(443)?],
            description: "Allow HTTP and HTTPS traffic from anywhere".to_string(),
        })?;
        policy.add_rule(IngressRule {
            target: GroupRole::Compute,
            source: RuleSource::Group(GroupRole::Edge),
            ports: vec![PortRange::single(config.service.port)?],
            description: "Allow traffic from the load balancer".to_string(),
        })?;
        policy.add_rule(IngressRule {
            target: GroupRole::Data,
            source: RuleSource::Group(GroupRole::Compute),
            ports: vec![PortRange::single(config.database.port)?],
            description: "Allow PostgreSQL traffic from the application".to_string(),
        })?;

        Ok(policy)
    }

    pub fn add_group(
        &mut self,
        role: GroupRole,
        description: String,
        allow_all_outbound: bool,
    ) -> Result<(), PolicyError> {
        if self.groups.contains_key(&role) {
            return Err(PolicyError::DuplicateGroup(role));
        }
        self.groups.insert(
            role,
            GroupSpec {
                description,
                allow_all_outbound,
            },
        );
        Ok(())
    }

    /// Add an allow-edge, checked against the target's exposure level
    pub fn add_rule(&mut self, rule: IngressRule) -> Result<(), PolicyError> {
        if !self.groups.contains_key(&rule.target) {
            return Err(PolicyError::UnknownGroup(rule.target));
        }
        if rule.ports.is_empty() {
            return Err(PolicyError::NoPorts(rule.target));
        }

        let exposure = rule.target.exposure();
        match (exposure.allowed_source(), rule.source) {
            (None, RuleSource::Cidr(_)) => {}
            (Some(allowed), RuleSource::Cidr(range)) => {
                warn!(target_group = %rule.target, source = %range, "Rejected address-range rule");
                if exposure == ExposureLevel::Restricted {
                    return Err(PolicyError::InternetToRestricted {
                        source_range: range,
                        target: rule.target,
                        allowed,
                    });
                }
                return Err(PolicyError::SourceNotAllowed {
                    target: rule.target,
                    exposure,
                    origin: range.to_string(),
                });
            }
            (allowed, RuleSource::Group(source)) => {
                if !self.groups.contains_key(&source) {
                    return Err(PolicyError::UnknownGroup(source));
                }
                if allowed != Some(source.exposure()) {
                    return Err(PolicyError::SourceNotAllowed {
                        target: rule.target,
                        exposure,
                        origin: rule.source.to_string(),
                    });
                }
            }
        }

        if self
            .rules
            .iter()
            .any(|existing| existing.target == rule.target && existing.source == rule.source)
        {
            return Err(PolicyError::DuplicateRule {
                target: rule.target,
                origin: rule.source.to_string(),
            });
        }

        self.rules.push(rule);
        Ok(())
    }

    /// Freeze the policy
    pub fn seal(self) -> SecurityPolicy {
        SecurityPolicy {
            groups: self.groups,
            rules: self.rules,
        }
    }
}

/// Sealed, immutable security policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    groups: BTreeMap<GroupRole, GroupSpec>,
    rules: Vec<IngressRule>,
}

/// Handles to the materialized groups, shared by the tiers that use them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroups {
    pub edge: ResourceHandle,
    pub compute: ResourceHandle,
    pub data: ResourceHandle,
}

impl SecurityGroups {
    pub fn get(&self, role: GroupRole) -> &ResourceHandle {
        match role {
            GroupRole::Edge => &self.edge,
            GroupRole::Compute => &self.compute,
            GroupRole::Data => &self.data,
        }
    }

    /// `GroupId` of one group, as a one-element list
    pub fn group_ids(&self, role: GroupRole) -> Value {
        Value::list([self.get(role).attribute("GroupId")])
    }
}

impl SecurityPolicy {
    pub fn rules(&self) -> &[IngressRule] {
        &self.rules
    }

    /// Rules whose target is `role`
    pub fn rules_into(&self, role: GroupRole) -> impl Iterator<Item = &IngressRule> {
        self.rules.iter().filter(move |rule| rule.target == role)
    }

    /// Whether any rule lets an unrestricted address range reach `role`
    pub fn is_internet_reachable(&self, role: GroupRole) -> bool {
        self.rules_into(role)
            .any(|rule| matches!(rule.source, RuleSource::Cidr(range) if range.is_unrestricted()))
    }

    /// Add the groups and one ingress resource per rule and port
    pub fn materialize(
        &self,
        config: &StackConfig,
        network: &NetworkTopology,
        graph: &mut ResourceGraph,
    ) -> SynthesisResult<SecurityGroups> {
        let mut handles: BTreeMap<GroupRole, ResourceHandle> = BTreeMap::new();

        for role in GroupRole::ALL {
            let spec = self.groups.get(&role).ok_or(PolicyError::UnknownGroup(role))?;
            let egress = if spec.allow_all_outbound {
                Value::list([Value::map([
                    ("IpProtocol", Value::from("-1")),
                    ("CidrIp", Value::from(Ipv4Cidr::ANY.to_string())),
                ])])
            } else {
                Value::list([])
            };

            let handle = graph.add(
                ResourceNode::new(
                    logical_id(format!("{}SecurityGroup", role.logical_name()))?,
                    ResourceKind::SecurityGroup,
                )
                .with("GroupDescription", spec.description.clone())
                .with("VpcId", network.vpc.reference())
                .with("SecurityGroupEgress", egress)
                .with("Tags", tags(config, &format!("{}-sg", role.short_name()))),
            )?;
            handles.insert(role, handle);
        }

        let groups = SecurityGroups {
            edge: handles.remove(&GroupRole::Edge).ok_or(PolicyError::UnknownGroup(GroupRole::Edge))?,
            compute: handles
                .remove(&GroupRole::Compute)
                .ok_or(PolicyError::UnknownGroup(GroupRole::Compute))?,
            data: handles.remove(&GroupRole::Data).ok_or(PolicyError::UnknownGroup(GroupRole::Data))?,
        };

        for rule in &self.rules {
            for ports in &rule.ports {
                let source_name = match rule.source {
                    RuleSource::Cidr(_) => "Internet".to_string(),
                    RuleSource::Group(role) => role.logical_name().to_string(),
                };
                let mut node = ResourceNode::new(
                    logical_id(format!(
                        "{}IngressFrom{}Port{}",
                        rule.target.logical_name(),
                        source_name,
                        ports.from_port()
                    ))?,
                    ResourceKind::SecurityGroupIngress,
                )
                .with("GroupId", groups.get(rule.target).attribute("GroupId"))
                .with("IpProtocol", "tcp")
                .with("FromPort", ports.from_port())
                .with("ToPort", ports.to_port())
                .with("Description", rule.description.clone());

                node = match rule.source {
                    RuleSource::Cidr(range) => node.with("CidrIp", range.to_string()),
                    RuleSource::Group(role) => {
                        node.with("SourceSecurityGroupId", groups.get(role).attribute("GroupId"))
                    }
                };
                graph.add(node)?;
            }
        }

        info!(
            environment = %config.environment.name,
            groups = GroupRole::ALL.len(),
            edges = self.rules.len(),
            "Security policy materialized"
        );

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentParameters;
    use crate::tiers::network::NetworkTopologyBuilder;

    fn config() -> StackConfig {
        let params = DeploymentParameters {
            env_name: Some("dev".to_string()),
            hosted_zone_id: Some("Z0123456789ABC".to_string()),
            hosted_zone_name: Some("example.com".to_string()),
            ..Default::default()
        };
        StackConfig::from_parameters(&params).unwrap().0
    }

    #[test]
    fn test_standard_policy_has_three_edges() {
        let policy = SecurityPolicyGraph::standard(&config()).unwrap().seal();
        assert_eq!(policy.rules().len(), 3);
        assert!(policy.is_internet_reachable(GroupRole::Edge));
        assert!(!policy.is_internet_reachable(GroupRole::Compute));
        assert!(!policy.is_internet_reachable(GroupRole::Data));
    }

    #[test]
    fn test_internet_to_data_is_rejected() {
        let mut policy = SecurityPolicyGraph::standard(&config()).unwrap();
        let result = policy.add_rule(IngressRule {
            target: GroupRole::Data,
            source: RuleSource::internet(),
            ports: vec![PortRange::single(5432).unwrap()],
            description: "direct database access".to_string(),
        });
        assert!(matches!(
            result,
            Err(PolicyError::InternetToRestricted {
                target: GroupRole::Data,
                ..
            })
        ));
        assert_eq!(policy.seal().rules().len(), 3);
    }

    #[test]
    fn test_exposure_levels_cannot_be_skipped() {
        let mut policy = SecurityPolicyGraph::standard(&config()).unwrap();

        // edge → data skips the compute tier
        assert!(matches!(
            policy.add_rule(IngressRule {
                target: GroupRole::Data,
                source: RuleSource::Group(GroupRole::Edge),
                ports: vec![PortRange::single(5432).unwrap()],
                description: String::new(),
            }),
            Err(PolicyError::SourceNotAllowed { .. })
        ));

        // a private range into compute is still an address range
        assert!(policy
            .add_rule(IngressRule {
                target: GroupRole::Compute,
                source: RuleSource::Cidr(Ipv4Cidr::new("10.0.0.0/8").unwrap()),
                ports: vec![PortRange::single(5000).unwrap()],
                description: String::new(),
            })
            .is_err());
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let mut policy = SecurityPolicyGraph::standard(&config()).unwrap();
        assert!(matches!(
            policy.add_rule(IngressRule {
                target: GroupRole::Compute,
                source: RuleSource::Group(GroupRole::Edge),
                ports: vec![PortRange::single(8080).unwrap()],
                description: String::new(),
            }),
            Err(PolicyError::DuplicateRule { .. })
        ));
    }

    #[test]
    fn test_materialize_adds_one_ingress_per_port() {
        let config = config();
        let mut graph = ResourceGraph::new();
        let network = NetworkTopologyBuilder::new(&config).build(&mut graph).unwrap();
        let policy = SecurityPolicyGraph::standard(&config).unwrap().seal();
        let groups = policy.materialize(&config, &network, &mut graph).unwrap();

        assert_eq!(graph.nodes_of_kind(ResourceKind::SecurityGroup).count(), 3);
        assert_eq!(graph.nodes_of_kind(ResourceKind::SecurityGroupIngress).count(), 4);

        for ingress in graph.nodes_of_kind(ResourceKind::SecurityGroupIngress) {
            let has_cidr = ingress.property("CidrIp").is_some();
            let has_group = ingress.property("SourceSecurityGroupId").is_some();
            assert!(has_cidr ^ has_group);
        }

        let data_node = graph.node(&groups.data).unwrap();
        assert_eq!(
            data_node.property("SecurityGroupEgress"),
            Some(&Value::list([]))
        );
    }
}
