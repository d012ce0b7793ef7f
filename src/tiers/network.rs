// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Topology
//!
//! Builds the isolated network: one address block carved into a public, an
//! app and a data subnet per availability zone, one egress gateway per zone,
//! and flow logging of all traffic.
//!
//! The whole layout is planned and validated before the first resource is
//! added, so a bad mask or zone count never leaves a partial network behind.

use tracing::{debug, info};

use super::{logical_id, tags};
use crate::config::StackConfig;
use crate::domain::invariants::{
    validate_egress_gateways, validate_subnet_layout, validate_tier_routing, validate_zone_count,
};
use crate::domain::{AvailabilityZone, Ipv4Cidr, NetworkError, ResourceKind, RoutingMode, SubnetTier};
use crate::errors::SynthesisResult;
use crate::graph::{ResourceGraph, ResourceHandle, ResourceNode, Value};

/// One provisioned subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub handle: ResourceHandle,
    pub tier: SubnetTier,
    pub zone: AvailabilityZone,
    pub cidr: Ipv4Cidr,
    pub routing: RoutingMode,
}

/// One per-zone egress gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressGateway {
    pub handle: ResourceHandle,
    pub zone: AvailabilityZone,
}

/// The provisioned network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTopology {
    pub vpc: ResourceHandle,
    pub cidr: Ipv4Cidr,
    pub internet_gateway: ResourceHandle,
    pub subnets: Vec<Subnet>,
    pub egress_gateways: Vec<EgressGateway>,
    pub flow_log_group: ResourceHandle,
    pub flow_log: ResourceHandle,
}

impl NetworkTopology {
    /// Subnets of one tier, in zone order
    pub fn subnets(&self, tier: SubnetTier) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter().filter(move |subnet| subnet.tier == tier)
    }

    /// `Ref`s to the subnets of one tier
    pub fn subnet_refs(&self, tier: SubnetTier) -> Value {
        Value::list(self.subnets(tier).map(|subnet| subnet.handle.reference()))
    }

    pub fn zone_count(&self) -> usize {
        self.egress_gateways.len()
    }
}

/// Planned subnet, before anything is added to the graph
#[derive(Debug, Clone)]
struct SubnetPlan {
    tier: SubnetTier,
    zone: AvailabilityZone,
    cidr: Ipv4Cidr,
}

/// Builds the [`NetworkTopology`]
pub struct NetworkTopologyBuilder<'a> {
    config: &'a StackConfig,
}

impl<'a> NetworkTopologyBuilder<'a> {
    pub fn new(config: &'a StackConfig) -> Self {
        Self { config }
    }

    /// Carve the address block: tiers in order, zones within a tier
    ///
    /// Subnet `i` of tier `t` gets index `t * zones + i`, so with three zones
    /// the public tier takes blocks 0-2, app 3-5 and data 6-8.
    fn plan(&self) -> SynthesisResult<Vec<SubnetPlan>> {
        let settings = &self.config.network;
        let zones = self.config.availability_zones();
        validate_zone_count(zones.len(), usize::from(AvailabilityZone::MAX_PER_REGION))?;

        let needed = (SubnetTier::ALL.len() * zones.len()) as u64;
        let capacity = settings.cidr.subnet_capacity(settings.subnet_mask)?;
        if capacity < needed {
            return Err(NetworkError::SubnetOutOfRange {
                parent: settings.cidr.to_string(),
                mask: settings.subnet_mask,
                index: needed - 1,
                capacity,
            }
            .into());
        }

        let mut plan = Vec::with_capacity(needed as usize);
        for (tier_index, tier) in SubnetTier::ALL.iter().enumerate() {
            for zone in &zones {
                let index = (tier_index * zones.len() + usize::from(zone.index())) as u64;
                plan.push(SubnetPlan {
                    tier: *tier,
                    zone: zone.clone(),
                    cidr: settings.cidr.subnet(settings.subnet_mask, index)?,
                });
            }
        }

        let layout: Vec<(SubnetTier, usize)> = plan
            .iter()
            .map(|subnet| (subnet.tier, usize::from(subnet.zone.index())))
            .collect();
        validate_subnet_layout(zones.len(), &layout)?;

        Ok(plan)
    }

    /// Add the network to the graph
    pub fn build(&self, graph: &mut ResourceGraph) -> SynthesisResult<NetworkTopology> {
        let plan = self.plan()?;
        let config = self.config;
        let cidr = config.network.cidr;
        let retention = config.environment.retention.deletion_policy();

        let vpc = graph.add(
            ResourceNode::new(logical_id("Vpc")?, ResourceKind::Network)
                .with("CidrBlock", cidr.to_string())
                .with("EnableDnsHostnames", true)
                .with("EnableDnsSupport", true)
                .with("Tags", tags(config, "vpc")),
        )?;

        let internet_gateway = graph.add(
            ResourceNode::new(logical_id("InternetGateway")?, ResourceKind::InternetGateway)
                .with("VpcId", vpc.reference())
                .with("Tags", tags(config, "igw")),
        )?;

        let mut subnets = Vec::with_capacity(plan.len());
        let mut egress_gateways = Vec::new();

        // Public subnets first: egress gateways live in them, app subnets route through those.
        for subnet in plan.iter().filter(|s| s.tier == SubnetTier::Public) {
            let handle = graph.add(
                self.subnet_node(&vpc, subnet)?
                    .with("MapPublicIpOnLaunch", true)
                    .with(
                        "DefaultRoute",
                        Value::map([("GatewayId", internet_gateway.reference())]),
                    )
                    .after(&internet_gateway),
            )?;
            subnets.push(self.subnet(handle, subnet)?);
        }

        for public in subnets.iter().filter(|s| s.tier == SubnetTier::Public) {
            let handle = graph.add(
                ResourceNode::new(
                    logical_id(format!("EgressGateway{}", public.zone.ordinal()))?,
                    ResourceKind::EgressGateway,
                )
                .with("SubnetId", public.handle.reference())
                .with("ConnectivityType", "public")
                .with("Tags", tags(config, &format!("nat-{}", public.zone.ordinal()))),
            )?;
            egress_gateways.push(EgressGateway {
                handle,
                zone: public.zone.clone(),
            });
        }

        for subnet in plan.iter().filter(|s| s.tier != SubnetTier::Public) {
            let mut node = self.subnet_node(&vpc, subnet)?.with("MapPublicIpOnLaunch", false);
            if subnet.tier.routing_mode() == RoutingMode::EgressOnly {
                let gateway = egress_gateways
                    .iter()
                    .find(|gateway| gateway.zone == subnet.zone)
                    .map(|gateway| gateway.handle.reference());
                if let Some(gateway) = gateway {
                    node = node.with("DefaultRoute", Value::map([("NatGatewayId", gateway)]));
                }
            }
            let handle = graph.add(node)?;
            subnets.push(self.subnet(handle, subnet)?);
        }

        let gateway_zones: Vec<usize> = egress_gateways
            .iter()
            .map(|gateway| usize::from(gateway.zone.index()))
            .collect();
        validate_egress_gateways(config.network.zone_count.into(), &gateway_zones)?;

        let flow_log_group = graph.add(
            ResourceNode::new(logical_id("FlowLogGroup")?, ResourceKind::LogGroup)
                .with(
                    "LogGroupName",
                    format!("/{}/vpc/flow-logs", config.environment.name),
                )
                .with("RetentionInDays", config.service.log_retention_days)
                .deletion_policy(retention),
        )?;

        let flow_log = graph.add(
            ResourceNode::new(logical_id("FlowLog")?, ResourceKind::FlowLog)
                .with("ResourceId", vpc.reference())
                .with("ResourceType", "VPC")
                .with("TrafficType", "ALL")
                .with("LogDestinationType", "cloud-watch-logs")
                .with("LogGroupName", flow_log_group.reference())
                .with("Tags", tags(config, "flow-log")),
        )?;

        info!(
            environment = %config.environment.name,
            cidr = %cidr,
            subnets = subnets.len(),
            egress_gateways = egress_gateways.len(),
            "Network topology synthesized"
        );

        Ok(NetworkTopology {
            vpc,
            cidr,
            internet_gateway,
            subnets,
            egress_gateways,
            flow_log_group,
            flow_log,
        })
    }

    fn subnet_node(&self, vpc: &ResourceHandle, plan: &SubnetPlan) -> SynthesisResult<ResourceNode> {
        let name = format!("{}-subnet-{}", plan.tier, plan.zone.ordinal());
        debug!(subnet = %name, cidr = %plan.cidr, zone = %plan.zone, "Planned subnet");

        Ok(ResourceNode::new(
            logical_id(format!("{}Subnet{}", tier_prefix(plan.tier), plan.zone.ordinal()))?,
            ResourceKind::Subnet,
        )
        .with("VpcId", vpc.reference())
        .with("CidrBlock", plan.cidr.to_string())
        .with("AvailabilityZone", plan.zone.name())
        .with("RoutingMode", routing_name(plan.tier.routing_mode()))
        .with("Tags", tags(self.config, &name)))
    }

    fn subnet(&self, handle: ResourceHandle, plan: &SubnetPlan) -> SynthesisResult<Subnet> {
        let routing = plan.tier.routing_mode();
        validate_tier_routing(plan.tier, routing)?;
        Ok(Subnet {
            handle,
            tier: plan.tier,
            zone: plan.zone.clone(),
            cidr: plan.cidr,
            routing,
        })
    }
}

fn tier_prefix(tier: SubnetTier) -> &'static str {
    match tier {
        SubnetTier::Public => "Public",
        SubnetTier::App => "App",
        SubnetTier::Data => "Data",
    }
}

fn routing_name(mode: RoutingMode) -> &'static str {
    match mode {
        RoutingMode::Public => "public",
        RoutingMode::EgressOnly => "egress_only",
        RoutingMode::Isolated => "isolated",
    }
}
