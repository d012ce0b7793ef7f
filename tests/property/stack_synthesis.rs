// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Stack Synthesis
//!
//! For any valid parameters the synthesized stack spans every zone, keeps
//! the data tier off the internet, orders cleanly, and re-synthesizes to a
//! template with nothing to change.

use proptest::prelude::*;
use std::collections::BTreeSet;

use cim_stack::config::DeploymentParameters;
use cim_stack::domain::{ResourceKind, SubnetTier};
use cim_stack::orchestrator::StackOrchestrator;
use cim_stack::plan;
use cim_stack::tiers::GroupRole;

// ============================================================================
// Strategies
// ============================================================================

fn env_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,14}"
}

fn zone_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,9}", 1..3).prop_map(|labels| format!("{}.com", labels.join(".")))
}

fn parameters() -> impl Strategy<Value = DeploymentParameters> {
    (
        env_name(),
        zone_name(),
        prop::sample::select(vec!["destroy", "retain"]),
        3u32..8,
        2u32..6,
    )
        .prop_map(|(env, zone, retention, service_replicas, database_replicas)| {
            DeploymentParameters {
                env_name: Some(env),
                hosted_zone_id: Some("Z0123456789ABCDEFGHIJ".to_string()),
                hosted_zone_name: Some(zone),
                data_retention: Some(retention.to_string()),
                service_replicas: Some(service_replicas),
                database_replicas: Some(database_replicas),
                ..Default::default()
            }
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_one_subnet_per_tier_per_zone(params in parameters()) {
        let synthesis = StackOrchestrator::new().synthesize(&params).unwrap();
        let network = &synthesis.network;
        let zones = network.zone_count();

        prop_assert_eq!(network.subnets.len(), SubnetTier::ALL.len() * zones);
        for tier in SubnetTier::ALL {
            let in_tier: BTreeSet<u8> = network.subnets(tier).map(|s| s.zone.index()).collect();
            prop_assert_eq!(in_tier.len(), zones);
        }
        for (i, a) in network.subnets.iter().enumerate() {
            for b in &network.subnets[i + 1..] {
                prop_assert!(!a.cidr.overlaps(&b.cidr));
            }
        }
    }

    #[test]
    fn prop_no_internet_path_into_inner_tiers(params in parameters()) {
        let synthesis = StackOrchestrator::new().synthesize(&params).unwrap();
        for role in [GroupRole::Compute, GroupRole::Data] {
            prop_assert!(!synthesis.security.is_internet_reachable(role));
            let group = synthesis.security_groups.get(role).attribute("GroupId");
            let open = synthesis
                .graph
                .nodes_of_kind(ResourceKind::SecurityGroupIngress)
                .filter(|node| node.property("GroupId") == Some(&group))
                .any(|node| node.property("CidrIp").is_some());
            prop_assert!(!open);
        }
    }

    #[test]
    fn prop_replicas_cover_every_zone(params in parameters()) {
        let synthesis = StackOrchestrator::new().synthesize(&params).unwrap();
        let zones = synthesis.network.zone_count();
        prop_assert!(synthesis.compute.replicas as usize >= zones);
        prop_assert!(synthesis.data.instances >= zones);
    }

    #[test]
    fn prop_dependencies_precede_dependents(params in parameters()) {
        let synthesis = StackOrchestrator::new().synthesize(&params).unwrap();
        let order = synthesis.graph.provisioning_order().unwrap();
        prop_assert_eq!(order.len(), synthesis.graph.len());

        for (position, id) in order.iter().enumerate() {
            let node = synthesis.graph.get(id).unwrap();
            for dependency in node.dependencies() {
                let before = order.iter().position(|other| *other == dependency).unwrap();
                prop_assert!(before < position, "{} must follow {}", id, dependency);
            }
        }
    }

    #[test]
    fn prop_resynthesis_is_a_no_op(params in parameters()) {
        let orchestrator = StackOrchestrator::new();
        let applied = orchestrator.synthesize(&params).unwrap().template();
        let desired = orchestrator.synthesize(&params).unwrap().template();
        prop_assert!(plan::diff(Some(&applied), &desired).unwrap().is_empty());
    }

    #[test]
    fn prop_too_few_replicas_rejected(params in parameters(), replicas in 0u32..3) {
        let params = DeploymentParameters { service_replicas: Some(replicas), ..params };
        prop_assert!(StackOrchestrator::new().synthesize(&params).is_err());
    }
}
