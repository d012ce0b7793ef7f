// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Synthesis Integration Tests
//!
//! Synthesizes whole stacks from deployment parameters and checks the
//! resulting graph across tiers.

mod fixtures;

use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

use cim_stack::config::DeploymentParameters;
use cim_stack::domain::{DeletionPolicy, ResourceCategory, ResourceKind, SubnetTier};
use cim_stack::errors::SynthesisError;
use cim_stack::graph::{LogicalId, Value};
use cim_stack::orchestrator::StackOrchestrator;
use cim_stack::tiers::GroupRole;

use fixtures::{dev_parameters, prod_parameters, synthesize, HOSTED_ZONE_NAME};

#[test_case(DeploymentParameters { hosted_zone_id: None, ..dev_parameters() }, "hosted_zone_id" ; "missing zone id")]
#[test_case(DeploymentParameters { hosted_zone_name: None, ..dev_parameters() }, "hosted_zone_name" ; "missing zone name")]
#[test_case(DeploymentParameters { hosted_zone_id: Some("  ".to_string()), ..dev_parameters() }, "hosted_zone_id" ; "blank zone id")]
#[test_case(DeploymentParameters { hosted_zone_id: None, hosted_zone_name: None, ..dev_parameters() }, "hosted_zone_id" ; "zone id reported first")]
fn test_missing_required_parameter(params: DeploymentParameters, expected: &str) {
    let err = StackOrchestrator::new().synthesize(&params).unwrap_err();
    match err {
        SynthesisError::MissingParameter(name) => assert_eq!(name, expected),
        other => panic!("expected missing parameter, got {other:?}"),
    }
}

#[test]
fn test_missing_retention_outside_dev_is_rejected() {
    let params = DeploymentParameters {
        env_name: Some("staging".to_string()),
        ..dev_parameters()
    };
    let err = StackOrchestrator::new().synthesize(&params).unwrap_err();
    assert!(matches!(err, SynthesisError::MissingParameter("data_retention")));
}

#[test]
fn test_default_environment_is_reported() {
    let params = DeploymentParameters {
        env_name: None,
        ..dev_parameters()
    };
    let synthesis = synthesize(&params);
    assert_eq!(synthesis.config.environment.name.as_str(), "dev");
    assert_eq!(synthesis.warnings.len(), 1);
    assert_eq!(synthesis.edge.domain.as_str(), format!("dev.{HOSTED_ZONE_NAME}"));
}

#[test]
fn test_three_zone_topology() {
    let synthesis = synthesize(&dev_parameters());
    let network = &synthesis.network;

    assert_eq!(network.zone_count(), 3);
    assert_eq!(network.subnets.len(), 9);
    assert_eq!(network.egress_gateways.len(), 3);
    for tier in SubnetTier::ALL {
        assert_eq!(network.subnets(tier).count(), 3, "tier {tier}");
    }

    // Each egress gateway sits in the public subnet of its own zone.
    let mut gateway_zones: Vec<_> = network.egress_gateways.iter().map(|g| g.zone.index()).collect();
    gateway_zones.dedup();
    assert_eq!(gateway_zones, vec![0, 1, 2]);

    assert_eq!(synthesis.graph.nodes_of_kind(ResourceKind::Subnet).count(), 9);
    assert_eq!(synthesis.graph.nodes_of_kind(ResourceKind::EgressGateway).count(), 3);
}

#[test]
fn test_subnets_do_not_overlap() {
    let synthesis = synthesize(&dev_parameters());
    let subnets = &synthesis.network.subnets;
    for (i, a) in subnets.iter().enumerate() {
        assert!(synthesis.network.cidr.contains(&a.cidr));
        for b in &subnets[i + 1..] {
            assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.cidr, b.cidr);
        }
    }
}

#[test]
fn test_only_edge_is_internet_reachable() {
    let synthesis = synthesize(&dev_parameters());
    assert!(synthesis.security.is_internet_reachable(GroupRole::Edge));
    assert!(!synthesis.security.is_internet_reachable(GroupRole::Compute));
    assert!(!synthesis.security.is_internet_reachable(GroupRole::Data));
}

#[test]
fn test_database_reachable_only_from_compute() {
    let synthesis = synthesize(&dev_parameters());
    let data_group = synthesis.security_groups.data.attribute("GroupId");
    let compute_group = synthesis.security_groups.compute.attribute("GroupId");

    let into_data: Vec<_> = synthesis
        .graph
        .nodes_of_kind(ResourceKind::SecurityGroupIngress)
        .filter(|node| node.property("GroupId") == Some(&data_group))
        .collect();

    assert!(!into_data.is_empty());
    for rule in into_data {
        assert_eq!(rule.property("CidrIp"), None);
        assert_eq!(rule.property("SourceSecurityGroupId"), Some(&compute_group));
        assert_eq!(rule.property("FromPort"), Some(&Value::from(5432u16)));
    }
}

#[test]
fn test_service_spans_every_zone() {
    let synthesis = synthesize(&dev_parameters());
    assert!(synthesis.compute.replicas as usize >= synthesis.network.zone_count());
    assert!(synthesis.data.instances >= synthesis.network.zone_count());
}

#[test]
fn test_too_few_service_replicas_is_rejected() {
    let params = DeploymentParameters {
        service_replicas: Some(2),
        ..dev_parameters()
    };
    let err = StackOrchestrator::new().synthesize(&params).unwrap_err();
    assert!(matches!(err, SynthesisError::Validation(_)));
}

#[test_case(dev_parameters(), DeletionPolicy::Delete ; "dev destroys data")]
#[test_case(prod_parameters(), DeletionPolicy::Retain ; "prod retains data")]
fn test_data_retention_drives_deletion_policy(params: DeploymentParameters, expected: DeletionPolicy) {
    let synthesis = synthesize(&params);
    let cluster = synthesis.graph.node(&synthesis.data.cluster).unwrap();
    assert_eq!(cluster.deletion_policy, expected);
}

#[test]
fn test_credentials_never_literal() {
    let synthesis = synthesize(&dev_parameters());
    let template = synthesis.template();
    let cluster = &template.resources["DatabaseCluster"];

    assert_eq!(
        cluster.properties["MasterUsername"],
        json!({"Fn::Secret": ["dev-aurora-credentials", "username"]})
    );
    assert_eq!(
        cluster.properties["MasterUserPassword"],
        json!({"Fn::Secret": ["dev-aurora-credentials", "password"]})
    );
}

#[test]
fn test_outputs() {
    let synthesis = synthesize(&prod_parameters());
    let outputs = synthesis.graph.outputs();

    assert_eq!(outputs["EnvName"].value, Value::from("prod"));
    assert_eq!(
        outputs["RecordDomainName"].value,
        Value::from(format!("https://prod.{HOSTED_ZONE_NAME}"))
    );
    assert_eq!(outputs["LoadBalancerDNS"].value, synthesis.compute.load_balancer_dns());
    assert_eq!(outputs["DBEndpoint"].export_name.as_deref(), Some("prod-DBEndpoint"));
}

#[test]
fn test_every_tier_contributes_resources() {
    let synthesis = synthesize(&dev_parameters());
    let counts = synthesis.graph.count_by_category();

    assert_eq!(counts.len(), 6);
    assert_eq!(counts.values().sum::<usize>(), synthesis.graph.len());
    assert_eq!(counts.get(&ResourceCategory::Data), Some(&3));
    assert_eq!(counts.get(&ResourceCategory::Edge), Some(&3));
    assert_eq!(counts.get(&ResourceCategory::Security), Some(&7));
}

#[test]
fn test_synthesis_is_deterministic() {
    let first = synthesize(&dev_parameters()).template().to_json_pretty().unwrap();
    let second = synthesize(&dev_parameters()).template().to_json_pretty().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_alias_targets_load_balancer() {
    let synthesis = synthesize(&dev_parameters());
    let record = synthesis.graph.node(&synthesis.edge.alias_record).unwrap();
    assert_eq!(record.kind, ResourceKind::DnsRecord);
    assert!(record
        .dependencies()
        .contains(&LogicalId::new("LoadBalancer").unwrap()));
}
