// Copyright (c) 2025 - Cowboy AI, Inc.
//! Data Tier
//!
//! A replicated, encrypted relational cluster in the isolated data subnets.
//! Credentials enter the graph only as a named secret reference; the cluster
//! node never carries a literal username or password. Deletion behavior
//! follows the environment's explicit data retention flag.

use tracing::info;

use super::{logical_id, tags};
use crate::config::StackConfig;
use crate::domain::invariants::{
    validate_credential_reference, validate_replica_count, validate_storage_encryption,
    ValidationResult,
};
use crate::domain::{ResourceKind, SubnetTier};
use crate::errors::SynthesisResult;
use crate::graph::{ResourceGraph, ResourceHandle, ResourceNode, SecretRef, Value};
use crate::tiers::network::NetworkTopology;
use crate::tiers::security::{GroupRole, SecurityGroups};

/// What the health service must find (or create) in the cluster
///
/// This is the schema bootstrap hook: the data tier names the database and
/// table, the health service guarantees they exist before reporting ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapContract {
    pub database_name: String,
    pub table_name: String,
    pub port: u16,
}

/// The provisioned data tier
#[derive(Debug, Clone, PartialEq)]
pub struct DataTier {
    pub encryption_key: ResourceHandle,
    pub subnet_group: ResourceHandle,
    pub cluster: ResourceHandle,
    pub credentials: SecretRef,
    pub instances: usize,
    pub bootstrap: BootstrapContract,
}

impl DataTier {
    /// Writer endpoint address, resolved after the cluster exists
    pub fn endpoint(&self) -> Value {
        self.cluster.attribute("Endpoint.Address")
    }

    /// Reader endpoint address, resolved after the cluster exists
    pub fn read_endpoint(&self) -> Value {
        self.cluster.attribute("ReadEndpoint.Address")
    }
}

/// Provisions the [`DataTier`]
pub struct DataTierProvisioner<'a> {
    config: &'a StackConfig,
    network: &'a NetworkTopology,
    groups: &'a SecurityGroups,
}

impl<'a> DataTierProvisioner<'a> {
    pub fn new(
        config: &'a StackConfig,
        network: &'a NetworkTopology,
        groups: &'a SecurityGroups,
    ) -> Self {
        Self {
            config,
            network,
            groups,
        }
    }

    pub fn provision(&self, graph: &mut ResourceGraph) -> SynthesisResult<DataTier> {
        let config = self.config;
        let settings = &config.database;
        let env = &config.environment;
        let policy = env.retention.deletion_policy();
        let zones = config.availability_zones();

        let instances = 1 + settings.replicas as usize;
        validate_replica_count("database cluster", instances, zones.len())?;

        let credentials = SecretRef::new(config.credentials_secret_name());
        let username = Value::from(credentials.field("username"));
        let password = Value::from(credentials.field("password"));

        let encryption_key = graph.add(
            ResourceNode::new(logical_id("DatabaseKey")?, ResourceKind::EncryptionKey)
                .with("Description", format!("Storage encryption key for {}", env.name))
                .with("EnableKeyRotation", true)
                .with("PendingWindowInDays", 7u32)
                .with("Tags", tags(config, "kms-key"))
                .deletion_policy(policy),
        )?;

        let subnet_group = graph.add(
            ResourceNode::new(logical_id("DatabaseSubnetGroup")?, ResourceKind::DatabaseSubnetGroup)
                .with(
                    "DBSubnetGroupDescription",
                    format!("Subnet group for {} database", env.name),
                )
                .with("SubnetIds", self.network.subnet_refs(SubnetTier::Data))
                .with("Tags", tags(config, "db-subnet-group")),
        )?;

        // Writer first, then readers, spread round-robin across zones.
        let members = Value::list((0..instances).map(|index| {
            let zone = &zones[index % zones.len()];
            Value::map([
                ("InstanceClass", Value::from(settings.instance_class.as_str())),
                ("AvailabilityZone", Value::from(zone.name())),
                ("Role", Value::from(if index == 0 { "writer" } else { "reader" })),
            ])
        }));

        let major_version = settings
            .engine_version
            .split('.')
            .next()
            .unwrap_or(settings.engine_version.as_str());

        let cluster_node =
            ResourceNode::new(logical_id("DatabaseCluster")?, ResourceKind::DatabaseCluster)
                .with("Engine", settings.engine.as_str())
                .with("EngineVersion", settings.engine_version.as_str())
                .with(
                    "DBClusterParameterGroupName",
                    format!("default.{}{}", settings.engine, major_version),
                )
                .with("MasterUsername", username)
                .with("MasterUserPassword", password)
                .with("DatabaseName", settings.database_name.as_str())
                .with("Port", settings.port)
                .with("StorageEncrypted", true)
                .with("KmsKeyId", encryption_key.attribute("Arn"))
                .with("DBSubnetGroupName", subnet_group.reference())
                .with("VpcSecurityGroupIds", self.groups.group_ids(GroupRole::Data))
                .with("EnableCloudwatchLogsExports", Value::list([Value::from("postgresql")]))
                .with("CopyTagsToSnapshot", true)
                .with("DeletionProtection", env.deletion_protection())
                .with("MonitoringInterval", settings.monitoring_interval_secs)
                .with("Instances", members)
                .with("Tags", tags(config, "aurora-cluster"))
                .deletion_policy(policy);
        verify_cluster(&cluster_node)?;
        let cluster = graph.add(cluster_node)?;

        info!(
            environment = %env.name,
            instances,
            retention = %env.retention,
            "Data tier synthesized"
        );

        Ok(DataTier {
            encryption_key,
            subnet_group,
            cluster,
            credentials,
            instances,
            bootstrap: BootstrapContract {
                database_name: settings.database_name.clone(),
                table_name: settings.table_name.clone(),
                port: settings.port,
            },
        })
    }
}

/// Check an emitted cluster node for literal credentials and plaintext storage
fn verify_cluster(node: &ResourceNode) -> ValidationResult {
    for field in ["MasterUsername", "MasterUserPassword"] {
        let literal = node.property(field).map_or(true, Value::is_literal);
        validate_credential_reference(field, literal)?;
    }
    let encrypted = node
        .property("StorageEncrypted")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    validate_storage_encryption("database cluster", encrypted)
}
