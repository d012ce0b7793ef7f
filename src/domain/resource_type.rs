// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Resource Type Domain Model
//!
//! Defines the closed taxonomy of platform resources a stack can contain.
//! The set is fixed: synthesis never emits a resource type outside this enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform resource type taxonomy
///
/// Every node in a [`ResourceGraph`](crate::graph::ResourceGraph) carries one
/// of these kinds. The platform type name is what the provisioning engine
/// dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    // Network
    /// Isolated virtual network (address space)
    Network,
    /// Internet gateway attached to the network
    InternetGateway,
    /// Subnet of one tier in one availability zone
    Subnet,
    /// Per-AZ egress (NAT) gateway
    EgressGateway,
    /// Flow log capturing network traffic
    FlowLog,

    // Security
    /// Security group (named allow-list)
    SecurityGroup,
    /// One directed allow-edge into a security group
    SecurityGroupIngress,
    /// Customer-managed encryption key
    EncryptionKey,

    // Data
    /// Subnet group the database is placed into
    DatabaseSubnetGroup,
    /// Replicated relational database cluster
    DatabaseCluster,

    // Compute
    /// Container orchestration cluster
    ContainerCluster,
    /// Role assumed by running tasks
    TaskRole,
    /// Container task definition
    TaskDefinition,
    /// Replicated containerized service
    ComputeService,
    /// Public application load balancer
    LoadBalancer,
    /// Load balancer listener
    Listener,
    /// Load balancer target group (health-check binding)
    TargetGroup,
    /// TLS certificate
    Certificate,

    // Edge
    /// Web application firewall rule set
    WebAcl,
    /// Binding of a Web ACL to a load balancer
    WebAclAssociation,
    /// DNS alias record
    DnsRecord,

    // Observability
    /// Log group
    LogGroup,
    /// Metric threshold alarm
    Alarm,
    /// Notification topic
    NotificationTopic,
    /// Object storage bucket
    Bucket,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 25] = [
        Self::Network,
        Self::InternetGateway,
        Self::Subnet,
        Self::EgressGateway,
        Self::FlowLog,
        Self::SecurityGroup,
        Self::SecurityGroupIngress,
        Self::EncryptionKey,
        Self::DatabaseSubnetGroup,
        Self::DatabaseCluster,
        Self::ContainerCluster,
        Self::TaskRole,
        Self::TaskDefinition,
        Self::ComputeService,
        Self::LoadBalancer,
        Self::Listener,
        Self::TargetGroup,
        Self::Certificate,
        Self::WebAcl,
        Self::WebAclAssociation,
        Self::DnsRecord,
        Self::LogGroup,
        Self::Alarm,
        Self::NotificationTopic,
        Self::Bucket,
    ];

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::InternetGateway => "internet_gateway",
            Self::Subnet => "subnet",
            Self::EgressGateway => "egress_gateway",
            Self::FlowLog => "flow_log",
            Self::SecurityGroup => "security_group",
            Self::SecurityGroupIngress => "security_group_ingress",
            Self::EncryptionKey => "encryption_key",
            Self::DatabaseSubnetGroup => "database_subnet_group",
            Self::DatabaseCluster => "database_cluster",
            Self::ContainerCluster => "container_cluster",
            Self::TaskRole => "task_role",
            Self::TaskDefinition => "task_definition",
            Self::ComputeService => "compute_service",
            Self::LoadBalancer => "load_balancer",
            Self::Listener => "listener",
            Self::TargetGroup => "target_group",
            Self::Certificate => "certificate",
            Self::WebAcl => "web_acl",
            Self::WebAclAssociation => "web_acl_association",
            Self::DnsRecord => "dns_record",
            Self::LogGroup => "log_group",
            Self::Alarm => "alarm",
            Self::NotificationTopic => "notification_topic",
            Self::Bucket => "bucket",
        }
    }

    /// Platform resource type name used in the rendered template
    pub fn platform_type(&self) -> &'static str {
        match self {
            Self::Network => "AWS::EC2::VPC",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::EgressGateway => "AWS::EC2::NatGateway",
            Self::FlowLog => "AWS::EC2::FlowLog",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::EncryptionKey => "AWS::KMS::Key",
            Self::DatabaseSubnetGroup => "AWS::RDS::DBSubnetGroup",
            Self::DatabaseCluster => "AWS::RDS::DBCluster",
            Self::ContainerCluster => "AWS::ECS::Cluster",
            Self::TaskRole => "AWS::IAM::Role",
            Self::TaskDefinition => "AWS::ECS::TaskDefinition",
            Self::ComputeService => "AWS::ECS::Service",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::Certificate => "AWS::CertificateManager::Certificate",
            Self::WebAcl => "AWS::WAFv2::WebACL",
            Self::WebAclAssociation => "AWS::WAFv2::WebACLAssociation",
            Self::DnsRecord => "AWS::Route53::RecordSet",
            Self::LogGroup => "AWS::Logs::LogGroup",
            Self::Alarm => "AWS::CloudWatch::Alarm",
            Self::NotificationTopic => "AWS::SNS::Topic",
            Self::Bucket => "AWS::S3::Bucket",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Network => "Network",
            Self::InternetGateway => "Internet Gateway",
            Self::Subnet => "Subnet",
            Self::EgressGateway => "Egress Gateway",
            Self::FlowLog => "Flow Log",
            Self::SecurityGroup => "Security Group",
            Self::SecurityGroupIngress => "Security Group Ingress",
            Self::EncryptionKey => "Encryption Key",
            Self::DatabaseSubnetGroup => "Database Subnet Group",
            Self::DatabaseCluster => "Database Cluster",
            Self::ContainerCluster => "Container Cluster",
            Self::TaskRole => "Task Role",
            Self::TaskDefinition => "Task Definition",
            Self::ComputeService => "Compute Service",
            Self::LoadBalancer => "Load Balancer",
            Self::Listener => "Listener",
            Self::TargetGroup => "Target Group",
            Self::Certificate => "Certificate",
            Self::WebAcl => "Web ACL",
            Self::WebAclAssociation => "Web ACL Association",
            Self::DnsRecord => "DNS Record",
            Self::LogGroup => "Log Group",
            Self::Alarm => "Alarm",
            Self::NotificationTopic => "Notification Topic",
            Self::Bucket => "Bucket",
        }
    }

    /// Get the tier that owns this kind of resource
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Network
            | Self::InternetGateway
            | Self::Subnet
            | Self::EgressGateway
            | Self::FlowLog => ResourceCategory::Network,

            Self::SecurityGroup | Self::SecurityGroupIngress => ResourceCategory::Security,

            Self::EncryptionKey | Self::DatabaseSubnetGroup | Self::DatabaseCluster => {
                ResourceCategory::Data
            }

            Self::ContainerCluster
            | Self::TaskRole
            | Self::TaskDefinition
            | Self::ComputeService
            | Self::LoadBalancer
            | Self::Listener
            | Self::TargetGroup
            | Self::Certificate => ResourceCategory::Compute,

            Self::WebAcl | Self::WebAclAssociation | Self::DnsRecord => ResourceCategory::Edge,

            Self::LogGroup | Self::Alarm | Self::NotificationTopic | Self::Bucket => {
                ResourceCategory::Observability
            }
        }
    }

    /// Look up a kind by its platform type name
    pub fn from_platform_type(platform_type: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.platform_type() == platform_type)
    }

    /// Check if deleting this resource destroys persistent data
    pub fn holds_data(&self) -> bool {
        matches!(
            self,
            Self::DatabaseCluster | Self::EncryptionKey | Self::Bucket | Self::LogGroup
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Resource category (owning tier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// Network topology
    Network,
    /// Security policy graph
    Security,
    /// Data tier
    Data,
    /// Compute tier
    Compute,
    /// Edge security layer
    Edge,
    /// Observability layer
    Observability,
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "Network"),
            Self::Security => write!(f, "Security"),
            Self::Data => write!(f, "Data"),
            Self::Compute => write!(f, "Compute"),
            Self::Edge => write!(f, "Edge"),
            Self::Observability => write!(f, "Observability"),
        }
    }
}
