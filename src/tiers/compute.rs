// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Tier
//!
//! Container cluster, task definition and a service with one task per zone,
//! fronted by a public load balancer. The HTTPS listener serves the DNS
//! validated certificate; the HTTP listener only redirects. The target
//! group's health check is the liveness contract with the health service.
//!
//! Building this tier requires the [`DataTier`]: the environment bindings
//! handed to the container carry the database endpoint, which only exists
//! as a reference into the data tier.

use std::collections::BTreeMap;
use tracing::info;

use super::{logical_id, tags};
use crate::config::StackConfig;
use crate::domain::invariants::{
    validate_credential_reference, validate_health_check, validate_http_redirect,
    validate_replica_count, ValidationResult,
};
use crate::domain::{ResourceKind, SubnetTier};
use crate::errors::SynthesisResult;
use crate::graph::{PseudoParameter, ResourceGraph, ResourceHandle, ResourceNode, SecretRef, Value};
use crate::tiers::data::DataTier;
use crate::tiers::network::NetworkTopology;
use crate::tiers::security::{GroupRole, SecurityGroups};

/// Container name inside the task definition
pub const CONTAINER_NAME: &str = "web";

/// Recommended TLS policy for the HTTPS listener
pub const TLS_POLICY: &str = "ELBSecurityPolicy-TLS13-1-2-2021-06";

/// Environment handed to the health service container
///
/// Plain variables may hold references (the database host), secrets hold
/// only secret references; neither ever holds a credential literal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvironmentBindings {
    pub variables: BTreeMap<String, Value>,
    pub secrets: BTreeMap<String, SecretRef>,
}

impl EnvironmentBindings {
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    fn render(&self) -> (Value, Value) {
        let variables = Value::list(self.variables.iter().map(|(name, value)| {
            Value::map([
                ("Name", Value::from(name.as_str())),
                ("Value", value.clone()),
            ])
        }));
        let secrets = Value::list(self.secrets.iter().map(|(name, secret)| {
            Value::map([
                ("Name", Value::from(name.as_str())),
                ("ValueFrom", Value::from(secret.clone())),
            ])
        }));
        (variables, secrets)
    }
}

/// The provisioned compute tier
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeTier {
    pub cluster: ResourceHandle,
    pub log_group: ResourceHandle,
    pub task_role: ResourceHandle,
    pub task_definition: ResourceHandle,
    pub load_balancer: ResourceHandle,
    pub certificate: ResourceHandle,
    pub target_group: ResourceHandle,
    pub https_listener: ResourceHandle,
    pub http_listener: ResourceHandle,
    pub service: ResourceHandle,
    pub replicas: u32,
    pub bindings: EnvironmentBindings,
}

impl ComputeTier {
    pub fn load_balancer_dns(&self) -> Value {
        self.load_balancer.attribute("DNSName")
    }
}

/// Provisions the [`ComputeTier`]
pub struct ComputeTierProvisioner<'a> {
    config: &'a StackConfig,
    network: &'a NetworkTopology,
    groups: &'a SecurityGroups,
    data: &'a DataTier,
}

impl<'a> ComputeTierProvisioner<'a> {
    pub fn new(
        config: &'a StackConfig,
        network: &'a NetworkTopology,
        groups: &'a SecurityGroups,
        data: &'a DataTier,
    ) -> Self {
        Self {
            config,
            network,
            groups,
            data,
        }
    }

    /// Bindings computed from the provisioned data tier
    pub fn bindings(&self) -> SynthesisResult<EnvironmentBindings> {
        let config = self.config;
        let mut bindings = EnvironmentBindings::default();

        bindings.variables.insert(
            "ENVIRONMENT".to_string(),
            Value::from(config.environment.name.as_str()),
        );
        bindings
            .variables
            .insert("DB_HOST".to_string(), self.data.endpoint());
        bindings.variables.insert(
            "DB_PORT".to_string(),
            Value::from(self.data.bootstrap.port.to_string()),
        );
        bindings.variables.insert(
            "DB_NAME".to_string(),
            Value::from(self.data.bootstrap.database_name.as_str()),
        );
        bindings.variables.insert(
            "DB_TABLE".to_string(),
            Value::from(self.data.bootstrap.table_name.as_str()),
        );
        bindings
            .variables
            .insert("DB_SECRET_ARN".to_string(), self.secret_arn(""));
        bindings.variables.insert(
            "AWS_REGION".to_string(),
            Value::from(PseudoParameter::Region),
        );
        bindings
            .secrets
            .insert("DB_CREDENTIALS".to_string(), self.data.credentials.clone());

        Ok(bindings)
    }

    /// ARN of the credential secret, with an optional suffix
    fn secret_arn(&self, suffix: &str) -> Value {
        Value::join(
            "",
            vec![
                Value::from("arn:aws:secretsmanager:"),
                Value::from(PseudoParameter::Region),
                Value::from(":"),
                Value::from(PseudoParameter::AccountId),
                Value::from(format!(":secret:{}{}", self.data.credentials.name, suffix)),
            ],
        )
    }

    pub fn provision(&self, graph: &mut ResourceGraph) -> SynthesisResult<ComputeTier> {
        let config = self.config;
        let env = &config.environment;
        let service = &config.service;
        let check = &config.health_check;
        let zones = config.availability_zones().len();

        validate_replica_count("compute service", service.replicas as usize, zones)?;
        validate_health_check(
            &check.path,
            check.interval_secs,
            check.timeout_secs,
            check.healthy_threshold,
            check.unhealthy_threshold,
            "200",
        )?;
        let bindings = self.bindings()?;
        let domain = config.environment_domain()?;

        let cluster = graph.add(
            ResourceNode::new(logical_id("ContainerCluster")?, ResourceKind::ContainerCluster)
                .with("ClusterName", env.name.scoped("cluster"))
                .with(
                    "ClusterSettings",
                    Value::list([Value::map([
                        ("Name", Value::from("containerInsights")),
                        ("Value", Value::from("enabled")),
                    ])]),
                )
                .with("Tags", tags(config, "cluster")),
        )?;

        let log_group = graph.add(
            ResourceNode::new(logical_id("ServiceLogGroup")?, ResourceKind::LogGroup)
                .with("LogGroupName", format!("/{}/service", env.name))
                .with("RetentionInDays", service.log_retention_days)
                .deletion_policy(env.retention.deletion_policy()),
        )?;

        let task_role = graph.add(
            ResourceNode::new(logical_id("TaskRole")?, ResourceKind::TaskRole)
                .with("Description", format!("Role for {} service tasks", env.name))
                .with(
                    "AssumeRolePolicyDocument",
                    Value::map([
                        ("Version", Value::from("2012-10-17")),
                        (
                            "Statement",
                            Value::list([Value::map([
                                ("Effect", Value::from("Allow")),
                                (
                                    "Principal",
                                    Value::map([("Service", Value::from("ecs-tasks.amazonaws.com"))]),
                                ),
                                ("Action", Value::from("sts:AssumeRole")),
                            ])]),
                        ),
                    ]),
                )
                .with(
                    "Policies",
                    Value::list([Value::map([
                        ("PolicyName", Value::from("SecretsManagerAccess")),
                        (
                            "PolicyDocument",
                            Value::map([
                                ("Version", Value::from("2012-10-17")),
                                (
                                    "Statement",
                                    Value::list([Value::map([
                                        ("Effect", Value::from("Allow")),
                                        ("Action", Value::list([Value::from("secretsmanager:GetSecretValue")])),
                                        ("Resource", Value::list([self.secret_arn("*")])),
                                    ])]),
                                ),
                            ]),
                        ),
                    ])]),
                )
                .with("Tags", tags(config, "task-role")),
        )?;

        let (variables, secrets) = bindings.render();
        let container = Value::map([
            ("Name", Value::from(CONTAINER_NAME)),
            ("Image", Value::from(service.image.as_str())),
            ("Essential", Value::from(true)),
            (
                "PortMappings",
                Value::list([Value::map([
                    ("ContainerPort", Value::from(service.port)),
                    ("Protocol", Value::from("tcp")),
                ])]),
            ),
            ("Environment", variables),
            ("Secrets", secrets),
            (
                "LogConfiguration",
                Value::map([
                    ("LogDriver", Value::from("awslogs")),
                    (
                        "Options",
                        Value::map([
                            ("awslogs-group", log_group.reference()),
                            ("awslogs-region", Value::from(PseudoParameter::Region)),
                            ("awslogs-stream-prefix", Value::from(env.name.as_str())),
                        ]),
                    ),
                ]),
            ),
        ]);

        let task_definition_node =
            ResourceNode::new(logical_id("TaskDefinition")?, ResourceKind::TaskDefinition)
                .with("Family", env.name.scoped("service"))
                .with("Cpu", service.cpu.to_string())
                .with("Memory", service.memory_mib.to_string())
                .with("NetworkMode", "awsvpc")
                .with("RequiresCompatibilities", Value::list([Value::from("FARGATE")]))
                .with("TaskRoleArn", task_role.attribute("Arn"))
                .with("ContainerDefinitions", Value::list([container]))
                .with("Tags", tags(config, "task"));
        verify_container_secrets(&task_definition_node)?;
        let task_definition = graph.add(task_definition_node)?;

        let load_balancer = graph.add(
            ResourceNode::new(logical_id("LoadBalancer")?, ResourceKind::LoadBalancer)
                .with("Type", "application")
                .with("Scheme", "internet-facing")
                .with("Subnets", self.network.subnet_refs(SubnetTier::Public))
                .with("SecurityGroups", self.groups.group_ids(GroupRole::Edge))
                .with("Tags", tags(config, "alb"))
                .after(&self.network.internet_gateway),
        )?;

        let certificate = graph.add(
            ResourceNode::new(logical_id("Certificate")?, ResourceKind::Certificate)
                .with("DomainName", domain.as_str())
                .with("ValidationMethod", "DNS")
                .with(
                    "DomainValidationOptions",
                    Value::list([Value::map([
                        ("DomainName", Value::from(domain.as_str())),
                        ("HostedZoneId", Value::from(config.hosted_zone.id.as_str())),
                    ])]),
                )
                .with("Tags", tags(config, "certificate")),
        )?;

        let target_group = graph.add(
            ResourceNode::new(logical_id("TargetGroup")?, ResourceKind::TargetGroup)
                .with("Port", service.port)
                .with("Protocol", "HTTP")
                .with("TargetType", "ip")
                .with("VpcId", self.network.vpc.reference())
                .with("HealthCheckEnabled", true)
                .with("HealthCheckPath", check.path.as_str())
                .with("HealthCheckIntervalSeconds", check.interval_secs)
                .with("HealthCheckTimeoutSeconds", check.timeout_secs)
                .with("HealthyThresholdCount", check.healthy_threshold)
                .with("UnhealthyThresholdCount", check.unhealthy_threshold)
                .with("Matcher", Value::map([("HttpCode", Value::from("200"))]))
                .with("Tags", tags(config, "target-group")),
        )?;

        let https_listener_node =
            ResourceNode::new(logical_id("HttpsListener")?, ResourceKind::Listener)
                .with("LoadBalancerArn", load_balancer.reference())
                .with("Port", 443u16)
                .with("Protocol", "HTTPS")
                .with("SslPolicy", TLS_POLICY)
                .with(
                    "Certificates",
                    Value::list([Value::map([("CertificateArn", certificate.reference())])]),
                )
                .with(
                    "DefaultActions",
                    Value::list([Value::map([
                        ("Type", Value::from("forward")),
                        ("TargetGroupArn", target_group.reference()),
                    ])]),
                );
        verify_listener(&https_listener_node)?;
        let https_listener = graph.add(https_listener_node)?;

        let http_listener_node =
            ResourceNode::new(logical_id("HttpListener")?, ResourceKind::Listener)
                .with("LoadBalancerArn", load_balancer.reference())
                .with("Port", 80u16)
                .with("Protocol", "HTTP")
                .with(
                    "DefaultActions",
                    Value::list([Value::map([
                        ("Type", Value::from("redirect")),
                        (
                            "RedirectConfig",
                            Value::map([
                                ("Protocol", Value::from("HTTPS")),
                                ("Port", Value::from("443")),
                                ("StatusCode", Value::from("HTTP_301")),
                            ]),
                        ),
                    ])]),
                );
        verify_listener(&http_listener_node)?;
        let http_listener = graph.add(http_listener_node)?;

        // The target group must be attached to a listener before tasks register.
        let service_node = graph.add(
            ResourceNode::new(logical_id("Service")?, ResourceKind::ComputeService)
                .with("ServiceName", env.name.scoped("service"))
                .with("Cluster", cluster.reference())
                .with("TaskDefinition", task_definition.reference())
                .with("DesiredCount", service.replicas)
                .with("LaunchType", "FARGATE")
                .with("HealthCheckGracePeriodSeconds", 60u32)
                .with(
                    "NetworkConfiguration",
                    Value::map([(
                        "AwsvpcConfiguration",
                        Value::map([
                            ("AssignPublicIp", Value::from("DISABLED")),
                            ("Subnets", self.network.subnet_refs(SubnetTier::App)),
                            ("SecurityGroups", self.groups.group_ids(GroupRole::Compute)),
                        ]),
                    )]),
                )
                .with(
                    "LoadBalancers",
                    Value::list([Value::map([
                        ("ContainerName", Value::from(CONTAINER_NAME)),
                        ("ContainerPort", Value::from(service.port)),
                        ("TargetGroupArn", target_group.reference()),
                    ])]),
                )
                .with("Tags", tags(config, "service"))
                .after(&https_listener)
                .after(&http_listener),
        )?;

        info!(
            environment = %env.name,
            replicas = service.replicas,
            domain = %domain,
            "Compute tier synthesized"
        );

        Ok(ComputeTier {
            cluster,
            log_group,
            task_role,
            task_definition,
            load_balancer,
            certificate,
            target_group,
            https_listener,
            http_listener,
            service: service_node,
            replicas: service.replicas,
            bindings,
        })
    }
}

/// Check an emitted task definition: container secrets never hold literal values
fn verify_container_secrets(node: &ResourceNode) -> ValidationResult {
    let containers = node
        .property("ContainerDefinitions")
        .and_then(Value::as_list)
        .unwrap_or_default();
    for container in containers {
        let secrets = container
            .get("Secrets")
            .and_then(Value::as_list)
            .unwrap_or_default();
        for secret in secrets {
            let name = secret.get("Name").and_then(Value::as_str).unwrap_or("Secrets");
            let literal = secret.get("ValueFrom").map_or(true, Value::is_literal);
            validate_credential_reference(name, literal)?;
        }
    }
    Ok(())
}

/// Check an emitted listener: plain HTTP only ever redirects to HTTPS
fn verify_listener(node: &ResourceNode) -> ValidationResult {
    if node.property("Protocol").and_then(Value::as_str) != Some("HTTP") {
        return Ok(());
    }
    let port = node
        .property("Port")
        .and_then(Value::as_i64)
        .and_then(|port| u16::try_from(port).ok())
        .unwrap_or_default();
    let redirect = node
        .property("DefaultActions")
        .and_then(Value::as_list)
        .and_then(|actions| actions.first())
        .filter(|action| action.get("Type").and_then(Value::as_str) == Some("redirect"))
        .and_then(|action| action.get("RedirectConfig"))
        .and_then(|redirect| redirect.get("Protocol"))
        .and_then(Value::as_str);
    validate_http_redirect(port, redirect)
}
