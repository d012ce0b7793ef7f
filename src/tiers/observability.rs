// Copyright (c) 2025 - Cowboy AI, Inc.
//! Observability Layer
//!
//! A CPU utilization alarm on the compute service that notifies a topic, and
//! the log archive bucket. Alarms only raise signals; nothing here scales or
//! remediates.

use tracing::info;

use super::{logical_id, tags};
use crate::config::StackConfig;
use crate::domain::invariants::validate_alarm;
use crate::domain::{DeletionPolicy, ResourceKind};
use crate::errors::SynthesisResult;
use crate::graph::{ResourceGraph, ResourceHandle, ResourceNode, Value};
use crate::tiers::compute::ComputeTier;

/// The provisioned observability tier
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityTier {
    pub alarm_topic: ResourceHandle,
    pub cpu_alarm: ResourceHandle,
    pub log_bucket: ResourceHandle,
}

/// Builds the [`ObservabilityTier`] for a compute tier
pub struct ObservabilityLayer<'a> {
    config: &'a StackConfig,
    compute: &'a ComputeTier,
}

impl<'a> ObservabilityLayer<'a> {
    pub fn new(config: &'a StackConfig, compute: &'a ComputeTier) -> Self {
        Self { config, compute }
    }

    pub fn build(&self, graph: &mut ResourceGraph) -> SynthesisResult<ObservabilityTier> {
        let config = self.config;
        let env = &config.environment.name;
        let alarm = &config.alarm;

        validate_alarm(alarm.cpu_threshold, alarm.evaluation_periods, alarm.period_secs)?;

        let alarm_topic = graph.add(
            ResourceNode::new(logical_id("AlarmTopic")?, ResourceKind::NotificationTopic)
                .with("TopicName", env.scoped("alarms"))
                .with("DisplayName", format!("{env} Alarm Topic"))
                .with("Tags", tags(config, "alarm-topic")),
        )?;

        let cpu_alarm = graph.add(
            ResourceNode::new(logical_id("CpuAlarm")?, ResourceKind::Alarm)
                .with("AlarmName", env.scoped("service-cpu-high"))
                .with(
                    "AlarmDescription",
                    format!(
                        "CPU utilization of the {env} service above {}%",
                        alarm.cpu_threshold
                    ),
                )
                .with("Namespace", "AWS/ECS")
                .with("MetricName", "CPUUtilization")
                .with("Statistic", "Average")
                .with(
                    "Dimensions",
                    Value::list([
                        Value::map([
                            ("Name", Value::from("ClusterName")),
                            ("Value", self.compute.cluster.reference()),
                        ]),
                        Value::map([
                            ("Name", Value::from("ServiceName")),
                            ("Value", self.compute.service.attribute("Name")),
                        ]),
                    ]),
                )
                .with("ComparisonOperator", "GreaterThanThreshold")
                .with("Threshold", alarm.cpu_threshold)
                .with("EvaluationPeriods", alarm.evaluation_periods)
                .with("Period", alarm.period_secs)
                .with("TreatMissingData", "notBreaching")
                .with("AlarmActions", Value::list([alarm_topic.reference()]))
                .with("OKActions", Value::list([alarm_topic.reference()])),
        )?;

        // Archived logs outlive every environment.
        let log_bucket = graph.add(
            ResourceNode::new(logical_id("LogBucket")?, ResourceKind::Bucket)
                .with(
                    "BucketEncryption",
                    Value::map([(
                        "ServerSideEncryptionConfiguration",
                        Value::list([Value::map([(
                            "ServerSideEncryptionByDefault",
                            Value::map([("SSEAlgorithm", Value::from("AES256"))]),
                        )])]),
                    )]),
                )
                .with(
                    "VersioningConfiguration",
                    Value::map([("Status", Value::from("Enabled"))]),
                )
                .with(
                    "PublicAccessBlockConfiguration",
                    Value::map([
                        ("BlockPublicAcls", Value::from(true)),
                        ("BlockPublicPolicy", Value::from(true)),
                        ("IgnorePublicAcls", Value::from(true)),
                        ("RestrictPublicBuckets", Value::from(true)),
                    ]),
                )
                .with("EnforceSsl", true)
                .with("Tags", tags(config, "logs"))
                .deletion_policy(DeletionPolicy::Retain),
        )?;

        info!(
            environment = %env,
            threshold = alarm.cpu_threshold,
            periods = alarm.evaluation_periods,
            "Observability layer synthesized"
        );

        Ok(ObservabilityTier {
            alarm_topic,
            cpu_alarm,
            log_bucket,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentParameters;
    use crate::tiers::{
        ComputeTierProvisioner, DataTierProvisioner, NetworkTopologyBuilder, SecurityPolicyGraph,
    };

    fn build(config: &StackConfig) -> SynthesisResult<(ResourceGraph, ComputeTier, ObservabilityTier)> {
        let mut graph = ResourceGraph::new();
        let network = NetworkTopologyBuilder::new(config).build(&mut graph)?;
        let groups = SecurityPolicyGraph::standard(config)?
            .seal()
            .materialize(config, &network, &mut graph)?;
        let data = DataTierProvisioner::new(config, &network, &groups).provision(&mut graph)?;
        let compute =
            ComputeTierProvisioner::new(config, &network, &groups, &data).provision(&mut graph)?;
        let observability = ObservabilityLayer::new(config, &compute).build(&mut graph)?;
        Ok((graph, compute, observability))
    }

    fn config() -> StackConfig {
        let params = DeploymentParameters {
            env_name: Some("staging".to_string()),
            hosted_zone_id: Some("Z0123456789ABC".to_string()),
            hosted_zone_name: Some("example.com".to_string()),
            data_retention: Some("destroy".to_string()),
            ..Default::default()
        };
        StackConfig::from_parameters(&params).unwrap().0
    }

    #[test]
    fn test_alarm_routes_to_topic() {
        let (graph, compute, observability) = build(&config()).unwrap();
        let alarm = graph.node(&observability.cpu_alarm).unwrap();

        assert_eq!(
            alarm.property("AlarmActions"),
            Some(&Value::list([observability.alarm_topic.reference()]))
        );
        assert!(alarm.dependencies().contains(compute.service.id()));
        assert_eq!(alarm.property("EvaluationPeriods"), Some(&Value::Number(3)));
    }

    #[test]
    fn test_log_bucket_always_retained() {
        let (graph, _, observability) = build(&config()).unwrap();
        let bucket = graph.node(&observability.log_bucket).unwrap();
        assert_eq!(bucket.deletion_policy, DeletionPolicy::Retain);
        assert_eq!(bucket.property("EnforceSsl"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_invalid_alarm_rejected() {
        let mut config = config();
        config.alarm.evaluation_periods = 0;
        assert!(build(&config).is_err());
    }
}
