// Copyright (c) 2025 - Cowboy AI, Inc.
//! Edge Security Layer
//!
//! A regional web firewall attached to the load balancer and the public DNS
//! alias for the environment. Managed rule groups come first, the per-client
//! rate limit is always the last rule evaluated.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::logical_id;
use crate::config::StackConfig;
use crate::domain::invariants::{validate_alias_target, validate_rate_limit, validate_rule_priorities};
use crate::domain::{DomainName, ResourceKind};
use crate::errors::SynthesisResult;
use crate::graph::{ResourceGraph, ResourceHandle, ResourceNode, Value};
use crate::tiers::compute::ComputeTier;

/// One firewall rule, evaluated in ascending priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FirewallRule {
    /// Vendor maintained rule group, evaluated without override
    ManagedRuleGroup {
        name: String,
        vendor: String,
        priority: u32,
    },
    /// Blocks a client address above `limit` requests per five minutes
    RateLimit { limit: u32, priority: u32 },
}

impl FirewallRule {
    pub fn managed(name: &str, priority: u32) -> Self {
        Self::ManagedRuleGroup {
            name: name.to_string(),
            vendor: "AWS".to_string(),
            priority,
        }
    }

    pub fn priority(&self) -> u32 {
        match self {
            Self::ManagedRuleGroup { priority, .. } | Self::RateLimit { priority, .. } => *priority,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// Rule and metric name
    pub fn name(&self) -> String {
        match self {
            Self::ManagedRuleGroup { name, .. } => name.clone(),
            Self::RateLimit { .. } => "RateLimitRule".to_string(),
        }
    }

    fn render(&self, metric_prefix: &str) -> Value {
        let name = self.name();
        let visibility = Value::map([
            ("SampledRequestsEnabled", Value::from(true)),
            ("CloudWatchMetricsEnabled", Value::from(true)),
            ("MetricName", Value::from(format!("{metric_prefix}-{name}"))),
        ]);

        match self {
            Self::ManagedRuleGroup {
                name,
                vendor,
                priority,
            } => Value::map([
                ("Name", Value::from(name.as_str())),
                ("Priority", Value::from(*priority)),
                ("OverrideAction", Value::map([("None", Value::map::<&str>([]))])),
                (
                    "Statement",
                    Value::map([(
                        "ManagedRuleGroupStatement",
                        Value::map([
                            ("VendorName", Value::from(vendor.as_str())),
                            ("Name", Value::from(name.as_str())),
                        ]),
                    )]),
                ),
                ("VisibilityConfig", visibility),
            ]),
            Self::RateLimit { limit, priority } => Value::map([
                ("Name", Value::from(name)),
                ("Priority", Value::from(*priority)),
                ("Action", Value::map([("Block", Value::map::<&str>([]))])),
                (
                    "Statement",
                    Value::map([(
                        "RateBasedStatement",
                        Value::map([
                            ("Limit", Value::from(*limit)),
                            ("AggregateKeyType", Value::from("IP")),
                        ]),
                    )]),
                ),
                ("VisibilityConfig", visibility),
            ]),
        }
    }
}

/// Ordered firewall rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRuleSet {
    rules: Vec<FirewallRule>,
}

impl FirewallRuleSet {
    /// Validate priorities and the rate limit
    pub fn new(rules: Vec<FirewallRule>) -> SynthesisResult<Self> {
        let ordering: Vec<(u32, bool)> = rules
            .iter()
            .map(|rule| (rule.priority(), rule.is_rate_limit()))
            .collect();
        validate_rule_priorities(&ordering)?;

        for rule in &rules {
            if let FirewallRule::RateLimit { limit, .. } = rule {
                validate_rate_limit(*limit)?;
            }
        }

        Ok(Self { rules })
    }

    /// Common rule set, known bad inputs, then the rate limit
    pub fn standard(rate_limit: u32) -> SynthesisResult<Self> {
        Self::new(vec![
            FirewallRule::managed("AWSManagedRulesCommonRuleSet", 1),
            FirewallRule::managed("AWSManagedRulesKnownBadInputsRuleSet", 2),
            FirewallRule::RateLimit {
                limit: rate_limit,
                priority: 3,
            },
        ])
    }

    pub fn rules(&self) -> &[FirewallRule] {
        &self.rules
    }
}

/// The provisioned edge tier
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTier {
    pub web_acl: ResourceHandle,
    pub association: ResourceHandle,
    pub alias_record: ResourceHandle,
    pub domain: DomainName,
    pub rules: FirewallRuleSet,
}

/// Builds the [`EdgeTier`] in front of a compute tier
pub struct EdgeSecurityLayer<'a> {
    config: &'a StackConfig,
    compute: &'a ComputeTier,
}

impl<'a> EdgeSecurityLayer<'a> {
    pub fn new(config: &'a StackConfig, compute: &'a ComputeTier) -> Self {
        Self { config, compute }
    }

    pub fn build(&self, graph: &mut ResourceGraph) -> SynthesisResult<EdgeTier> {
        let config = self.config;
        let env = &config.environment.name;
        let load_balancer = &self.compute.load_balancer;

        let rules = FirewallRuleSet::standard(config.firewall.rate_limit)?;
        let metric_prefix = env.scoped("web-acl");

        let web_acl = graph.add(
            ResourceNode::new(logical_id("WebAcl")?, ResourceKind::WebAcl)
                .with("Name", env.scoped("web-acl"))
                .with("Scope", "REGIONAL")
                .with("DefaultAction", Value::map([("Allow", Value::map::<&str>([]))]))
                .with(
                    "Rules",
                    Value::list(rules.rules().iter().map(|rule| rule.render(&metric_prefix))),
                )
                .with(
                    "VisibilityConfig",
                    Value::map([
                        ("SampledRequestsEnabled", Value::from(true)),
                        ("CloudWatchMetricsEnabled", Value::from(true)),
                        ("MetricName", Value::from(env.scoped("web-acl-metrics"))),
                    ]),
                ),
        )?;

        let association = graph.add(
            ResourceNode::new(logical_id("WebAclAssociation")?, ResourceKind::WebAclAssociation)
                .with("ResourceArn", load_balancer.reference())
                .with("WebACLArn", web_acl.attribute("Arn")),
        )?;

        validate_alias_target(load_balancer.kind())?;
        let domain = config.environment_domain()?;
        let alias_record = graph.add(
            ResourceNode::new(logical_id("AliasRecord")?, ResourceKind::DnsRecord)
                .with("HostedZoneId", config.hosted_zone.id.as_str())
                .with("Name", format!("{}.", domain))
                .with("Type", "A")
                .with(
                    "AliasTarget",
                    Value::map([
                        ("DNSName", load_balancer.attribute("DNSName")),
                        (
                            "HostedZoneId",
                            load_balancer.attribute("CanonicalHostedZoneID"),
                        ),
                        ("EvaluateTargetHealth", Value::from(true)),
                    ]),
                ),
        )?;

        info!(
            environment = %env,
            domain = %domain,
            rules = rules.rules().len(),
            "Edge security layer synthesized"
        );

        Ok(EdgeTier {
            web_acl,
            association,
            alias_record,
            domain,
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SynthesisError;

    #[test]
    fn test_standard_rules_end_with_rate_limit() {
        let rules = FirewallRuleSet::standard(1000).unwrap();
        let priorities: Vec<u32> = rules.rules().iter().map(FirewallRule::priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert!(rules.rules().last().unwrap().is_rate_limit());
    }

    #[test]
    fn test_rate_limit_must_be_last() {
        let result = FirewallRuleSet::new(vec![
            FirewallRule::RateLimit {
                limit: 1000,
                priority: 1,
            },
            FirewallRule::managed("AWSManagedRulesCommonRuleSet", 2),
        ]);
        assert!(matches!(result, Err(SynthesisError::Validation(_))));
    }

    #[test]
    fn test_duplicate_priorities_rejected() {
        let result = FirewallRuleSet::new(vec![
            FirewallRule::managed("AWSManagedRulesCommonRuleSet", 1),
            FirewallRule::managed("AWSManagedRulesKnownBadInputsRuleSet", 1),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rate_limit_floor() {
        assert!(FirewallRuleSet::standard(5).is_err());
        assert!(FirewallRuleSet::standard(10).is_ok());
    }

    #[test]
    fn test_rule_rendering() {
        let rendered = FirewallRule::RateLimit {
            limit: 1000,
            priority: 3,
        }
        .render("dev-web-acl");
        let statement = rendered
            .get("Statement")
            .and_then(|s| s.get("RateBasedStatement"))
            .unwrap();
        assert_eq!(statement.get("AggregateKeyType"), Some(&Value::from("IP")));
        assert_eq!(statement.get("Limit"), Some(&Value::Number(1000)));
        assert!(rendered.get("Action").and_then(|a| a.get("Block")).is_some());
    }
}
