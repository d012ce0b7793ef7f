// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Stack Invariants
//!
//! Every structural rule a synthesized stack must satisfy lives here as a
//! pure function. The tier builders call them before adding resources, and
//! the property tests call them against whole synthesized graphs.
//!
//! # Invariant Categories
//!
//! 1. **Topology**: one subnet per tier per zone, one egress gateway per zone
//! 2. **Isolation**: the data tier has no route to the internet
//! 3. **Availability**: replica counts cover every zone
//! 4. **Protection**: storage encryption, credentials only by reference
//! 5. **Edge ordering**: firewall priorities, HTTP to HTTPS redirect
//!
//! # Design Principles
//!
//! - **Pure Functions**: No I/O, no mutations, deterministic
//! - **Explicit Errors**: Return detailed validation failures
//! - **Composable**: Small functions that combine

use std::collections::BTreeSet;

use crate::domain::{ResourceKind, RoutingMode, SubnetTier};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Availability zone count outside the supported range
    #[error("Availability zone count {count} must be between 1 and {max}")]
    ZoneCount { count: usize, max: usize },

    /// A tier has the wrong number of subnets in one zone
    #[error("Tier {tier} has {found} subnets in zone {zone}, expected exactly 1")]
    SubnetLayout {
        tier: SubnetTier,
        zone: usize,
        found: usize,
    },

    /// Egress gateways do not cover every zone exactly once
    #[error("Expected one egress gateway per zone for {zones} zones, found {found:?}")]
    EgressGateways { zones: usize, found: Vec<usize> },

    /// A tier is routed more openly than it allows
    #[error("Subnet tier {tier} must be {required:?}, found {actual:?}")]
    TierRouting {
        tier: SubnetTier,
        required: RoutingMode,
        actual: RoutingMode,
    },

    /// Fewer replicas than zones
    #[error("{resource} runs {replicas} replicas across {zones} zones; at least one per zone is required")]
    ReplicaCount {
        resource: String,
        replicas: usize,
        zones: usize,
    },

    /// Storage left unencrypted
    #[error("Storage encryption must be enabled for {0}")]
    UnencryptedStorage(String),

    /// A credential passed as a literal value
    #[error("Credential field {0} must be a secret reference, not a literal")]
    LiteralCredential(String),

    /// Firewall priorities out of order
    #[error("Firewall rule priorities must be unique and strictly increasing: {0:?}")]
    RulePriorities(Vec<u32>),

    /// Rate limit rule is not evaluated last
    #[error("Rate limit rule must have the highest priority number")]
    RateLimitNotLast,

    /// Rate limit below what the firewall accepts
    #[error("Rate limit {0} is below the minimum of {}", MIN_RATE_LIMIT)]
    RateLimit(u32),

    /// Health check settings inconsistent
    #[error("Invalid health check: {0}")]
    HealthCheck(String),

    /// Plain HTTP served without redirecting
    #[error("HTTP listener on port {0} must redirect to HTTPS")]
    InsecureListener(u16),

    /// Alias target is not a load balancer
    #[error("DNS alias must target a load balancer, not {0}")]
    AliasTarget(ResourceKind),

    /// Alarm settings inconsistent
    #[error("Invalid alarm: {0}")]
    Alarm(String),
}

/// Lowest per-client request limit the firewall accepts
pub const MIN_RATE_LIMIT: u32 = 10;

/// Validate the zone count requested for the network
pub fn validate_zone_count(zones: usize, max: usize) -> ValidationResult {
    if zones == 0 || zones > max {
        return Err(ValidationError::ZoneCount { count: zones, max });
    }
    Ok(())
}

/// Validate the subnet layout of a network
///
/// # Rules
/// - Exactly one subnet per tier per availability zone
/// - No subnets in zones past `zones`
pub fn validate_subnet_layout(zones: usize, subnets: &[(SubnetTier, usize)]) -> ValidationResult {
    for tier in SubnetTier::ALL {
        for zone in 0..zones {
            let found = subnets
                .iter()
                .filter(|(t, z)| *t == tier && *z == zone)
                .count();
            if found != 1 {
                return Err(ValidationError::SubnetLayout { tier, zone, found });
            }
        }
    }

    if let Some((tier, zone)) = subnets.iter().find(|(_, zone)| *zone >= zones) {
        return Err(ValidationError::SubnetLayout {
            tier: *tier,
            zone: *zone,
            found: 1,
        });
    }

    Ok(())
}

/// Validate egress gateway placement
///
/// # Rules
/// - One gateway per zone, never one shared gateway
pub fn validate_egress_gateways(zones: usize, gateway_zones: &[usize]) -> ValidationResult {
    let distinct: BTreeSet<usize> = gateway_zones.iter().copied().collect();
    let expected: BTreeSet<usize> = (0..zones).collect();

    if gateway_zones.len() != zones || distinct != expected {
        let mut found = gateway_zones.to_vec();
        found.sort_unstable();
        return Err(ValidationError::EgressGateways { zones, found });
    }
    Ok(())
}

/// Validate a subnet's routing against its tier
///
/// # Rules
/// - Data subnets are always isolated
/// - App subnets never route directly to the internet
pub fn validate_tier_routing(tier: SubnetTier, actual: RoutingMode) -> ValidationResult {
    let required = tier.routing_mode();
    let too_open = match tier {
        SubnetTier::Public => false,
        SubnetTier::App => actual.reaches_internet_directly(),
        SubnetTier::Data => actual != RoutingMode::Isolated,
    };

    if too_open {
        return Err(ValidationError::TierRouting {
            tier,
            required,
            actual,
        });
    }
    Ok(())
}

/// Validate that a replicated resource covers every zone
pub fn validate_replica_count(resource: &str, replicas: usize, zones: usize) -> ValidationResult {
    if replicas < zones {
        return Err(ValidationError::ReplicaCount {
            resource: resource.to_string(),
            replicas,
            zones,
        });
    }
    Ok(())
}

/// Validate storage encryption for a stateful resource
pub fn validate_storage_encryption(resource: &str, encrypted: bool) -> ValidationResult {
    if !encrypted {
        return Err(ValidationError::UnencryptedStorage(resource.to_string()));
    }
    Ok(())
}

/// Validate that a credential field is bound by reference
pub fn validate_credential_reference(field: &str, is_literal: bool) -> ValidationResult {
    if is_literal {
        return Err(ValidationError::LiteralCredential(field.to_string()));
    }
    Ok(())
}

/// Validate firewall rule ordering
///
/// # Rules
/// - Priorities are unique and strictly increasing in list order
/// - The rate limit rule, if present, has the highest priority number
///
/// `rules` is `(priority, is_rate_limit)` in evaluation order.
pub fn validate_rule_priorities(rules: &[(u32, bool)]) -> ValidationResult {
    let priorities: Vec<u32> = rules.iter().map(|(priority, _)| *priority).collect();

    if priorities.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ValidationError::RulePriorities(priorities));
    }

    if let Some(position) = rules.iter().position(|(_, rate_limit)| *rate_limit) {
        if position != rules.len() - 1 {
            return Err(ValidationError::RateLimitNotLast);
        }
    }

    Ok(())
}

/// Validate the per-client request limit
pub fn validate_rate_limit(limit: u32) -> ValidationResult {
    if limit < MIN_RATE_LIMIT {
        return Err(ValidationError::RateLimit(limit));
    }
    Ok(())
}

/// Validate load balancer health check settings
///
/// # Rules
/// - Path is absolute
/// - Timeout is shorter than the interval
/// - Thresholds are at least 2 (one flapping probe never changes rotation)
/// - Only `200` counts as healthy
pub fn validate_health_check(
    path: &str,
    interval_secs: u32,
    timeout_secs: u32,
    healthy_threshold: u32,
    unhealthy_threshold: u32,
    success_codes: &str,
) -> ValidationResult {
    if !path.starts_with('/') {
        return Err(ValidationError::HealthCheck(format!(
            "path '{path}' must start with '/'"
        )));
    }

    if timeout_secs == 0 || timeout_secs >= interval_secs {
        return Err(ValidationError::HealthCheck(format!(
            "timeout {timeout_secs}s must be positive and shorter than interval {interval_secs}s"
        )));
    }

    if healthy_threshold < 2 || unhealthy_threshold < 2 {
        return Err(ValidationError::HealthCheck(format!(
            "thresholds must be at least 2 (healthy {healthy_threshold}, unhealthy {unhealthy_threshold})"
        )));
    }

    if success_codes != "200" {
        return Err(ValidationError::HealthCheck(format!(
            "success codes must be exactly 200, found '{success_codes}'"
        )));
    }

    Ok(())
}

/// Validate that a plain HTTP listener redirects to HTTPS
pub fn validate_http_redirect(port: u16, redirect_protocol: Option<&str>) -> ValidationResult {
    match redirect_protocol {
        Some(protocol) if protocol.eq_ignore_ascii_case("HTTPS") => Ok(()),
        _ => Err(ValidationError::InsecureListener(port)),
    }
}

/// Validate the target of a DNS alias
pub fn validate_alias_target(kind: ResourceKind) -> ValidationResult {
    if kind != ResourceKind::LoadBalancer {
        return Err(ValidationError::AliasTarget(kind));
    }
    Ok(())
}

/// Validate alarm threshold settings
pub fn validate_alarm(threshold: f64, evaluation_periods: u32, period_secs: u32) -> ValidationResult {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ValidationError::Alarm(format!(
            "threshold {threshold} must be a positive number"
        )));
    }

    if evaluation_periods == 0 || period_secs == 0 {
        return Err(ValidationError::Alarm(
            "evaluation window must be non-empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_layout(zones: usize) -> Vec<(SubnetTier, usize)> {
        SubnetTier::ALL
            .iter()
            .flat_map(|tier| (0..zones).map(move |zone| (*tier, zone)))
            .collect()
    }

    #[test]
    fn test_validate_subnet_layout_valid() {
        assert!(validate_subnet_layout(3, &full_layout(3)).is_ok());
    }

    #[test]
    fn test_validate_subnet_layout_missing_and_duplicate() {
        let mut layout = full_layout(3);
        layout.retain(|(tier, zone)| !(*tier == SubnetTier::Data && *zone == 2));
        assert!(matches!(
            validate_subnet_layout(3, &layout),
            Err(ValidationError::SubnetLayout {
                tier: SubnetTier::Data,
                zone: 2,
                found: 0
            })
        ));

        let mut layout = full_layout(3);
        layout.push((SubnetTier::App, 0));
        assert!(validate_subnet_layout(3, &layout).is_err());

        let mut layout = full_layout(3);
        layout.push((SubnetTier::App, 3));
        assert!(validate_subnet_layout(3, &layout).is_err());
    }

    #[test]
    fn test_validate_egress_gateways() {
        assert!(validate_egress_gateways(3, &[0, 1, 2]).is_ok());
        assert!(validate_egress_gateways(3, &[0]).is_err());
        assert!(validate_egress_gateways(3, &[0, 0, 1]).is_err());
    }

    #[test]
    fn test_validate_tier_routing() {
        assert!(validate_tier_routing(SubnetTier::Data, RoutingMode::Isolated).is_ok());
        assert!(validate_tier_routing(SubnetTier::Data, RoutingMode::EgressOnly).is_err());
        assert!(validate_tier_routing(SubnetTier::Data, RoutingMode::Public).is_err());
        assert!(validate_tier_routing(SubnetTier::App, RoutingMode::Public).is_err());
        assert!(validate_tier_routing(SubnetTier::App, RoutingMode::EgressOnly).is_ok());
    }

    #[test]
    fn test_validate_replica_count() {
        assert!(validate_replica_count("service", 3, 3).is_ok());
        assert!(validate_replica_count("service", 4, 3).is_ok());
        assert!(validate_replica_count("service", 2, 3).is_err());
    }

    #[test]
    fn test_validate_rule_priorities() {
        assert!(validate_rule_priorities(&[(1, false), (2, false), (3, true)]).is_ok());
        assert!(validate_rule_priorities(&[(1, false), (1, false)]).is_err());
        assert!(validate_rule_priorities(&[(2, false), (1, false)]).is_err());
        assert_eq!(
            validate_rule_priorities(&[(1, true), (2, false)]),
            Err(ValidationError::RateLimitNotLast)
        );
        assert!(validate_rule_priorities(&[]).is_ok());
    }

    #[test]
    fn test_validate_health_check() {
        assert!(validate_health_check("/ping", 30, 5, 2, 3, "200").is_ok());
        assert!(validate_health_check("ping", 30, 5, 2, 3, "200").is_err());
        assert!(validate_health_check("/ping", 5, 5, 2, 3, "200").is_err());
        assert!(validate_health_check("/ping", 30, 5, 1, 3, "200").is_err());
        assert!(validate_health_check("/ping", 30, 5, 2, 3, "200-299").is_err());
    }

    #[test]
    fn test_validate_http_redirect() {
        assert!(validate_http_redirect(80, Some("HTTPS")).is_ok());
        assert_eq!(
            validate_http_redirect(80, None),
            Err(ValidationError::InsecureListener(80))
        );
    }

    #[test]
    fn test_protection_rules() {
        assert!(validate_storage_encryption("db", true).is_ok());
        assert!(validate_storage_encryption("db", false).is_err());
        assert!(validate_credential_reference("MasterUserPassword", false).is_ok());
        assert!(validate_credential_reference("MasterUserPassword", true).is_err());
    }

    #[test]
    fn test_validate_alias_and_alarm() {
        assert!(validate_alias_target(ResourceKind::LoadBalancer).is_ok());
        assert!(validate_alias_target(ResourceKind::Bucket).is_err());
        assert!(validate_alarm(80.0, 3, 60).is_ok());
        assert!(validate_alarm(0.0, 3, 60).is_err());
        assert!(validate_alarm(80.0, 0, 60).is_err());
        assert!(validate_rate_limit(1000).is_ok());
        assert!(validate_rate_limit(5).is_err());
        assert!(validate_zone_count(3, 6).is_ok());
        assert!(validate_zone_count(0, 6).is_err());
    }
}
