// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Firewall Rule Ordering

use proptest::prelude::*;

use cim_stack::domain::invariants::MIN_RATE_LIMIT;
use cim_stack::tiers::{FirewallRule, FirewallRuleSet};

proptest! {
    #[test]
    fn prop_standard_rules_end_with_rate_limit(limit in MIN_RATE_LIMIT..100_000u32) {
        let rules = FirewallRuleSet::standard(limit).unwrap();
        let priorities: Vec<u32> = rules.rules().iter().map(FirewallRule::priority).collect();

        prop_assert!(priorities.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert!(rules.rules().last().unwrap().is_rate_limit());
    }

    #[test]
    fn prop_rate_limit_below_minimum_rejected(limit in 0u32..MIN_RATE_LIMIT) {
        prop_assert!(FirewallRuleSet::standard(limit).is_err());
    }

    #[test]
    fn prop_duplicate_priorities_rejected(priority in 1u32..1000) {
        let rules = vec![
            FirewallRule::managed("AWSManagedRulesCommonRuleSet", priority),
            FirewallRule::managed("AWSManagedRulesKnownBadInputsRuleSet", priority),
        ];
        prop_assert!(FirewallRuleSet::new(rules).is_err());
    }

    #[test]
    fn prop_rate_limit_must_come_last(first in 1u32..100, gap in 1u32..100) {
        let rules = vec![
            FirewallRule::RateLimit { limit: 1000, priority: first },
            FirewallRule::managed("AWSManagedRulesCommonRuleSet", first + gap),
        ];
        prop_assert!(FirewallRuleSet::new(rules).is_err());
    }
}
