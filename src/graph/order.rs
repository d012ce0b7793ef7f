// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deterministic Topological Ordering
//!
//! Kahn's algorithm over an adjacency map of `node -> dependencies`. Ready
//! nodes are kept in a `BTreeSet`, so ties always break by name and the
//! same graph always yields the same order regardless of insertion order.

use std::collections::{BTreeMap, BTreeSet};

use super::GraphError;

/// Order nodes so every node comes after all of its dependencies
///
/// Dependencies that are not themselves keys of `dependencies` are ignored;
/// callers check dangling references before ordering.
pub fn topological_order(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>, GraphError> {
    let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (node, deps) in dependencies {
        let known: Vec<&str> = deps
            .iter()
            .map(String::as_str)
            .filter(|dep| dependencies.contains_key(*dep))
            .collect();
        remaining.insert(node.as_str(), known.len());
        for dep in known {
            dependents.entry(dep).or_default().push(node.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut order = Vec::with_capacity(dependencies.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        for &dependent in dependents.get(node).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() != dependencies.len() {
        let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let cycle = dependencies
            .keys()
            .filter(|node| !placed.contains(node.as_str()))
            .cloned()
            .collect();
        return Err(GraphError::Cycle(cycle));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        edges
            .iter()
            .map(|(node, deps)| {
                (
                    node.to_string(),
                    deps.iter().map(|dep| dep.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let deps = graph(&[
            ("Service", &["Cluster", "Database"]),
            ("Database", &["Vpc"]),
            ("Cluster", &[]),
            ("Vpc", &[]),
        ]);
        let order = topological_order(&deps).unwrap();
        assert_eq!(order, vec!["Cluster", "Vpc", "Database", "Service"]);
    }

    #[test]
    fn test_ties_break_by_name() {
        let deps = graph(&[("B", &[]), ("A", &[]), ("C", &[])]);
        assert_eq!(topological_order(&deps).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let deps = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        assert_eq!(
            topological_order(&deps),
            Err(GraphError::Cycle(vec!["A".to_string(), "B".to_string()]))
        );
    }

    #[test]
    fn test_external_dependencies_are_ignored() {
        let deps = graph(&[("A", &["AWS::Region"])]);
        assert_eq!(topological_order(&deps).unwrap(), vec!["A"]);
    }
}
