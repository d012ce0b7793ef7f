// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Planning
//!
//! Compares a previously applied template with a desired one. Creates and
//! updates follow the desired template's provisioning order; deletes follow
//! the previous template's teardown order and always come last, so nothing
//! is removed while a surviving resource may still reference it.
//!
//! A retained resource keeps everything it depends on: a retained database
//! cluster also keeps its subnet group, security group, subnets and network.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

use crate::domain::{DeletionPolicy, ResourceKind};
use crate::errors::SynthesisResult;
use crate::template::{Template, TemplateOutput, TemplateResource};

/// What happens to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    /// Removed from the stack but left in place
    Retain,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Retain => write!(f, "retain"),
        }
    }
}

/// One planned change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub logical_id: String,
    pub action: ChangeAction,
    /// Desired definition for create and update, last applied otherwise
    pub resource: TemplateResource,
}

/// Ordered changes plus the outputs of the desired template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<ResourceChange>,
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn with_action(&self, action: ChangeAction) -> impl Iterator<Item = &ResourceChange> {
        self.changes.iter().filter(move |change| change.action == action)
    }

    /// Deletes of resources that hold stored data
    pub fn data_loss(&self) -> impl Iterator<Item = &ResourceChange> {
        self.with_action(ChangeAction::Delete).filter(|change| {
            ResourceKind::from_platform_type(&change.resource.resource_type)
                .is_some_and(|kind| kind.holds_data())
        })
    }

    /// Logical id and action of every change, in order
    pub fn summary(&self) -> Vec<(String, ChangeAction)> {
        self.changes
            .iter()
            .map(|change| (change.logical_id.clone(), change.action))
            .collect()
    }
}

/// Changes needed to move from `previous` to `desired`
///
/// With no previous template every resource is created.
pub fn diff(previous: Option<&Template>, desired: &Template) -> SynthesisResult<ChangeSet> {
    let mut changes = Vec::new();

    for id in desired.provisioning_order()? {
        let Some(resource) = desired.resources.get(&id) else {
            continue;
        };
        let action = match previous.and_then(|p| p.resources.get(&id)) {
            None => Some(ChangeAction::Create),
            Some(applied) if applied != resource => Some(ChangeAction::Update),
            Some(_) => None,
        };
        if let Some(action) = action {
            changes.push(ResourceChange {
                logical_id: id,
                action,
                resource: resource.clone(),
            });
        }
    }

    if let Some(previous) = previous {
        let removed: BTreeSet<String> = previous
            .resources
            .keys()
            .filter(|id| !desired.resources.contains_key(*id))
            .cloned()
            .collect();
        let retained = retained_closure(previous, &removed);

        let mut removal = previous.provisioning_order()?;
        removal.reverse();
        for id in removal {
            if !removed.contains(&id) {
                continue;
            }
            if let Some(resource) = previous.resources.get(&id) {
                let retain = retained.contains(&id);
                changes.push(removal_change(id, resource, retain));
            }
        }
    }

    let changes = ChangeSet {
        changes,
        outputs: desired.outputs.clone(),
    };
    debug!(changes = changes.len(), "Computed change set");
    warn_data_loss(&changes);
    Ok(changes)
}

/// Remove every resource of `template`, dependents first
///
/// Resources whose deletion policy is `Retain`, and everything they depend
/// on, are reported as retained.
pub fn teardown(template: &Template) -> SynthesisResult<ChangeSet> {
    let mut order = template.provisioning_order()?;
    order.reverse();

    let everything: BTreeSet<String> = template.resources.keys().cloned().collect();
    let retained = retained_closure(template, &everything);

    let changes = order
        .into_iter()
        .filter_map(|id| {
            let resource = template.resources.get(&id)?;
            let retain = retained.contains(&id);
            Some(removal_change(id, resource, retain))
        })
        .collect();

    let changes = ChangeSet {
        changes,
        outputs: BTreeMap::new(),
    };
    warn_data_loss(&changes);
    Ok(changes)
}

/// Removed resources that stay in place
///
/// Starts from the removed resources whose policy is `Retain` and follows
/// their dependencies through the rest of `removed`.
fn retained_closure(template: &Template, removed: &BTreeSet<String>) -> BTreeSet<String> {
    let mut retained = BTreeSet::new();
    let mut pending: Vec<&String> = removed
        .iter()
        .filter(|id| {
            template
                .resources
                .get(*id)
                .is_some_and(|resource| resource.deletion_policy == DeletionPolicy::Retain)
        })
        .collect();

    while let Some(id) = pending.pop() {
        if !retained.insert(id.clone()) {
            continue;
        }
        let Some(resource) = template.resources.get(id) else {
            continue;
        };
        for dependency in resource.dependencies() {
            if let Some(dependency) = removed.get(&dependency) {
                if !retained.contains(dependency) {
                    pending.push(dependency);
                }
            }
        }
    }
    retained
}

fn warn_data_loss(changes: &ChangeSet) {
    for change in changes.data_loss() {
        warn!(
            resource = %change.logical_id,
            resource_type = %change.resource.resource_type,
            "Change set deletes stored data"
        );
    }
}

fn removal_change(logical_id: String, resource: &TemplateResource, retain: bool) -> ResourceChange {
    let action = if retain {
        ChangeAction::Retain
    } else {
        ChangeAction::Delete
    };
    ResourceChange {
        logical_id,
        action,
        resource: resource.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn resource(kind: &str, properties: serde_json::Value) -> TemplateResource {
        TemplateResource {
            resource_type: kind.to_string(),
            properties: serde_json::from_value(properties).unwrap(),
            depends_on: BTreeSet::new(),
            deletion_policy: DeletionPolicy::Delete,
        }
    }

    fn template(resources: Vec<(&str, TemplateResource)>) -> Template {
        Template {
            format_version: crate::template::FORMAT_VERSION.to_string(),
            description: "test".to_string(),
            resources: resources
                .into_iter()
                .map(|(id, resource)| (id.to_string(), resource))
                .collect(),
            outputs: BTreeMap::new(),
        }
    }

    fn base() -> Template {
        template(vec![
            ("Vpc", resource("AWS::EC2::VPC", json!({"CidrBlock": "10.0.0.0/16"}))),
            (
                "Subnet",
                resource("AWS::EC2::Subnet", json!({"VpcId": {"Ref": "Vpc"}})),
            ),
        ])
    }

    #[test]
    fn test_initial_deploy_creates_in_order() {
        let changes = diff(None, &base()).unwrap();
        assert_eq!(
            changes.summary(),
            vec![
                ("Vpc".to_string(), ChangeAction::Create),
                ("Subnet".to_string(), ChangeAction::Create),
            ]
        );
    }

    #[test]
    fn test_identical_templates_have_no_changes() {
        let changes = diff(Some(&base()), &base()).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_update_and_delete() {
        let mut desired = base();
        desired.resources.remove("Subnet");
        desired
            .resources
            .get_mut("Vpc")
            .unwrap()
            .properties
            .insert("EnableDnsSupport".to_string(), json!(true));

        let changes = diff(Some(&base()), &desired).unwrap();
        assert_eq!(
            changes.summary(),
            vec![
                ("Vpc".to_string(), ChangeAction::Update),
                ("Subnet".to_string(), ChangeAction::Delete),
            ]
        );
    }

    #[test]
    fn test_teardown_reverses_order_and_retains() {
        let mut applied = base();
        applied.resources.insert(
            "Bucket".to_string(),
            TemplateResource {
                deletion_policy: DeletionPolicy::Retain,
                ..resource("AWS::S3::Bucket", json!({}))
            },
        );

        let changes = teardown(&applied).unwrap();
        assert_eq!(
            changes.summary(),
            vec![
                ("Subnet".to_string(), ChangeAction::Delete),
                ("Vpc".to_string(), ChangeAction::Delete),
                ("Bucket".to_string(), ChangeAction::Retain),
            ]
        );
        assert_eq!(changes.with_action(ChangeAction::Retain).count(), 1);
    }

    #[test]
    fn test_retained_resource_keeps_its_dependencies() {
        let mut applied = base();
        applied.resources.insert(
            "Database".to_string(),
            TemplateResource {
                deletion_policy: DeletionPolicy::Retain,
                ..resource("AWS::RDS::DBCluster", json!({"SubnetId": {"Ref": "Subnet"}}))
            },
        );
        applied.resources.insert(
            "Alarm".to_string(),
            resource("AWS::CloudWatch::Alarm", json!({"Target": {"Ref": "Database"}})),
        );

        let changes = teardown(&applied).unwrap();
        assert_eq!(
            changes.summary(),
            vec![
                ("Alarm".to_string(), ChangeAction::Delete),
                ("Database".to_string(), ChangeAction::Retain),
                ("Subnet".to_string(), ChangeAction::Retain),
                ("Vpc".to_string(), ChangeAction::Retain),
            ]
        );
        assert_eq!(changes.data_loss().count(), 0);
    }

    #[test]
    fn test_removal_keeps_dependencies_of_retained_resources() {
        let mut applied = base();
        applied.resources.insert(
            "Database".to_string(),
            TemplateResource {
                deletion_policy: DeletionPolicy::Retain,
                ..resource("AWS::RDS::DBCluster", json!({"SubnetId": {"Ref": "Subnet"}}))
            },
        );
        let mut desired = base();
        desired.resources.remove("Subnet");

        let changes = diff(Some(&applied), &desired).unwrap();
        assert_eq!(
            changes.summary(),
            vec![
                ("Database".to_string(), ChangeAction::Retain),
                ("Subnet".to_string(), ChangeAction::Retain),
            ]
        );
    }

    #[test]
    fn test_deleted_database_is_data_loss() {
        let mut applied = base();
        applied.resources.insert(
            "Database".to_string(),
            resource("AWS::RDS::DBCluster", json!({"SubnetId": {"Ref": "Subnet"}})),
        );

        let changes = teardown(&applied).unwrap();
        let lost: Vec<&str> = changes
            .data_loss()
            .map(|change| change.logical_id.as_str())
            .collect();
        assert_eq!(lost, vec!["Database"]);
    }
}
