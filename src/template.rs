// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Template
//!
//! The serialized form of a [`ResourceGraph`]: what the provisioning engine
//! consumes and what the planner diffs. Maps are key-sorted throughout, so
//! the same graph always renders to the same bytes.
//!
//! Cross-references use the platform's intrinsic functions:
//!
//! ```text
//! {"Ref": "Vpc"}                                  primary identifier
//! {"Fn::GetAtt": ["DatabaseCluster", "Endpoint.Address"]}
//! {"Ref": "AWS::Region"}                          pseudo parameter
//! {"Fn::Join": ["", [...]]}                       concatenation
//! {"Fn::Secret": ["dev-aurora-credentials", "password"]}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::DeletionPolicy;
use crate::errors::SynthesisResult;
use crate::graph::{topological_order, GraphError, ResourceGraph};

/// Template format version understood by the engine
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Rendered deployment template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

/// One resource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties", default)]
    pub properties: BTreeMap<String, serde_json::Value>,

    #[serde(rename = "DependsOn", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,

    #[serde(rename = "DeletionPolicy", default)]
    pub deletion_policy: DeletionPolicy,
}

impl TemplateResource {
    /// Logical ids this resource must be provisioned after
    ///
    /// Read from `Ref` and `Fn::GetAtt` anywhere in the properties plus the
    /// explicit `DependsOn`. Pseudo parameters are not resources.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut found = self.depends_on.clone();
        for value in self.properties.values() {
            collect_references(value, &mut found);
        }
        found
    }
}

/// Exported value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    #[serde(rename = "Value")]
    pub value: serde_json::Value,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    #[serde(rename = "Name")]
    pub name: String,
}

impl Template {
    pub fn from_graph(graph: &ResourceGraph, description: impl Into<String>) -> Self {
        let resources = graph
            .nodes()
            .map(|node| {
                let resource = TemplateResource {
                    resource_type: node.kind.platform_type().to_string(),
                    properties: node
                        .properties
                        .iter()
                        .map(|(key, value)| (key.clone(), value.to_template()))
                        .collect(),
                    depends_on: node.depends_on.iter().map(|id| id.to_string()).collect(),
                    deletion_policy: node.deletion_policy,
                };
                (node.id.to_string(), resource)
            })
            .collect();

        let outputs = graph
            .outputs()
            .iter()
            .map(|(name, output)| {
                let rendered = TemplateOutput {
                    value: output.value.to_template(),
                    description: output.description.clone(),
                    export: output.export_name.clone().map(|name| Export { name }),
                };
                (name.clone(), rendered)
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: description.into(),
            resources,
            outputs,
        }
    }

    pub fn to_json_pretty(&self) -> SynthesisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> SynthesisResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Dependencies of every resource, keyed by logical id
    pub fn dependencies(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.resources
            .iter()
            .map(|(id, resource)| (id.clone(), resource.dependencies()))
            .collect()
    }

    /// Logical ids in dependency order
    pub fn provisioning_order(&self) -> Result<Vec<String>, GraphError> {
        let dependencies = self.dependencies();
        for (id, deps) in &dependencies {
            if let Some(missing) = deps.iter().find(|dep| !dependencies.contains_key(*dep)) {
                return Err(GraphError::UnknownReference {
                    from: id.clone(),
                    to: missing.clone(),
                });
            }
        }
        topological_order(&dependencies)
    }
}

fn collect_references(value: &serde_json::Value, found: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(target)) = map.get("Ref") {
                if map.len() == 1 && !target.starts_with("AWS::") {
                    found.insert(target.clone());
                    return;
                }
            }
            if let Some(serde_json::Value::Array(args)) = map.get("Fn::GetAtt") {
                if let (1, Some(serde_json::Value::String(target))) = (map.len(), args.first()) {
                    found.insert(target.clone());
                    return;
                }
            }
            map.values().for_each(|nested| collect_references(nested, found));
        }
        serde_json::Value::Array(items) => {
            items.iter().for_each(|item| collect_references(item, found));
        }
        _ => {}
    }
}
