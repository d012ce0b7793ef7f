// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed Resource Graph
//!
//! The graph is the single in-memory product of a synthesis run. Nodes are
//! keyed by logical id; edges are never declared separately but read off the
//! references stored in each node's properties, plus the explicit
//! `depends_on` set for ordering constraints that carry no value.
//!
//! # Guarantees
//!
//! - A node can only reference nodes that were added before it, so a graph
//!   built through [`ResourceGraph::add`] is acyclic by construction
//! - [`ResourceGraph::provisioning_order`] depends only on references, never
//!   on insertion order
//! - Iteration is ordered by logical id

pub mod order;
pub mod value;

pub use order::topological_order;
pub use value::{PseudoParameter, SecretRef, Value};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::domain::{DeletionPolicy, ResourceCategory, ResourceKind};

/// Resource graph error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid logical id '{0}': must be non-empty ASCII alphanumeric")]
    InvalidLogicalId(String),

    #[error("Duplicate logical id: {0}")]
    DuplicateId(String),

    #[error("Resource {from} references unknown resource {to}")]
    UnknownReference { from: String, to: String },

    #[error("Resource {from} references {to}, which has not been provisioned")]
    Unresolved { from: String, to: String },

    #[error("Dependency cycle between resources: {0:?}")]
    Cycle(Vec<String>),

    #[error("Duplicate output: {0}")]
    DuplicateOutput(String),
}

/// Stable identifier of a resource within one stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Result<Self, GraphError> {
        let id = id.into();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GraphError::InvalidLogicalId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for LogicalId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(value: LogicalId) -> Self {
        value.0
    }
}

/// Handle to a node already in the graph
///
/// Tiers pass handles to each other instead of ids, so a consumer can only
/// reference what a producer actually added.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    id: LogicalId,
    kind: ResourceKind,
}

impl ResourceHandle {
    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// `Ref` to this resource
    pub fn reference(&self) -> Value {
        Value::reference(&self.id)
    }

    /// Attribute of this resource
    pub fn attribute(&self, attribute: &str) -> Value {
        Value::attribute(&self.id, attribute)
    }
}

/// One resource in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub id: LogicalId,
    pub kind: ResourceKind,
    pub properties: BTreeMap<String, Value>,
    pub depends_on: BTreeSet<LogicalId>,
    pub deletion_policy: DeletionPolicy,
}

impl ResourceNode {
    pub fn new(id: LogicalId, kind: ResourceKind) -> Self {
        Self {
            id,
            kind,
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
            deletion_policy: DeletionPolicy::Delete,
        }
    }

    /// Set a property
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Order after a resource without referencing any of its values
    pub fn after(mut self, handle: &ResourceHandle) -> Self {
        self.depends_on.insert(handle.id.clone());
        self
    }

    pub fn deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = policy;
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Everything this node must be provisioned after
    pub fn dependencies(&self) -> BTreeSet<LogicalId> {
        self.properties
            .values()
            .flat_map(Value::references)
            .cloned()
            .chain(self.depends_on.iter().cloned())
            .collect()
    }
}

/// Exported deployment fact
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub value: Value,
    pub description: String,
    pub export_name: Option<String>,
}

/// Resource graph for one stack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    nodes: BTreeMap<LogicalId, ResourceNode>,
    outputs: BTreeMap<String, Output>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node whose references all point at existing nodes
    pub fn add(&mut self, node: ResourceNode) -> Result<ResourceHandle, GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateId(node.id.to_string()));
        }

        self.check_references(node.id.as_str(), node.dependencies().iter())?;

        let handle = ResourceHandle {
            id: node.id.clone(),
            kind: node.kind,
        };
        tracing::trace!(id = %node.id, kind = node.kind.as_str(), "Added resource");
        self.nodes.insert(node.id.clone(), node);
        Ok(handle)
    }

    /// Export a named output
    pub fn add_output(&mut self, name: &str, output: Output) -> Result<(), GraphError> {
        if self.outputs.contains_key(name) {
            return Err(GraphError::DuplicateOutput(name.to_string()));
        }
        self.check_references(name, output.value.references().into_iter())?;
        self.outputs.insert(name.to_string(), output);
        Ok(())
    }

    fn check_references<'a>(
        &self,
        from: &str,
        mut references: impl Iterator<Item = &'a LogicalId>,
    ) -> Result<(), GraphError> {
        match references.find(|target| !self.nodes.contains_key(*target)) {
            Some(missing) => Err(GraphError::UnknownReference {
                from: from.to_string(),
                to: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: &LogicalId) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    pub fn node(&self, handle: &ResourceHandle) -> Option<&ResourceNode> {
        self.nodes.get(&handle.id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    pub fn nodes_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values().filter(move |node| node.kind == kind)
    }

    /// Node count per owning tier
    pub fn count_by_category(&self) -> BTreeMap<ResourceCategory, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.kind.category()).or_insert(0) += 1;
        }
        counts
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Logical ids in dependency order
    pub fn provisioning_order(&self) -> Result<Vec<LogicalId>, GraphError> {
        let dependencies: BTreeMap<String, BTreeSet<String>> = self
            .nodes
            .values()
            .map(|node| {
                (
                    node.id.to_string(),
                    node.dependencies()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                )
            })
            .collect();

        topological_order(&dependencies)?
            .into_iter()
            .map(LogicalId::new)
            .collect()
    }

    /// Logical ids in reverse dependency order
    pub fn teardown_order(&self) -> Result<Vec<LogicalId>, GraphError> {
        let mut order = self.provisioning_order()?;
        order.reverse();
        Ok(order)
    }
}
