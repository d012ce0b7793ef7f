// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Engine Boundary
//!
//! The core never talks to the platform. A [`ProvisioningEngine`] creates,
//! updates and deletes one resource at a time; the [`Deployer`] walks a
//! [`ChangeSet`] in order, resolves intrinsic references against what has
//! already been provisioned, and tracks every resource through the
//! provisioning lifecycle.
//!
//! Secret references are passed through unresolved: reading secret values is
//! the engine's job, never the core's.
//!
//! The first engine failure stops the run. Its message reaches the caller
//! unchanged inside [`SynthesisError::Engine`].

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::ResourceKind;
use crate::errors::{SynthesisError, SynthesisResult};
use crate::events::{EventPublisher, ProvisioningEvent};
use crate::graph::{GraphError, PseudoParameter};
use crate::plan::{ChangeAction, ChangeSet, ResourceChange};
use crate::state_machine::{LifecycleCommand, ProvisioningStatus, StateMachineWithHistory};
use crate::template::TemplateOutput;

/// Attributes the engine reports for a provisioned resource
///
/// The `Ref` key holds the primary (physical) identifier.
pub type ResourceAttributes = BTreeMap<String, String>;

/// Attribute key of the primary identifier
pub const PRIMARY_ID: &str = "Ref";

/// Failure reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One resource handed to the engine, with references resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub logical_id: String,
    pub kind: ResourceKind,
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Primary identifier of the existing resource, for update and delete
    pub physical_id: Option<String>,
}

impl ResourceRequest {
    pub fn platform_type(&self) -> &'static str {
        self.kind.platform_type()
    }
}

#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    async fn create(&self, request: &ResourceRequest) -> Result<ResourceAttributes, EngineError>;

    async fn update(&self, request: &ResourceRequest) -> Result<ResourceAttributes, EngineError>;

    async fn delete(&self, request: &ResourceRequest) -> Result<(), EngineError>;
}

/// Values of the platform pseudo parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformContext {
    pub region: String,
    pub account_id: String,
}

impl PlatformContext {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
        }
    }

    fn pseudo(&self, parameter: PseudoParameter) -> &str {
        match parameter {
            PseudoParameter::Region => &self.region,
            PseudoParameter::AccountId => &self.account_id,
        }
    }
}

/// What the deployer knows about one resource
#[derive(Debug, Clone)]
pub struct DeployedResource {
    pub kind: ResourceKind,
    pub attributes: ResourceAttributes,
    pub lifecycle: StateMachineWithHistory<ProvisioningStatus>,
}

impl DeployedResource {
    fn new(kind: ResourceKind, status: ProvisioningStatus) -> Self {
        Self {
            kind,
            attributes: ResourceAttributes::new(),
            lifecycle: StateMachineWithHistory::new(status),
        }
    }

    pub fn status(&self) -> &ProvisioningStatus {
        self.lifecycle.current_state()
    }

    pub fn physical_id(&self) -> Option<&str> {
        self.attributes.get(PRIMARY_ID).map(String::as_str)
    }
}

/// Every resource the deployer has seen, keyed by logical id
#[derive(Debug, Clone, Default)]
pub struct DeploymentState {
    resources: BTreeMap<String, DeployedResource>,
}

impl DeploymentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resource that already exists on the platform
    pub fn record_existing(
        &mut self,
        logical_id: impl Into<String>,
        kind: ResourceKind,
        attributes: ResourceAttributes,
    ) {
        let mut resource = DeployedResource::new(kind, ProvisioningStatus::Available);
        resource.attributes = attributes;
        self.resources.insert(logical_id.into(), resource);
    }

    pub fn get(&self, logical_id: &str) -> Option<&DeployedResource> {
        self.resources.get(logical_id)
    }

    pub fn status(&self, logical_id: &str) -> Option<&ProvisioningStatus> {
        self.get(logical_id).map(DeployedResource::status)
    }

    pub fn attribute(&self, logical_id: &str, attribute: &str) -> Option<&str> {
        self.get(logical_id)
            .and_then(|resource| resource.attributes.get(attribute))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeployedResource)> {
        self.resources.iter()
    }
}

/// Applies change sets through a [`ProvisioningEngine`]
pub struct Deployer<E: ProvisioningEngine> {
    engine: E,
    context: PlatformContext,
    environment: String,
    state: DeploymentState,
    events: Vec<ProvisioningEvent>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl<E: ProvisioningEngine> Deployer<E> {
    pub fn new(engine: E, context: PlatformContext, environment: impl Into<String>) -> Self {
        Self {
            engine,
            context,
            environment: environment.into(),
            state: DeploymentState::new(),
            events: Vec::new(),
            publisher: None,
        }
    }

    /// Start from resources provisioned by an earlier run
    pub fn with_state(mut self, state: DeploymentState) -> Self {
        self.state = state;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    pub fn events(&self) -> &[ProvisioningEvent] {
        &self.events
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Apply every change in order and resolve the outputs
    ///
    /// Returns the outputs whose values could be resolved. Stops at the
    /// first failing change.
    pub async fn apply(&mut self, change_set: &ChangeSet) -> SynthesisResult<BTreeMap<String, String>> {
        let correlation_id = Uuid::now_v7();
        info!(
            environment = %self.environment,
            changes = change_set.len(),
            %correlation_id,
            "Applying change set"
        );

        for change in &change_set.changes {
            self.apply_change(change, correlation_id).await?;
        }

        let outputs = self.resolve_outputs(&change_set.outputs);
        info!(
            environment = %self.environment,
            outputs = outputs.len(),
            "Change set applied"
        );
        Ok(outputs)
    }

    async fn apply_change(&mut self, change: &ResourceChange, correlation_id: Uuid) -> SynthesisResult<()> {
        let id = change.logical_id.as_str();
        let kind = ResourceKind::from_platform_type(&change.resource.resource_type).ok_or_else(|| {
            SynthesisError::Engine {
                resource: id.to_string(),
                message: format!("Unsupported resource type {}", change.resource.resource_type),
            }
        })?;

        let initial = match change.action {
            ChangeAction::Create => ProvisioningStatus::Pending,
            _ => ProvisioningStatus::Available,
        };
        match self.state.resources.entry(id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(DeployedResource::new(kind, initial));
            }
            // A deleted or retained resource created again starts a new lifecycle.
            Entry::Occupied(mut slot)
                if change.action == ChangeAction::Create && slot.get().status().is_terminal() =>
            {
                debug!(resource = id, previous = %slot.get().status(), "Recreating resource");
                slot.insert(DeployedResource::new(kind, initial));
            }
            Entry::Occupied(_) => {}
        }

        debug!(resource = id, action = %change.action, "Applying change");

        match change.action {
            ChangeAction::Create | ChangeAction::Update => {
                let creating = change.action == ChangeAction::Create;
                let begin = if creating {
                    LifecycleCommand::BeginCreate
                } else {
                    LifecycleCommand::BeginUpdate
                };
                self.step(id, begin, correlation_id).await?;

                let request = match self.resolve_request(change, kind) {
                    Ok(request) => request,
                    Err(err) => {
                        self.step(id, LifecycleCommand::Fail(err.to_string()), correlation_id)
                            .await?;
                        return Err(err.into());
                    }
                };

                let result = if creating {
                    self.engine.create(&request).await
                } else {
                    self.engine.update(&request).await
                };

                match result {
                    Ok(attributes) => {
                        if let Some(resource) = self.state.resources.get_mut(id) {
                            resource.attributes.extend(attributes);
                        }
                        self.step(id, LifecycleCommand::Complete, correlation_id).await
                    }
                    Err(err) => self.fail(id, err, correlation_id).await,
                }
            }
            ChangeAction::Delete => {
                self.step(id, LifecycleCommand::BeginDelete, correlation_id).await?;
                let request = ResourceRequest {
                    logical_id: id.to_string(),
                    kind,
                    properties: change.resource.properties.clone(),
                    physical_id: self.physical_id(id),
                };
                match self.engine.delete(&request).await {
                    Ok(()) => {
                        if let Some(resource) = self.state.resources.get_mut(id) {
                            resource.attributes.clear();
                        }
                        self.step(id, LifecycleCommand::Complete, correlation_id).await
                    }
                    Err(err) => self.fail(id, err, correlation_id).await,
                }
            }
            ChangeAction::Retain => self.step(id, LifecycleCommand::Retain, correlation_id).await,
        }
    }

    async fn fail(&mut self, id: &str, err: EngineError, correlation_id: Uuid) -> SynthesisResult<()> {
        error!(resource = id, error = %err.message, "Provisioning engine failure");
        self.step(id, LifecycleCommand::Fail(err.message.clone()), correlation_id)
            .await?;
        Err(SynthesisError::Engine {
            resource: id.to_string(),
            message: err.message,
        })
    }

    /// Drive one lifecycle transition and record its event
    async fn step(&mut self, id: &str, command: LifecycleCommand, correlation_id: Uuid) -> SynthesisResult<()> {
        let Some(resource) = self.state.resources.get_mut(id) else {
            return Err(GraphError::Unresolved {
                from: id.to_string(),
                to: id.to_string(),
            }
            .into());
        };

        let from = resource.status().clone();
        let output = resource.lifecycle.transition_with_history(command, Utc::now())?;
        let to = resource.status().clone();
        let kind = resource.kind;

        for warning in &output.warnings {
            if output.is_critical {
                error!(resource = id, "{}", warning);
            } else {
                warn!(resource = id, "{}", warning);
            }
        }

        let causation_id = self
            .events
            .iter()
            .rev()
            .find(|event| event.logical_id == id)
            .map(|event| event.event_id);

        let event = ProvisioningEvent::new(
            correlation_id,
            causation_id,
            Utc::now(),
            self.environment.as_str(),
            id,
            kind,
            from,
            to,
        );

        if let Some(publisher) = &self.publisher {
            if let Err(err) = publisher.publish(&event).await {
                warn!(resource = id, error = %err, "Failed to publish provisioning event");
            }
        }

        self.events.push(event);
        Ok(())
    }

    fn physical_id(&self, id: &str) -> Option<String> {
        self.state
            .get(id)
            .and_then(DeployedResource::physical_id)
            .map(str::to_string)
    }

    fn resolve_request(&self, change: &ResourceChange, kind: ResourceKind) -> Result<ResourceRequest, GraphError> {
        let id = change.logical_id.as_str();
        let properties = change
            .resource
            .properties
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.resolve(id, value)?)))
            .collect::<Result<_, GraphError>>()?;

        Ok(ResourceRequest {
            logical_id: id.to_string(),
            kind,
            properties,
            physical_id: self.physical_id(id),
        })
    }

    /// Replace `Ref`, `Fn::GetAtt` and `Fn::Join` with concrete values
    pub fn resolve(&self, from: &str, value: &serde_json::Value) -> Result<serde_json::Value, GraphError> {
        use serde_json::Value as Json;

        let unresolved = |to: &str| GraphError::Unresolved {
            from: from.to_string(),
            to: to.to_string(),
        };

        match value {
            Json::Object(map) if map.len() == 1 => {
                if let Some(Json::String(target)) = map.get("Ref") {
                    if let Some(parameter) = PseudoParameter::from_name(target) {
                        return Ok(Json::String(self.context.pseudo(parameter).to_string()));
                    }
                    return self
                        .state
                        .attribute(target, PRIMARY_ID)
                        .map(|id| Json::String(id.to_string()))
                        .ok_or_else(|| unresolved(target));
                }

                if let Some(Json::Array(args)) = map.get("Fn::GetAtt") {
                    if let [Json::String(target), Json::String(attribute)] = args.as_slice() {
                        return self
                            .state
                            .attribute(target, attribute)
                            .map(|value| Json::String(value.to_string()))
                            .ok_or_else(|| unresolved(&format!("{target}.{attribute}")));
                    }
                }

                if let Some(Json::Array(args)) = map.get("Fn::Join") {
                    if let [Json::String(separator), Json::Array(parts)] = args.as_slice() {
                        let mut joined = Vec::with_capacity(parts.len());
                        for part in parts {
                            match self.resolve(from, part)? {
                                Json::String(text) => joined.push(text),
                                other => joined.push(other.to_string()),
                            }
                        }
                        return Ok(Json::String(joined.join(separator)));
                    }
                }

                if map.contains_key("Fn::Secret") {
                    return Ok(value.clone());
                }

                self.resolve_entries(from, map)
            }
            Json::Object(map) => self.resolve_entries(from, map),
            Json::Array(items) => items
                .iter()
                .map(|item| self.resolve(from, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_entries(
        &self,
        from: &str,
        map: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, GraphError> {
        map.iter()
            .map(|(key, nested)| Ok((key.clone(), self.resolve(from, nested)?)))
            .collect::<Result<serde_json::Map<_, _>, GraphError>>()
            .map(serde_json::Value::Object)
    }

    fn resolve_outputs(&self, outputs: &BTreeMap<String, TemplateOutput>) -> BTreeMap<String, String> {
        outputs
            .iter()
            .filter_map(|(name, output)| match self.resolve(name, &output.value) {
                Ok(serde_json::Value::String(value)) => Some((name.clone(), value)),
                Ok(other) => Some((name.clone(), other.to_string())),
                Err(err) => {
                    debug!(output = %name, error = %err, "Output not resolved");
                    None
                }
            })
            .collect()
    }
}
