// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-stack
//!
//! Deterministic deployment parameters and a scripted provisioning engine.
//! Nothing here reads the process environment.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;

use cim_stack::config::DeploymentParameters;
use cim_stack::engine::{EngineError, ProvisioningEngine, ResourceAttributes, ResourceRequest, PRIMARY_ID};
use cim_stack::orchestrator::{StackOrchestrator, Synthesis};

pub const HOSTED_ZONE_ID: &str = "Z0123456789ABCDEFGHIJ";
pub const HOSTED_ZONE_NAME: &str = "example.com";
pub const REGION: &str = "eu-central-1";
pub const ACCOUNT_ID: &str = "123456789012";

/// Complete parameters for the `dev` environment
pub fn dev_parameters() -> DeploymentParameters {
    DeploymentParameters {
        env_name: Some("dev".to_string()),
        hosted_zone_id: Some(HOSTED_ZONE_ID.to_string()),
        hosted_zone_name: Some(HOSTED_ZONE_NAME.to_string()),
        region: Some(REGION.to_string()),
        ..Default::default()
    }
}

/// Complete parameters for a production environment that keeps its data
pub fn prod_parameters() -> DeploymentParameters {
    DeploymentParameters {
        env_name: Some("prod".to_string()),
        data_retention: Some("retain".to_string()),
        ..dev_parameters()
    }
}

pub fn synthesize(params: &DeploymentParameters) -> Synthesis {
    StackOrchestrator::new()
        .synthesize(params)
        .expect("fixture parameters must synthesize")
}

/// Attributes every fake resource reports
const ATTRIBUTES: [&str; 7] = [
    "Arn",
    "CanonicalHostedZoneID",
    "DNSName",
    "Endpoint.Address",
    "GroupId",
    "Name",
    "ReadEndpoint.Address",
];

/// Engine that records calls and answers with synthetic attributes
#[derive(Default)]
pub struct ScriptedEngine {
    pub calls: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<ResourceRequest>>,
    pub fail_on: Option<(String, String)>,
}

impl ScriptedEngine {
    pub fn failing_on(logical_id: &str, message: &str) -> Self {
        Self {
            fail_on: Some((logical_id.to_string(), message.to_string())),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    /// Last request the engine received for `logical_id`
    pub fn last_request(&self, logical_id: &str) -> Option<ResourceRequest> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .iter()
            .rev()
            .find(|request| request.logical_id == logical_id)
            .cloned()
    }

    /// Attributes the engine reports for `logical_id`
    pub fn attributes_for(logical_id: &str) -> ResourceAttributes {
        let base = logical_id.to_lowercase();
        let mut attributes: ResourceAttributes = ATTRIBUTES
            .iter()
            .map(|name| (name.to_string(), format!("{base}.{}", name.to_lowercase())))
            .collect();
        attributes.insert(PRIMARY_ID.to_string(), format!("{base}-0001"));
        attributes
    }

    fn record(&self, verb: &str, request: &ResourceRequest) -> Result<(), EngineError> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(format!("{verb} {}", request.logical_id));
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request.clone());
        match &self.fail_on {
            Some((id, message)) if *id == request.logical_id => Err(EngineError::new(message.clone())),
            _ => Ok(()),
        }
    }

    fn attributes(request: &ResourceRequest) -> ResourceAttributes {
        Self::attributes_for(&request.logical_id)
    }
}

#[async_trait]
impl ProvisioningEngine for ScriptedEngine {
    async fn create(&self, request: &ResourceRequest) -> Result<ResourceAttributes, EngineError> {
        self.record("create", request)?;
        Ok(Self::attributes(request))
    }

    async fn update(&self, request: &ResourceRequest) -> Result<ResourceAttributes, EngineError> {
        self.record("update", request)?;
        Ok(Self::attributes(request))
    }

    async fn delete(&self, request: &ResourceRequest) -> Result<(), EngineError> {
        self.record("delete", request)
    }
}
