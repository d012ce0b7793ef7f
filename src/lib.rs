// Copyright (c) 2025 - Cowboy AI, Inc.
//! Multi-tier deployment stack synthesis for the Composable Information Machine
//!
//! Validates deployment parameters, builds a typed resource graph tier by
//! tier (network, security, data, compute, edge, observability), renders it
//! as a deployment template, and plans and applies change sets through a
//! pluggable provisioning engine. Lifecycle transitions are emitted as
//! events and, with the `nats` feature, published on NATS.
//!
//! The `health-service` feature adds the database-backed liveness and
//! readiness service that runs behind the load balancer.

pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod events;
pub mod graph;
pub mod health;
#[cfg(feature = "nats")]
pub mod nats;
pub mod orchestrator;
pub mod plan;
pub mod state_machine;
pub mod subjects;
pub mod template;
pub mod tiers;

// Re-export commonly used types
pub use config::{DeploymentParameters, StackConfig};
pub use engine::{Deployer, PlatformContext, ProvisioningEngine};
pub use errors::{SynthesisError, SynthesisResult};
pub use events::{EventPublisher, ProvisioningEvent};
pub use graph::{LogicalId, ResourceGraph, ResourceHandle, Value};
#[cfg(feature = "nats")]
pub use nats::{NatsClient, NatsConfig, NatsEventPublisher};
pub use orchestrator::{StackOrchestrator, Synthesis};
pub use plan::{ChangeAction, ChangeSet};
pub use template::Template;
