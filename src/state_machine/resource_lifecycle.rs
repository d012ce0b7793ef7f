// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Lifecycle State Machine
//!
//! Tracks one platform resource through a deployment. Mealy machine: the
//! output flags critical transitions and carries warnings.
//!
//! # States
//!
//! - Pending: declared, not yet requested
//! - Creating / Updating / Deleting: request in flight at the engine
//! - Available: exists and matches the last applied definition
//! - Deleted: removed (terminal)
//! - Retained: left in place on teardown (terminal)
//! - Failed: the engine rejected the last request
//!
//! # Inputs
//!
//! - BeginCreate: Pending | Failed → Creating
//! - BeginUpdate: Available | Failed → Updating
//! - BeginDelete: Available | Failed → Deleting
//! - Complete: Creating | Updating → Available, Deleting → Deleted
//! - Retain: Available | Failed → Retained
//! - Fail(reason): Creating | Updating | Deleting → Failed

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Provisioning status of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ProvisioningStatus {
    Pending,
    Creating,
    Updating,
    Available,
    Deleting,
    Deleted,
    Retained,
    Failed(String),
}

impl ProvisioningStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Creating => "creating",
            Self::Updating => "updating",
            Self::Available => "available",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Retained => "retained",
            Self::Failed(_) => "failed",
        }
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted | Self::Retained)
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Lifecycle command (FSM input)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleCommand {
    BeginCreate,
    BeginUpdate,
    BeginDelete,
    Complete,
    Retain,
    Fail(String),
}

/// Transition output with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutput {
    pub warnings: Vec<String>,
    pub is_critical: bool,
}

impl TransitionOutput {
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            is_critical: false,
        }
    }

    pub fn with_warnings(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: false,
        }
    }

    pub fn critical(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: true,
        }
    }
}

impl StateMachine for ProvisioningStatus {
    type Input = LifecycleCommand;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use LifecycleCommand::*;
        use ProvisioningStatus::*;

        match (self, input) {
            (Pending, BeginCreate) => Ok((Creating, TransitionOutput::ok())),
            (Failed(reason), BeginCreate) => Ok((
                Creating,
                TransitionOutput::with_warnings(vec![format!(
                    "Retrying creation after failure: {reason}"
                )]),
            )),

            (Available, BeginUpdate) => Ok((Updating, TransitionOutput::ok())),
            (Failed(reason), BeginUpdate) => Ok((
                Updating,
                TransitionOutput::with_warnings(vec![format!(
                    "Retrying update after failure: {reason}"
                )]),
            )),

            (Available, BeginDelete) | (Failed(_), BeginDelete) => {
                Ok((Deleting, TransitionOutput::ok()))
            }

            (Creating, Complete) | (Updating, Complete) => Ok((Available, TransitionOutput::ok())),
            (Deleting, Complete) => Ok((Deleted, TransitionOutput::ok())),

            (Available, Retain) | (Failed(_), Retain) => Ok((
                Retained,
                TransitionOutput::with_warnings(vec![
                    "Resource retained; it must be removed manually".to_string(),
                ]),
            )),

            (Creating, Fail(reason)) | (Updating, Fail(reason)) | (Deleting, Fail(reason)) => Ok((
                Failed(reason.clone()),
                TransitionOutput::critical(vec![reason.clone()]),
            )),

            (Deleted, _) | (Retained, _) => Err(TransitionError::InvalidTransition {
                from: self.name().to_string(),
                to: "any state".to_string(),
            }),

            (Creating, _) | (Updating, _) | (Deleting, _) => {
                Err(TransitionError::BusinessRuleViolation(format!(
                    "A request is already in flight ({})",
                    self.name()
                )))
            }

            (Available, BeginCreate) => Err(TransitionError::BusinessRuleViolation(
                "Resource already exists".to_string(),
            )),

            (Pending, _) => Err(TransitionError::InvalidTransition {
                from: "pending".to_string(),
                to: format!("{input:?}"),
            }),

            (Available, Complete) | (Available, Fail(_)) | (Failed(_), Complete) | (Failed(_), Fail(_)) => {
                Err(TransitionError::InvalidTransition {
                    from: self.name().to_string(),
                    to: format!("{input:?}"),
                })
            }
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use LifecycleCommand::*;
        use ProvisioningStatus::*;

        match self {
            Pending => vec![BeginCreate],
            Creating | Updating | Deleting => vec![Complete, Fail(String::new())],
            Available => vec![BeginUpdate, BeginDelete, Retain],
            Failed(_) => vec![BeginCreate, BeginUpdate, BeginDelete, Retain],
            Deleted | Retained => Vec::new(),
        }
    }
}
