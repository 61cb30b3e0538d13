//! Host lifecycle controller.
//!
//! [`Reconciler::reconcile`] runs one pass for one host: it resolves the BMC
//! and credentials, builds a provisioner and hands control to the
//! [`HostStateMachine`], which runs exactly one state handler.

mod actions;
pub mod reconciler;
pub mod state_machine;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ReconcileError;
use crate::host::{CredentialsStatus, ErrorType, ProvisioningState};

pub use actions::{
    BMC_ACCESS_VALIDATED, DEPROVISIONING_COMPLETE, PROFILE_SET, PROVISIONING_COMPLETE,
};
pub use reconciler::{BmcSecret, InMemorySecretStore, ReconcileOutcome, Reconciler, SecretStore};
pub use state_machine::{HostStateMachine, DELETE_WITHOUT_DEPROVISIONING};

/// What a state handler asks the caller to do next.
#[derive(Debug)]
pub enum ActionResult {
    /// Work for this state is done; run again now.
    Complete,
    /// In progress; run again after the delay without changing state.
    Requeue(Duration),
    /// The operation cannot proceed. The error is recorded on the host.
    Failed(ErrorType),
    /// Something unexpected went wrong; the caller retries with backoff.
    Error(ReconcileError),
}

impl ActionResult {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Something worth telling a human about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostEvent {
    pub reason: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A provisioning state change made during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: ProvisioningState,
    pub to: ProvisioningState,
    pub timestamp: DateTime<Utc>,
}

/// Per-pass context shared by the reconciler and the state machine.
#[derive(Debug, Clone, Default)]
pub struct ReconcileInfo {
    pub host_name: String,
    /// The credentials secret currently referenced by the host.
    pub credentials: CredentialsStatus,
    /// Events to publish once the host has been saved.
    pub events: Vec<HostEvent>,
    pub transitions: Vec<StateTransition>,
}

impl ReconcileInfo {
    #[must_use]
    pub fn new(host_name: impl Into<String>, credentials: CredentialsStatus) -> Self {
        Self {
            host_name: host_name.into(),
            credentials,
            ..Self::default()
        }
    }

    pub fn publish_event(&mut self, reason: impl Into<String>, message: impl Into<String>) {
        self.events.push(HostEvent {
            reason: reason.into(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// True when an event with the reason was published in this pass.
    #[must_use]
    pub fn has_event(&self, reason: &str) -> bool {
        self.events.iter().any(|event| event.reason == reason)
    }
}
