//! Provisioning backend capability.
//!
//! A [`Provisioner`] is bound to one host and performs the slow work: talking
//! to the BMC, running inspection, writing and wiping images. The state
//! machine only looks at the [`ProvisionResult`] each call returns.

pub mod demo;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::bmc::{AccessDetails, Credentials};
use crate::host::{ErrorType, HardwareDetails, Host};
use crate::profile::Profile;

/// Unexpected failures talking to the backend.
///
/// These leave the host untouched and are retried by the caller.
#[derive(Error, Debug)]
pub enum ProvisionerError {
    /// The backend returned something we cannot act on.
    #[error("provisioning backend error: {0}")]
    Backend(String),

    /// The backend did not answer in time.
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// The backend has no record of the host.
    #[error("host not found in provisioning backend: {0}")]
    NotFound(String),
}

/// A failure the backend understood, recorded on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub error_type: ErrorType,
    pub message: String,
}

impl OperationFailure {
    #[must_use]
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }
}

/// Outcome of one provisioner operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionResult<T = ()> {
    /// The operation finished.
    Complete(T),
    /// Still in progress; ask again after the delay.
    Requeue(Duration),
    /// The operation cannot proceed.
    Failed(OperationFailure),
}

impl<T> ProvisionResult<T> {
    /// Shorthand for a typed failure.
    pub fn failed(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self::Failed(OperationFailure::new(error_type, message))
    }
}

/// Observed hardware state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareState {
    /// `None` when the backend could not tell.
    pub powered_on: Option<bool>,
}

/// Backend operations for one host.
///
/// Every call receives the current host so the backend sees the latest spec.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Register the host with the backend and check that the BMC answers
    /// with the configured credentials.
    ///
    /// Completes with the backend's identifier for the host.
    async fn validate_management_access(
        &self,
        host: &Host,
        credentials_changed: bool,
    ) -> Result<ProvisionResult<String>, ProvisionerError>;

    /// Boot the host into the inspection agent and collect its inventory.
    async fn inspect_hardware(
        &self,
        host: &Host,
    ) -> Result<ProvisionResult<HardwareDetails>, ProvisionerError>;

    /// Refresh what the backend knows about the host, mainly power.
    async fn update_hardware_state(
        &self,
        host: &Host,
    ) -> Result<ProvisionResult<HardwareState>, ProvisionerError>;

    /// Write the host's spec image using the profile's disk layout.
    async fn provision(
        &self,
        host: &Host,
        profile: &Profile,
    ) -> Result<ProvisionResult, ProvisionerError>;

    /// Remove the provisioned image.
    async fn deprovision(&self, host: &Host) -> Result<ProvisionResult, ProvisionerError>;

    async fn power_on(&self, host: &Host) -> Result<ProvisionResult, ProvisionerError>;

    async fn power_off(&self, host: &Host) -> Result<ProvisionResult, ProvisionerError>;

    /// Forget the host.
    async fn delete(&self, host: &Host) -> Result<ProvisionResult, ProvisionerError>;
}

/// Builds a provisioner bound to one host.
pub trait ProvisionerFactory: Send + Sync {
    /// `access` is only absent while deleting a host whose BMC address
    /// cannot be resolved.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be set up for the host.
    fn build(
        &self,
        host: &Host,
        access: Option<Box<dyn AccessDetails>>,
        credentials: Credentials,
    ) -> Result<Box<dyn Provisioner>, ProvisionerError>;
}
