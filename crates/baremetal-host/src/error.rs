//! Errors surfaced by a reconciliation pass.
//!
//! Typed operational failures (registration, inspection, provisioning,
//! power) are not errors here: they are recorded on the host and drive the
//! state machine into an error state. What remains are configuration
//! problems and unexpected backend failures, both returned to the caller
//! without touching the host's state.

use thiserror::Error;

use crate::bmc::BmcError;
use crate::host::ProvisioningState;
use crate::profile::ProfileError;
use crate::provisioner::ProvisionerError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The BMC address could not be turned into access details.
    #[error(transparent)]
    Bmc(#[from] BmcError),

    /// The host names a profile that does not exist.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// The backend failed unexpectedly.
    #[error("provisioner failed to {operation}: {source}")]
    Provisioner {
        operation: &'static str,
        #[source]
        source: ProvisionerError,
    },

    /// No handler is registered for the state.
    #[error("no handler found for state \"{0}\"")]
    UnhandledState(ProvisioningState),

    /// The host is missing something the current state needs.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReconcileError {
    /// Wrap a backend failure with the operation that was attempted.
    #[must_use]
    pub fn provisioner(operation: &'static str, source: ProvisionerError) -> Self {
        Self::Provisioner { operation, source }
    }

    /// True for errors caused by the host's configuration rather than a
    /// transient backend failure.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::Provisioner { .. })
    }
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
