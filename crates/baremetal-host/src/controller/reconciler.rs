//! One reconciliation pass for one host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::state_machine::{record_transition, HostStateMachine};
use super::{ActionResult, ReconcileInfo};
use crate::bmc::{AccessDetails, BmcError, Credentials, CredentialsError, DriverRegistry};
use crate::config::{EngineConfig, PAUSED_ANNOTATION};
use crate::error::{ReconcileError, Result};
use crate::host::{CredentialsStatus, ErrorType, Host, ProvisioningState, SecretReference};
use crate::provisioner::ProvisionerFactory;

/// A BMC credentials secret at a particular revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmcSecret {
    pub reference: SecretReference,
    pub version: String,
    pub credentials: Credentials,
}

impl BmcSecret {
    /// Identity of this revision, as compared by the state machine.
    #[must_use]
    pub fn status(&self) -> CredentialsStatus {
        CredentialsStatus::new(self.reference.clone(), self.version.clone())
    }
}

/// Where BMC credentials live.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret, or `None` when it does not exist.
    async fn get(&self, key: &SecretReference) -> Option<BmcSecret>;
}

/// Secret store kept in memory. Every write bumps the version.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<SecretReference, BmcSecret>>,
    revision: AtomicU64,
}

impl InMemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a secret. Returns the new version.
    pub fn insert(&self, namespace: &str, name: &str, credentials: Credentials) -> String {
        let version = (self.revision.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let reference = SecretReference {
            name: name.to_string(),
            namespace: namespace.to_string(),
        };
        let secret = BmcSecret {
            reference: reference.clone(),
            version: version.clone(),
            credentials,
        };
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference, secret);
        version
    }

    pub fn remove(&self, namespace: &str, name: &str) -> bool {
        let key = SecretReference {
            name: name.to_string(),
            namespace: namespace.to_string(),
        };
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, key: &SecretReference) -> Option<BmcSecret> {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

/// What the caller should do after a pass.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Run again after this delay; `None` waits for the next change.
    pub requeue_after: Option<Duration>,
    /// Deletion has finished and the host can be removed.
    pub ready_for_removal: bool,
    /// Events and transitions from the pass.
    pub info: ReconcileInfo,
}

impl ReconcileOutcome {
    fn new(info: ReconcileInfo, requeue_after: Option<Duration>) -> Self {
        Self {
            requeue_after,
            ready_for_removal: false,
            info,
        }
    }
}

/// Drives hosts through the state machine.
pub struct Reconciler {
    config: EngineConfig,
    registry: &'static DriverRegistry,
    provisioners: Arc<dyn ProvisionerFactory>,
    secrets: Arc<dyn SecretStore>,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        config: EngineConfig,
        registry: &'static DriverRegistry,
        provisioners: Arc<dyn ProvisionerFactory>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            config,
            registry,
            provisioners,
            secrets,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one pass over `host`, mutating it in place.
    ///
    /// The caller persists the host afterwards. On `Err` the host's status
    /// is unchanged.
    ///
    /// # Errors
    /// Returns configuration errors (unsupported BMC driver, unknown
    /// profile, unhandled state) and unexpected provisioner failures.
    #[instrument(skip_all, fields(host = %host.metadata.name))]
    pub async fn reconcile(&self, host: &mut Host) -> Result<ReconcileOutcome> {
        let mut info = ReconcileInfo::new(host.name(), CredentialsStatus::default());

        if host.metadata.annotations.contains_key(PAUSED_ANNOTATION) {
            info!("host is paused, no work to be done");
            return Ok(ReconcileOutcome::new(info, Some(self.config.paused_requeue())));
        }

        let deleting = host.deletion_requested();
        if !deleting && host.add_finalizer(&self.config.finalizer) {
            debug!(finalizer = %self.config.finalizer, "adding finalizer");
        }

        let access = match self.resolve_access(host) {
            Ok(access) => Some(access),
            Err(e) if deleting => {
                warn!(error = %e, "cannot resolve BMC while deleting");
                None
            }
            Err(BmcError::EmptyAddress) => {
                let message = BmcError::EmptyAddress.to_string();
                return Ok(Self::credentials_error(host, info, &message, None));
            }
            Err(e) => return Err(e.into()),
        };

        let credentials = match self.load_credentials(host).await {
            Ok(secret) => {
                info.credentials = secret.status();
                secret.credentials
            }
            Err(e) if deleting => {
                debug!(error = %e, "using empty credentials while deleting");
                Credentials::default()
            }
            Err(e) => {
                let retry = matches!(e, CredentialsError::SecretNotFound { .. })
                    .then(|| self.config.host_error_retry());
                return Ok(Self::credentials_error(host, info, &e.to_string(), retry));
            }
        };

        let provisioner = self
            .provisioners
            .build(host, access, credentials)
            .map_err(|e| ReconcileError::provisioner("build provisioner", e))?;

        let result = HostStateMachine::new(host, provisioner.as_ref(), &self.config)
            .reconcile_state(&mut info)
            .await;

        let mut outcome = match result {
            ActionResult::Complete => ReconcileOutcome::new(info, Some(Duration::ZERO)),
            ActionResult::Requeue(delay) => ReconcileOutcome::new(info, Some(delay)),
            ActionResult::Failed(error_type) => {
                debug!(%error_type, "operation failed, waiting for a change");
                ReconcileOutcome::new(info, None)
            }
            ActionResult::Error(e) => return Err(e),
        };

        host.status.last_updated = Some(Utc::now());
        if !host.status.hardware_profile.is_empty() {
            let profile = host.status.hardware_profile.clone();
            host.set_label(&self.config.hardware_profile_label, &profile);
        }

        if deleting
            && host.state() == ProvisioningState::Deleting
            && !host.has_finalizer(&self.config.finalizer)
        {
            info!("host is ready to be removed");
            outcome.ready_for_removal = true;
            outcome.requeue_after = None;
        }
        Ok(outcome)
    }

    fn resolve_access(
        &self,
        host: &Host,
    ) -> std::result::Result<Box<dyn AccessDetails>, BmcError> {
        self.registry.resolve(
            &host.spec.bmc.address,
            host.spec.bmc.disable_certificate_verification,
        )
    }

    async fn load_credentials(
        &self,
        host: &Host,
    ) -> std::result::Result<BmcSecret, CredentialsError> {
        if host.spec.bmc.credentials_name.is_empty() {
            return Err(CredentialsError::MissingSecretName);
        }
        let key = host.credentials_key();
        let secret = self
            .secrets
            .get(&key)
            .await
            .ok_or_else(|| CredentialsError::SecretNotFound {
                namespace: key.namespace.clone(),
                name: key.name.clone(),
            })?;
        secret.credentials.validate()?;
        Ok(secret)
    }

    /// Put the host into the registration error state because its BMC
    /// details or credentials are unusable.
    fn credentials_error(
        host: &mut Host,
        mut info: ReconcileInfo,
        message: &str,
        requeue_after: Option<Duration>,
    ) -> ReconcileOutcome {
        warn!(error = %message, "BMC details are not usable");

        if host.set_error_message(ErrorType::RegistrationError, message) {
            info.publish_event(ErrorType::RegistrationError.event_reason(), message);
        }
        let now = Utc::now();
        let from = host.state();
        record_transition(host, &mut info, from, ProvisioningState::RegistrationError, now);
        host.status.last_updated = Some(now);

        ReconcileOutcome::new(info, requeue_after)
    }
}
