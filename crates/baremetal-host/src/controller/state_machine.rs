//! The provisioning state machine.
//!
//! Each pass looks at the persisted state, applies the delete and
//! re-registration overrides, and otherwise runs the handler for that state.
//! Handlers pick the next state; the machine records it on the way out.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use super::{ActionResult, ReconcileInfo, StateTransition};
use crate::config::EngineConfig;
use crate::error::ReconcileError;
use crate::host::{ErrorType, Host, ProvisioningState};
use crate::provisioner::Provisioner;

/// Event published when deletion skipped deprovisioning.
pub const DELETE_WITHOUT_DEPROVISIONING: &str = "DeleteWithoutDeprovisioning";

/// Drives one host through one pass.
pub struct HostStateMachine<'a> {
    pub(super) host: &'a mut Host,
    pub(super) provisioner: &'a dyn Provisioner,
    pub(super) config: &'a EngineConfig,
    pub(super) next_state: ProvisioningState,
}

impl<'a> HostStateMachine<'a> {
    pub fn new(
        host: &'a mut Host,
        provisioner: &'a dyn Provisioner,
        config: &'a EngineConfig,
    ) -> Self {
        let next_state = host.state();
        Self {
            host,
            provisioner,
            config,
            next_state,
        }
    }

    /// State the host will be in once the pass has been recorded.
    #[must_use]
    pub fn next_state(&self) -> ProvisioningState {
        self.next_state
    }

    /// Run one pass and record any state change on the host.
    ///
    /// On [`ActionResult::Error`] the host's status is left as it was before
    /// the pass.
    #[instrument(skip_all, fields(host = %info.host_name))]
    pub async fn reconcile_state(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        let initial_state = self.host.state();
        let snapshot = self.host.status.clone();
        let result = self.dispatch(initial_state, info).await;
        if let ActionResult::Error(e) = &result {
            warn!(error = %e, "pass failed, discarding status changes");
            self.host.status = snapshot;
            self.next_state = initial_state;
            return result;
        }
        record_transition(self.host, info, initial_state, self.next_state, Utc::now());
        result
    }

    async fn dispatch(
        &mut self,
        initial_state: ProvisioningState,
        info: &mut ReconcileInfo,
    ) -> ActionResult {
        if self.check_initiate_delete() {
            info!("initiating host deletion");
            return ActionResult::Complete;
        }
        if self.should_initiate_register(info) {
            info!("initiating host registration");
            return ActionResult::Complete;
        }

        match initial_state {
            ProvisioningState::None => self.handle_none(),
            ProvisioningState::Registering => self.handle_registering(info).await,
            ProvisioningState::RegistrationError => self.handle_registration_error(info),
            ProvisioningState::Inspecting => self.handle_inspecting(info).await,
            ProvisioningState::ExternallyProvisioned => {
                self.handle_externally_provisioned(info).await
            }
            ProvisioningState::MatchProfile => self.handle_match_profile(info),
            ProvisioningState::Ready => self.handle_ready(info).await,
            ProvisioningState::Provisioning => self.handle_provisioning(info).await,
            ProvisioningState::ProvisioningError => self.handle_provisioning_error(),
            ProvisioningState::Provisioned => self.handle_provisioned(info).await,
            ProvisioningState::PowerManagementError => self.handle_power_management_error(),
            ProvisioningState::Deprovisioning => self.handle_deprovisioning(info).await,
            ProvisioningState::Deleting => self.handle_deleting(info).await,
            ProvisioningState::Available => {
                warn!(state = %initial_state, "no handler found for state");
                ActionResult::Error(ReconcileError::UnhandledState(initial_state))
            }
        }
    }

    /// Redirect a host with a pending deletion. Returns true when the state
    /// changed and no handler should run.
    fn check_initiate_delete(&mut self) -> bool {
        if !self.host.deletion_requested() {
            return false;
        }
        match self.next_state {
            ProvisioningState::Provisioning
            | ProvisioningState::ProvisioningError
            | ProvisioningState::Provisioned => {
                self.next_state = ProvisioningState::Deprovisioning;
            }
            // Let the handler carry on with the teardown.
            ProvisioningState::Deprovisioning | ProvisioningState::Deleting => return false,
            _ => self.next_state = ProvisioningState::Deleting,
        }
        true
    }

    /// Force re-registration when the referenced credentials are not the
    /// ones last known to work.
    fn should_initiate_register(&mut self, info: &ReconcileInfo) -> bool {
        if self.host.deletion_requested() {
            return false;
        }
        let change_state = match self.next_state {
            ProvisioningState::None
            | ProvisioningState::Registering
            | ProvisioningState::RegistrationError
            | ProvisioningState::Deleting => false,
            _ => !self.host.status.good_credentials.matches(&info.credentials),
        };
        if change_state {
            self.next_state = ProvisioningState::Registering;
        }
        change_state
    }

    fn handle_none(&mut self) -> ActionResult {
        // Getting this far means the BMC details resolved.
        self.host.clear_error();
        self.next_state = ProvisioningState::Registering;
        ActionResult::Complete
    }

    async fn handle_registering(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        let result = self.action_registering(info).await;
        match result {
            ActionResult::Complete => {
                self.next_state = if self.host.spec.externally_provisioned {
                    ProvisioningState::ExternallyProvisioned
                } else if self.host.was_provisioned() {
                    ProvisioningState::Provisioned
                } else if self.host.needs_hardware_inspection() {
                    ProvisioningState::Inspecting
                } else if self.host.needs_hardware_profile() {
                    ProvisioningState::MatchProfile
                } else {
                    ProvisioningState::Ready
                };
            }
            ActionResult::Failed(_) => self.next_state = ProvisioningState::RegistrationError,
            _ => {}
        }
        result
    }

    fn handle_registration_error(&mut self, info: &ReconcileInfo) -> ActionResult {
        if !self.host.status.tried_credentials.matches(&info.credentials) {
            info!("modified credentials detected; will retry registration");
            self.next_state = ProvisioningState::Registering;
            return ActionResult::Complete;
        }
        ActionResult::Failed(ErrorType::RegistrationError)
    }

    async fn handle_inspecting(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        let result = self.action_inspecting(info).await;
        if result.is_complete() {
            self.next_state = ProvisioningState::MatchProfile;
        }
        result
    }

    fn handle_match_profile(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        let result = self.action_match_profile(info);
        if result.is_complete() {
            self.next_state = ProvisioningState::Ready;
        }
        result
    }

    async fn handle_externally_provisioned(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        if self.host.spec.externally_provisioned {
            let result = self.action_manage_steady_state(info).await;
            self.route_steady_state_failure(&result);
            return result;
        }

        self.next_state = if self.host.needs_hardware_inspection() {
            ProvisioningState::Inspecting
        } else if self.host.needs_hardware_profile() {
            ProvisioningState::MatchProfile
        } else {
            ProvisioningState::Ready
        };
        ActionResult::Complete
    }

    async fn handle_ready(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        if self.host.spec.externally_provisioned {
            self.next_state = ProvisioningState::ExternallyProvisioned;
            return ActionResult::Complete;
        }

        let result = self.action_manage_ready(info).await;
        if result.is_complete() {
            self.next_state = ProvisioningState::Provisioning;
        }
        self.route_steady_state_failure(&result);
        result
    }

    async fn handle_provisioning(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        if self.host.needs_deprovisioning() {
            self.next_state = ProvisioningState::Deprovisioning;
            return ActionResult::Complete;
        }

        let result = self.action_provisioning(info).await;
        match result {
            ActionResult::Complete => self.next_state = ProvisioningState::Provisioned,
            ActionResult::Failed(_) => self.next_state = ProvisioningState::ProvisioningError,
            _ => {}
        }
        result
    }

    fn handle_provisioning_error(&mut self) -> ActionResult {
        self.next_state = if self.host.spec.externally_provisioned {
            ProvisioningState::ExternallyProvisioned
        } else {
            ProvisioningState::Deprovisioning
        };
        ActionResult::Complete
    }

    async fn handle_provisioned(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        if self.host.needs_deprovisioning() {
            self.next_state = ProvisioningState::Deprovisioning;
            return ActionResult::Complete;
        }

        let result = self.action_manage_steady_state(info).await;
        self.route_steady_state_failure(&result);
        result
    }

    fn handle_power_management_error(&mut self) -> ActionResult {
        self.next_state = if self.host.spec.externally_provisioned {
            ProvisioningState::ExternallyProvisioned
        } else if self.host.was_provisioned() {
            ProvisioningState::Provisioned
        } else {
            ProvisioningState::Ready
        };
        ActionResult::Complete
    }

    async fn handle_deprovisioning(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        let result = self.action_deprovisioning(info).await;
        let deleting = self.host.deletion_requested();
        match result {
            ActionResult::Complete => {
                self.next_state = if deleting {
                    ProvisioningState::Deleting
                } else {
                    ProvisioningState::Ready
                };
                result
            }
            ActionResult::Failed(_) if deleting => {
                // The backend gave up; deletion goes ahead regardless.
                self.next_state = ProvisioningState::Deleting;
                info.publish_event(
                    DELETE_WITHOUT_DEPROVISIONING,
                    "Deprovisioning failed; deleting without deprovisioning",
                );
                ActionResult::Complete
            }
            ActionResult::Failed(_) => {
                self.next_state = ProvisioningState::ProvisioningError;
                result
            }
            _ => result,
        }
    }

    async fn handle_deleting(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        self.action_deleting(info).await
    }

    fn route_steady_state_failure(&mut self, result: &ActionResult) {
        match result {
            ActionResult::Failed(ErrorType::PowerManagementError) => {
                self.next_state = ProvisioningState::PowerManagementError;
            }
            ActionResult::Failed(ErrorType::RegistrationError) => {
                self.next_state = ProvisioningState::RegistrationError;
            }
            _ => {}
        }
    }
}

/// Record a state change: close the timing entry for the old state, open
/// one for the new state, note the transition, then store the new state.
///
/// Does nothing when the state is unchanged.
pub(crate) fn record_transition(
    host: &mut Host,
    info: &mut ReconcileInfo,
    from: ProvisioningState,
    to: ProvisioningState,
    now: DateTime<Utc>,
) {
    if from == to {
        return;
    }
    info!(host = %info.host_name, old = %from, new = %to, "changing provisioning state");

    if let Some(metric) = host.operation_metric_for_state(from) {
        metric.finish(now);
    }
    if let Some(metric) = host.operation_metric_for_state(to) {
        metric.begin(now);
    }
    info.transitions.push(StateTransition {
        from,
        to,
        timestamp: now,
    });
    host.status.provisioning.state = to;
}
