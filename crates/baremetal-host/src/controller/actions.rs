//! The work behind each state handler.
//!
//! Actions call the provisioner and update the host's status. They never
//! choose the next state; that is left to the handler that called them.

use tracing::{debug, info};

use super::state_machine::HostStateMachine;
use super::{ActionResult, ReconcileInfo};
use crate::error::ReconcileError;
use crate::host::Image;
use crate::profile::{get_profile, DEFAULT_PROFILE_NAME};
use crate::provisioner::{OperationFailure, ProvisionResult};

pub const BMC_ACCESS_VALIDATED: &str = "BMCAccessValidated";
pub const PROFILE_SET: &str = "ProfileSet";
pub const PROVISIONING_COMPLETE: &str = "ProvisioningComplete";
pub const DEPROVISIONING_COMPLETE: &str = "DeprovisioningComplete";

impl HostStateMachine<'_> {
    /// Record a typed failure on the host and report it.
    fn record_failure(
        &mut self,
        info: &mut ReconcileInfo,
        failure: OperationFailure,
    ) -> ActionResult {
        info!(
            error_type = %failure.error_type,
            message = %failure.message,
            "operation failed"
        );
        self.host.set_error_message(failure.error_type, failure.message.clone());
        info.publish_event(failure.error_type.event_reason(), failure.message);
        ActionResult::Failed(failure.error_type)
    }

    /// Register the host with the backend and validate BMC access.
    pub(super) async fn action_registering(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        let credentials_changed = !self.host.status.tried_credentials.matches(&info.credentials);

        let result = match self
            .provisioner
            .validate_management_access(self.host, credentials_changed)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                return ActionResult::Error(ReconcileError::provisioner(
                    "validate management access",
                    e,
                ))
            }
        };

        // Only credentials the backend actually received count as tried.
        if credentials_changed {
            info!("new credentials");
            self.host.update_tried_credentials(&info.credentials);
        }

        match result {
            ProvisionResult::Failed(failure) => self.record_failure(info, failure),
            ProvisionResult::Requeue(delay) => {
                self.host.clear_error();
                ActionResult::Requeue(delay)
            }
            ProvisionResult::Complete(provisioning_id) => {
                if !provisioning_id.is_empty() {
                    self.host.status.provisioning.id = provisioning_id;
                }
                self.host.clear_error();
                if !self.host.status.good_credentials.matches(&info.credentials) {
                    info!("updating credentials success status fields");
                    self.host.update_good_credentials(&info.credentials);
                    info.publish_event(BMC_ACCESS_VALIDATED, "Verified access to BMC");
                }
                ActionResult::Complete
            }
        }
    }

    /// Collect the hardware inventory.
    pub(super) async fn action_inspecting(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        info!("inspecting hardware");
        let result = match self.provisioner.inspect_hardware(self.host).await {
            Ok(result) => result,
            Err(e) => {
                return ActionResult::Error(ReconcileError::provisioner("inspect hardware", e))
            }
        };

        match result {
            ProvisionResult::Failed(failure) => self.record_failure(info, failure),
            ProvisionResult::Requeue(delay) => ActionResult::Requeue(delay),
            ProvisionResult::Complete(details) => {
                self.host.status.hardware_details = Some(details);
                self.host.clear_error();
                ActionResult::Complete
            }
        }
    }

    /// Pick the hardware profile and the root device hints to use.
    pub(super) fn action_match_profile(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        let name = if self.host.spec.hardware_profile.is_empty() {
            DEFAULT_PROFILE_NAME
        } else {
            self.host.spec.hardware_profile.as_str()
        };
        let profile = match get_profile(name) {
            Ok(profile) => profile,
            Err(e) => return ActionResult::Error(e.into()),
        };

        if self.host.set_hardware_profile(profile.name) {
            info!(profile = profile.name, "updating hardware profile");
            info.publish_event(PROFILE_SET, format!("Hardware profile set: {}", profile.name));
        }

        let hints = self
            .host
            .spec
            .root_device_hints
            .clone()
            .unwrap_or_else(|| profile.root_device_hints.clone());
        self.host.status.provisioning.root_device_hints = Some(hints);
        self.host.clear_error();
        ActionResult::Complete
    }

    /// Keep the power state in line with the spec.
    pub(super) async fn action_manage_steady_state(
        &mut self,
        info: &mut ReconcileInfo,
    ) -> ActionResult {
        let observed = match self.provisioner.update_hardware_state(self.host).await {
            Ok(ProvisionResult::Complete(state)) => state,
            Ok(ProvisionResult::Requeue(delay)) => return ActionResult::Requeue(delay),
            Ok(ProvisionResult::Failed(failure)) => return self.record_failure(info, failure),
            Err(e) => {
                return ActionResult::Error(ReconcileError::provisioner(
                    "update hardware state",
                    e,
                ))
            }
        };
        if let Some(powered_on) = observed.powered_on {
            self.host.status.powered_on = powered_on;
        }

        let desired = self.host.spec.online;
        if self.host.status.powered_on == desired {
            debug!(powered_on = desired, "power state is as requested");
            return ActionResult::Requeue(self.config.power_check_interval());
        }

        info!(
            current = self.host.status.powered_on,
            desired, "changing power state"
        );
        let (operation, result) = if desired {
            ("power on", self.provisioner.power_on(self.host).await)
        } else {
            ("power off", self.provisioner.power_off(self.host).await)
        };

        match result {
            Ok(ProvisionResult::Complete(())) => {
                self.host.status.powered_on = desired;
                self.host.clear_error();
                ActionResult::Requeue(self.config.power_check_interval())
            }
            Ok(ProvisionResult::Requeue(delay)) => ActionResult::Requeue(delay),
            Ok(ProvisionResult::Failed(failure)) => self.record_failure(info, failure),
            Err(e) => ActionResult::Error(ReconcileError::provisioner(operation, e)),
        }
    }

    /// Start provisioning when due, otherwise keep the host's power in line.
    pub(super) async fn action_manage_ready(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        if self.host.needs_provisioning() {
            self.host.clear_error();
            return ActionResult::Complete;
        }
        self.action_manage_steady_state(info).await
    }

    /// Write the spec image to the host.
    pub(super) async fn action_provisioning(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        if self.host.status.hardware_profile.is_empty() {
            return ActionResult::Error(ReconcileError::Config(
                "cannot provision a host without a hardware profile".to_string(),
            ));
        }
        let profile = match get_profile(&self.host.status.hardware_profile) {
            Ok(profile) => profile,
            Err(e) => return ActionResult::Error(e.into()),
        };

        info!(profile = profile.name, "provisioning");
        let result = match self.provisioner.provision(self.host, profile).await {
            Ok(result) => result,
            Err(e) => return ActionResult::Error(ReconcileError::provisioner("provision", e)),
        };

        match result {
            ProvisionResult::Failed(failure) => self.record_failure(info, failure),
            ProvisionResult::Requeue(delay) => ActionResult::Requeue(delay),
            ProvisionResult::Complete(()) => {
                let image = self.host.spec.image.clone().unwrap_or_default();
                info.publish_event(
                    PROVISIONING_COMPLETE,
                    format!("Image provisioning completed for {}", image.url),
                );
                self.host.status.provisioning.image = image;
                self.host.clear_error();
                ActionResult::Complete
            }
        }
    }

    /// Remove the provisioned image.
    pub(super) async fn action_deprovisioning(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        info!("deprovisioning");
        let result = match self.provisioner.deprovision(self.host).await {
            Ok(result) => result,
            Err(e) => return ActionResult::Error(ReconcileError::provisioner("deprovision", e)),
        };

        match result {
            ProvisionResult::Failed(failure) => self.record_failure(info, failure),
            ProvisionResult::Requeue(delay) => ActionResult::Requeue(delay),
            ProvisionResult::Complete(()) => {
                self.host.status.provisioning.image = Image::default();
                self.host.clear_error();
                info.publish_event(DEPROVISIONING_COMPLETE, "Image deprovisioning completed");
                ActionResult::Complete
            }
        }
    }

    /// Tear the host down in the backend and release our finalizer.
    pub(super) async fn action_deleting(&mut self, info: &mut ReconcileInfo) -> ActionResult {
        if !self.host.has_finalizer(&self.config.finalizer) {
            debug!("finalizer already removed");
            return ActionResult::Complete;
        }

        info!("marked to be deleted");
        let result = match self.provisioner.delete(self.host).await {
            Ok(result) => result,
            Err(e) => return ActionResult::Error(ReconcileError::provisioner("delete", e)),
        };

        match result {
            ProvisionResult::Failed(failure) => self.record_failure(info, failure),
            ProvisionResult::Requeue(delay) => ActionResult::Requeue(delay),
            ProvisionResult::Complete(()) => {
                self.host.remove_finalizer(&self.config.finalizer);
                info!("cleanup is complete, removed finalizer");
                ActionResult::Complete
            }
        }
    }
}
