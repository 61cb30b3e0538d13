//! The managed host entity: desired spec, observed status and the
//! predicates the state machine uses to decide what to do next.

pub mod hardware;
pub mod types;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use hardware::HardwareDetails;
pub use types::{
    BmcDetails, ChecksumType, CredentialsStatus, ErrorType, Image, ObjectReference,
    OperationHistory, OperationMetric, OperationalStatus, ProvisionStatus, ProvisioningState,
    RootDeviceHints, SecretReference,
};

/// Object metadata the engine relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    /// Set once deletion has been requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

/// Desired state, written by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSpec {
    #[serde(default)]
    pub bmc: BmcDetails,
    /// Override for the hardware profile when inspection cannot pick one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hardware_profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_device_hints: Option<RootDeviceHints>,
    /// MAC of the NIC that PXE boots. Required by some BMC drivers.
    #[serde(default, rename = "bootMACAddress", skip_serializing_if = "String::is_empty")]
    pub boot_mac_address: String,
    #[serde(default)]
    pub online: bool,
    /// Marks the host as in use by something.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_ref: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Something else manages the image; only power and inventory are
    /// handled here.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub externally_provisioned: bool,
}

/// Observed state, written only by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStatus {
    #[serde(default)]
    pub operational_status: OperationalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    #[serde(default)]
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Name of the profile matching the hardware.
    #[serde(default)]
    pub hardware_profile: String,
    #[serde(default, rename = "hardware", skip_serializing_if = "Option::is_none")]
    pub hardware_details: Option<HardwareDetails>,
    #[serde(default)]
    pub provisioning: ProvisionStatus,
    /// Last credentials that were validated as working.
    #[serde(default)]
    pub good_credentials: CredentialsStatus,
    /// Last credentials sent to the backend.
    #[serde(default)]
    pub tried_credentials: CredentialsStatus,
    #[serde(default)]
    pub powered_on: bool,
    #[serde(default)]
    pub operation_history: OperationHistory,
}

/// One physical machine under management.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub metadata: HostMetadata,
    #[serde(default)]
    pub spec: HostSpec,
    #[serde(default)]
    pub status: HostStatus,
}

impl Host {
    /// Create a host with the given name and namespace and an empty spec.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            metadata: HostMetadata {
                name: name.into(),
                namespace: namespace.into(),
                ..HostMetadata::default()
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn state(&self) -> ProvisioningState {
        self.status.provisioning.state
    }

    #[must_use]
    pub fn deletion_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// True if the host can be handed to a new consumer.
    #[must_use]
    pub fn available(&self) -> bool {
        self.spec.consumer_ref.is_none() && !self.deletion_requested() && !self.has_error()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.status.error_message.is_empty()
    }

    /// Record an error. Returns true when anything changed.
    pub fn set_error_message(&mut self, error_type: ErrorType, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut dirty = self.set_operational_status(OperationalStatus::Error);
        if self.status.error_type != Some(error_type) {
            self.status.error_type = Some(error_type);
            dirty = true;
        }
        if self.status.error_message != message {
            self.status.error_message = message;
            dirty = true;
        }
        dirty
    }

    /// Remove any recorded error. Returns true when anything changed.
    pub fn clear_error(&mut self) -> bool {
        let mut dirty = self.set_operational_status(OperationalStatus::Ok);
        if self.status.error_type.take().is_some() {
            dirty = true;
        }
        if !self.status.error_message.is_empty() {
            self.status.error_message.clear();
            dirty = true;
        }
        dirty
    }

    pub fn set_operational_status(&mut self, status: OperationalStatus) -> bool {
        if self.status.operational_status == status {
            return false;
        }
        self.status.operational_status = status;
        true
    }

    /// True when no hardware profile has been matched yet.
    #[must_use]
    pub fn needs_hardware_profile(&self) -> bool {
        self.status.hardware_profile.is_empty()
    }

    pub fn set_hardware_profile(&mut self, name: &str) -> bool {
        if self.status.hardware_profile == name {
            return false;
        }
        self.status.hardware_profile = name.to_string();
        true
    }

    /// Whether inspection should run.
    ///
    /// Never for hosts someone else provisioned or that we already
    /// provisioned, since inspecting reboots the machine.
    #[must_use]
    pub fn needs_hardware_inspection(&self) -> bool {
        if self.spec.externally_provisioned || self.was_provisioned() {
            return false;
        }
        self.status.hardware_details.is_none()
    }

    /// URL of the image requested in the spec, if any.
    fn spec_image_url(&self) -> &str {
        self.spec.image.as_ref().map_or("", |image| image.url.as_str())
    }

    /// True when the host should be powered on with an image it does not
    /// have yet.
    #[must_use]
    pub fn needs_provisioning(&self) -> bool {
        if !self.spec.online {
            return false;
        }
        let wanted = self.spec_image_url();
        if wanted.is_empty() {
            return false;
        }
        self.status.provisioning.image.url != wanted
    }

    /// True when an image has been written by us.
    #[must_use]
    pub fn was_provisioned(&self) -> bool {
        !self.spec.externally_provisioned && !self.status.provisioning.image.url.is_empty()
    }

    /// True when the provisioned image should be removed.
    #[must_use]
    pub fn needs_deprovisioning(&self) -> bool {
        let wanted = self.spec_image_url();
        if wanted.is_empty() {
            return true;
        }
        let current = &self.status.provisioning.image.url;
        if current.is_empty() {
            return false;
        }
        wanted != current
    }

    /// Record the secret revision as known to work.
    pub fn update_good_credentials(&mut self, current: &CredentialsStatus) {
        self.status.good_credentials = current.clone();
    }

    /// Record the secret revision as sent to the backend.
    pub fn update_tried_credentials(&mut self, current: &CredentialsStatus) {
        self.status.tried_credentials = current.clone();
    }

    /// Key of the secret holding the BMC credentials.
    #[must_use]
    pub fn credentials_key(&self) -> SecretReference {
        SecretReference {
            name: self.spec.bmc.credentials_name.clone(),
            namespace: self.metadata.namespace.clone(),
        }
    }

    /// Timing entry tracked for a state, if that state has one.
    pub fn operation_metric_for_state(
        &mut self,
        state: ProvisioningState,
    ) -> Option<&mut OperationMetric> {
        let history = &mut self.status.operation_history;
        match state {
            ProvisioningState::Registering => Some(&mut history.register),
            ProvisioningState::Inspecting => Some(&mut history.inspect),
            ProvisioningState::Provisioning => Some(&mut history.provision),
            ProvisioningState::Deprovisioning => Some(&mut history.deprovision),
            _ => None,
        }
    }

    /// Checksum and algorithm of the requested image.
    ///
    /// A checksum without an algorithm is assumed to be md5. Unknown
    /// algorithms and empty checksums yield `None`.
    #[must_use]
    pub fn image_checksum(&self) -> Option<(&str, ChecksumType)> {
        let image = self.spec.image.as_ref()?;
        if image.checksum.is_empty() {
            return None;
        }
        match image.checksum_type {
            None => Some((image.checksum.as_str(), ChecksumType::Md5)),
            Some(ChecksumType::Unknown) => None,
            Some(kind) => Some((image.checksum.as_str(), kind)),
        }
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata.finalizers.iter().any(|f| f == finalizer)
    }

    /// Returns true when the finalizer was added.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.metadata.finalizers.push(finalizer.to_string());
        true
    }

    /// Returns true when the finalizer was removed.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.metadata.finalizers.len();
        self.metadata.finalizers.retain(|f| f != finalizer);
        before != self.metadata.finalizers.len()
    }

    /// Set a label. Returns true when the value changed.
    pub fn set_label(&mut self, name: &str, value: &str) -> bool {
        if self.metadata.labels.get(name).map(String::as_str) == Some(value) {
            return false;
        }
        self.metadata
            .labels
            .insert(name.to_string(), value.to_string());
        true
    }
}
