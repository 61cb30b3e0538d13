//! Value types shared by the host spec and status blocks.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The states a host moves through while it is registered, inspected,
/// provisioned and torn down.
///
/// The serialized form is the persisted wire value, so the set is closed:
/// anything else fails to deserialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisioningState {
    /// Nothing has been done with the host yet.
    #[default]
    #[serde(rename = "")]
    None,
    /// Telling the backend about the host and validating BMC access.
    #[serde(rename = "registering")]
    Registering,
    /// The backend could not reach or authenticate to the BMC.
    #[serde(rename = "registration error")]
    RegistrationError,
    /// Running the agent on the host to learn about its hardware.
    #[serde(rename = "inspecting")]
    Inspecting,
    /// Something else manages the image; only power is managed here.
    #[serde(rename = "externally provisioned")]
    ExternallyProvisioned,
    /// Comparing discovered hardware against known profiles.
    #[serde(rename = "match profile")]
    MatchProfile,
    /// The host can be consumed.
    #[serde(rename = "ready")]
    Ready,
    /// The host can be consumed. No handler is registered for it.
    #[serde(rename = "available")]
    Available,
    /// Writing an image to the host's disks.
    #[serde(rename = "provisioning")]
    Provisioning,
    /// Writing or removing the image failed.
    #[serde(rename = "provisioning error")]
    ProvisioningError,
    /// An image has been written to the host's disks.
    #[serde(rename = "provisioned")]
    Provisioned,
    /// Changing the power state failed.
    #[serde(rename = "power management error")]
    PowerManagementError,
    /// Removing the image from the host's disks.
    #[serde(rename = "deprovisioning")]
    Deprovisioning,
    /// Final teardown before the host record is removed.
    #[serde(rename = "deleting")]
    Deleting,
}

impl ProvisioningState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::None,
        Self::Registering,
        Self::RegistrationError,
        Self::Inspecting,
        Self::ExternallyProvisioned,
        Self::MatchProfile,
        Self::Ready,
        Self::Available,
        Self::Provisioning,
        Self::ProvisioningError,
        Self::Provisioned,
        Self::PowerManagementError,
        Self::Deprovisioning,
        Self::Deleting,
    ];

    /// Wire form of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Registering => "registering",
            Self::RegistrationError => "registration error",
            Self::Inspecting => "inspecting",
            Self::ExternallyProvisioned => "externally provisioned",
            Self::MatchProfile => "match profile",
            Self::Ready => "ready",
            Self::Available => "available",
            Self::Provisioning => "provisioning",
            Self::ProvisioningError => "provisioning error",
            Self::Provisioned => "provisioned",
            Self::PowerManagementError => "power management error",
            Self::Deprovisioning => "deprovisioning",
            Self::Deleting => "deleting",
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of problem that put the host into an error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    /// The BMC could not be reached or the credentials were rejected.
    #[serde(rename = "registration error")]
    RegistrationError,
    /// Hardware details could not be obtained.
    #[serde(rename = "inspection error")]
    InspectionError,
    /// Provisioning or deprovisioning failed.
    #[serde(rename = "provisioning error")]
    ProvisioningError,
    /// The power state could not be changed.
    #[serde(rename = "power management error")]
    PowerManagementError,
}

impl ErrorType {
    /// Wire form of the error type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistrationError => "registration error",
            Self::InspectionError => "inspection error",
            Self::ProvisioningError => "provisioning error",
            Self::PowerManagementError => "power management error",
        }
    }

    /// Event reason published when an operation fails with this type.
    #[must_use]
    pub fn event_reason(&self) -> &'static str {
        match self {
            Self::RegistrationError => "RegistrationError",
            Self::InspectionError => "InspectionError",
            Self::ProvisioningError => "ProvisioningError",
            Self::PowerManagementError => "PowerManagementError",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse health signal for the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationalStatus {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "discovered")]
    Discovered,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "offline")]
    Offline,
}

/// How to reach the host's baseboard management controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmcDetails {
    /// URL of the controller, e.g. `ibmc://10.0.0.5/redfish`.
    #[serde(default)]
    pub address: String,
    /// Name of the secret holding `username` and `password`.
    #[serde(default)]
    pub credentials_name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_certificate_verification: bool,
}

/// Checksum algorithm for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    Md5,
    Sha256,
    Sha512,
    /// Any algorithm name we do not recognise.
    #[serde(other)]
    Unknown,
}

impl ChecksumType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Unknown => "unknown",
        }
    }
}

/// An image to provision, or the image last provisioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Location of the image to deploy.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_type: Option<ChecksumType>,
    /// `raw`, `qcow2`, `vdi` or `vmdk`.
    #[serde(default, rename = "format", skip_serializing_if = "Option::is_none")]
    pub disk_format: Option<String>,
}

/// Criteria for choosing the disk that receives the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDeviceHints {
    /// Linux device name like `/dev/vda`. Exact match.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_name: String,
    /// SCSI bus address like `0:0:0:0`. Exact match.
    #[serde(default, rename = "hctl", skip_serializing_if = "String::is_empty")]
    pub hctl: String,
    /// Substring of the vendor-specific device identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Substring of the device vendor.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub serial_number: String,
    /// Minimum size of the device in gigabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size_gigabytes: Option<u32>,
    #[serde(default, rename = "wwn", skip_serializing_if = "String::is_empty")]
    pub wwn: String,
    #[serde(default, rename = "wwnWithExtension", skip_serializing_if = "String::is_empty")]
    pub wwn_with_extension: String,
    #[serde(default, rename = "wwnVendorExtension", skip_serializing_if = "String::is_empty")]
    pub wwn_vendor_extension: String,
    /// Whether the device should use spinning media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotational: Option<bool>,
}

/// Reference to a namespaced secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretReference {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

/// Opaque reference to whatever is consuming a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Identity of a credentials secret: which secret and which revision of it.
///
/// Credential contents are never compared. A secret whose content changes
/// without a new version is not noticed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<SecretReference>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl CredentialsStatus {
    /// Build the status entry for a secret revision.
    #[must_use]
    pub fn new(reference: SecretReference, version: impl Into<String>) -> Self {
        Self {
            reference: Some(reference),
            version: version.into(),
        }
    }

    /// True when this entry names the same secret at the same version.
    #[must_use]
    pub fn matches(&self, other: &CredentialsStatus) -> bool {
        match (&self.reference, &other.reference) {
            (Some(ours), Some(theirs)) => ours == theirs && self.version == other.version,
            _ => false,
        }
    }
}

/// Start and end of one operation on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl OperationMetric {
    /// Open a fresh entry unless one is already running.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        if self.start.is_none() || self.end.is_some() {
            *self = Self {
                start: Some(now),
                end: None,
            };
        }
    }

    /// Close the entry if it was opened and is still running.
    ///
    /// Returns true when the entry was closed by this call.
    pub fn finish(&mut self, now: DateTime<Utc>) -> bool {
        if self.start.is_some() && self.end.is_none() {
            self.end = Some(now);
            return true;
        }
        false
    }

    /// Time spent on the operation. Zero while it is unfinished.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}

/// Timing of the operations that have been run on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHistory {
    #[serde(default)]
    pub register: OperationMetric,
    #[serde(default)]
    pub inspect: OperationMetric,
    #[serde(default)]
    pub provision: OperationMetric,
    #[serde(default)]
    pub deprovision: OperationMetric,
}

/// What the provisioner is doing with the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionStatus {
    #[serde(default)]
    pub state: ProvisioningState,
    /// Identifier assigned by the provisioning backend.
    #[serde(default, rename = "ID")]
    pub id: String,
    /// Last image successfully provisioned.
    #[serde(default)]
    pub image: Image,
    /// Hints in effect for the current provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_device_hints: Option<RootDeviceHints>,
}
