//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use baremetal_host::bmc::{AccessDetails, Credentials};
use baremetal_host::host::{
    BmcDetails, CredentialsStatus, HardwareDetails, Host, Image, ProvisioningState,
    SecretReference,
};
use baremetal_host::profile::Profile;
use baremetal_host::provisioner::{
    HardwareState, ProvisionResult, Provisioner, ProvisionerError, ProvisionerFactory,
};

pub const NAMESPACE: &str = "metal";
pub const SECRET_NAME: &str = "worker-0-bmc";

/// Canned answers for each provisioner operation.
#[derive(Debug, Clone)]
pub struct Script {
    pub register: ProvisionResult<String>,
    pub inspect: ProvisionResult<HardwareDetails>,
    pub powered_on: Option<bool>,
    pub power: ProvisionResult,
    pub provision: ProvisionResult,
    pub deprovision: ProvisionResult,
    pub delete: ProvisionResult,
    /// Operation that returns an unexpected error instead.
    pub error_on: Option<&'static str>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            register: ProvisionResult::Complete("node-uuid".to_string()),
            inspect: ProvisionResult::Complete(HardwareDetails {
                hostname: "worker-0".to_string(),
                ram_mebibytes: 4096,
                ..HardwareDetails::default()
            }),
            powered_on: Some(true),
            power: ProvisionResult::Complete(()),
            provision: ProvisionResult::Complete(()),
            deprovision: ProvisionResult::Complete(()),
            delete: ProvisionResult::Complete(()),
            error_on: None,
        }
    }
}

/// Provisioner that answers from a [`Script`] and records every call.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvisioner {
    pub script: Script,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedProvisioner {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> Result<(), ProvisionerError> {
        self.calls.lock().unwrap().push(operation);
        if self.script.error_on == Some(operation) {
            return Err(ProvisionerError::Backend(format!("{operation} exploded")));
        }
        Ok(())
    }
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn validate_management_access(
        &self,
        _host: &Host,
        _credentials_changed: bool,
    ) -> Result<ProvisionResult<String>, ProvisionerError> {
        self.record("validate_management_access")?;
        Ok(self.script.register.clone())
    }

    async fn inspect_hardware(
        &self,
        _host: &Host,
    ) -> Result<ProvisionResult<HardwareDetails>, ProvisionerError> {
        self.record("inspect_hardware")?;
        Ok(self.script.inspect.clone())
    }

    async fn update_hardware_state(
        &self,
        _host: &Host,
    ) -> Result<ProvisionResult<HardwareState>, ProvisionerError> {
        self.record("update_hardware_state")?;
        Ok(ProvisionResult::Complete(HardwareState {
            powered_on: self.script.powered_on,
        }))
    }

    async fn provision(
        &self,
        _host: &Host,
        _profile: &Profile,
    ) -> Result<ProvisionResult, ProvisionerError> {
        self.record("provision")?;
        Ok(self.script.provision.clone())
    }

    async fn deprovision(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        self.record("deprovision")?;
        Ok(self.script.deprovision.clone())
    }

    async fn power_on(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        self.record("power_on")?;
        Ok(self.script.power.clone())
    }

    async fn power_off(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        self.record("power_off")?;
        Ok(self.script.power.clone())
    }

    async fn delete(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        self.record("delete")?;
        Ok(self.script.delete.clone())
    }
}

/// Factory handing out clones of one scripted provisioner, so the test
/// can look at the calls afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    pub provisioner: ScriptedProvisioner,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Self {
        Self {
            provisioner: ScriptedProvisioner::new(script),
        }
    }
}

impl ProvisionerFactory for ScriptedFactory {
    fn build(
        &self,
        _host: &Host,
        _access: Option<Box<dyn AccessDetails>>,
        _credentials: Credentials,
    ) -> Result<Box<dyn Provisioner>, ProvisionerError> {
        Ok(Box::new(self.provisioner.clone()))
    }
}

pub fn secret_reference() -> SecretReference {
    SecretReference {
        name: SECRET_NAME.to_string(),
        namespace: NAMESPACE.to_string(),
    }
}

/// Credentials status for version `version` of the test secret.
pub fn credentials(version: &str) -> CredentialsStatus {
    CredentialsStatus::new(secret_reference(), version)
}

/// A host in `state` whose current credentials (version "1") are known to
/// work.
pub fn registered_host(name: &str, state: ProvisioningState) -> Host {
    let mut host = Host::new(name, NAMESPACE);
    host.spec.bmc = BmcDetails {
        address: "ipmi://192.168.122.1".to_string(),
        credentials_name: SECRET_NAME.to_string(),
        disable_certificate_verification: false,
    };
    host.status.good_credentials = credentials("1");
    host.status.tried_credentials = credentials("1");
    host.status.provisioning.state = state;
    host
}

pub fn image(url: &str) -> Image {
    Image {
        url: url.to_string(),
        checksum: "abc123".to_string(),
        ..Image::default()
    }
}
