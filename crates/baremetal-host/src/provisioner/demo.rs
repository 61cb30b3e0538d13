//! Demo backend.
//!
//! Behaviour is keyed off the host name so every state of the machine can
//! be reached without hardware. Hosts with any other name complete every
//! operation immediately.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{
    HardwareState, ProvisionResult, Provisioner, ProvisionerError, ProvisionerFactory,
};
use crate::bmc::{AccessDetails, Credentials};
use crate::host::{ErrorType, HardwareDetails, Host};
use crate::inspection::{
    get_hardware_details, BaseInterface, CpuInfo, Disk, Interface, IntrospectionData, Inventory,
    SystemVendorInfo,
};
use crate::profile::Profile;

/// Fails registration.
pub const REGISTRATION_ERROR_HOST: &str = "demo-registration-error";
/// Stays in registering.
pub const REGISTERING_HOST: &str = "demo-registering";
/// Stays in inspecting.
pub const INSPECTING_HOST: &str = "demo-inspecting";
/// Reaches ready and stays there.
pub const READY_HOST: &str = "demo-ready";
/// Stays in provisioning.
pub const PROVISIONING_HOST: &str = "demo-provisioning";
/// Fails image validation while provisioning.
pub const VALIDATION_ERROR_HOST: &str = "demo-validation-error";
/// Provisions successfully.
pub const PROVISIONED_HOST: &str = "demo-provisioned";

const DEMO_REQUEUE_DELAY: Duration = Duration::from_secs(5);

/// Builds [`DemoProvisioner`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoProvisionerFactory;

impl ProvisionerFactory for DemoProvisionerFactory {
    fn build(
        &self,
        host: &Host,
        access: Option<Box<dyn AccessDetails>>,
        credentials: Credentials,
    ) -> Result<Box<dyn Provisioner>, ProvisionerError> {
        Ok(Box::new(DemoProvisioner {
            host_name: host.name().to_string(),
            access,
            credentials,
        }))
    }
}

#[derive(Debug)]
pub struct DemoProvisioner {
    host_name: String,
    access: Option<Box<dyn AccessDetails>>,
    credentials: Credentials,
}

impl DemoProvisioner {
    fn is(&self, name: &str) -> bool {
        self.host_name == name
    }
}

#[async_trait]
impl Provisioner for DemoProvisioner {
    async fn validate_management_access(
        &self,
        host: &Host,
        credentials_changed: bool,
    ) -> Result<ProvisionResult<String>, ProvisionerError> {
        info!(
            host = %self.host_name,
            driver = self.access.as_ref().map_or("none", |access| access.driver()),
            username = %self.credentials.username,
            credentials_changed,
            "validating management access"
        );

        if self.is(REGISTRATION_ERROR_HOST) {
            return Ok(ProvisionResult::failed(
                ErrorType::RegistrationError,
                "failed to register new host",
            ));
        }
        if self.is(REGISTERING_HOST) {
            return Ok(ProvisionResult::Requeue(DEMO_REQUEUE_DELAY));
        }

        let id = if host.status.provisioning.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            host.status.provisioning.id.clone()
        };
        Ok(ProvisionResult::Complete(id))
    }

    async fn inspect_hardware(
        &self,
        _host: &Host,
    ) -> Result<ProvisionResult<HardwareDetails>, ProvisionerError> {
        if self.is(INSPECTING_HOST) {
            info!(host = %self.host_name, "inspection in progress");
            return Ok(ProvisionResult::Requeue(DEMO_REQUEUE_DELAY));
        }
        info!(host = %self.host_name, "continuing inspection");
        Ok(ProvisionResult::Complete(get_hardware_details(
            &synthetic_introspection(&self.host_name),
        )))
    }

    async fn update_hardware_state(
        &self,
        host: &Host,
    ) -> Result<ProvisionResult<HardwareState>, ProvisionerError> {
        Ok(ProvisionResult::Complete(HardwareState {
            powered_on: Some(host.status.powered_on),
        }))
    }

    async fn provision(
        &self,
        host: &Host,
        profile: &Profile,
    ) -> Result<ProvisionResult, ProvisionerError> {
        let image = host.spec.image.as_ref().map_or("", |image| image.url.as_str());
        info!(host = %self.host_name, profile = profile.name, image, "provisioning");

        if self.is(VALIDATION_ERROR_HOST) {
            return Ok(ProvisionResult::failed(
                ErrorType::ProvisioningError,
                "image validation failed",
            ));
        }
        if self.is(PROVISIONING_HOST) {
            return Ok(ProvisionResult::Requeue(DEMO_REQUEUE_DELAY));
        }
        Ok(ProvisionResult::Complete(()))
    }

    async fn deprovision(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        info!(host = %self.host_name, "deprovisioning");
        Ok(ProvisionResult::Complete(()))
    }

    async fn power_on(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        info!(host = %self.host_name, "powering on");
        Ok(ProvisionResult::Complete(()))
    }

    async fn power_off(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        info!(host = %self.host_name, "powering off");
        Ok(ProvisionResult::Complete(()))
    }

    async fn delete(&self, _host: &Host) -> Result<ProvisionResult, ProvisionerError> {
        info!(host = %self.host_name, "deleting");
        Ok(ProvisionResult::Complete(()))
    }
}

/// A small but complete inspection payload.
fn synthetic_introspection(hostname: &str) -> IntrospectionData {
    let mut all_interfaces = BTreeMap::new();
    all_interfaces.insert(
        "eth0".to_string(),
        BaseInterface {
            pxe: true,
            lldp_processed: None,
        },
    );

    IntrospectionData {
        inventory: Inventory {
            interfaces: vec![Interface {
                name: "eth0".into(),
                vendor: "0x1af4".into(),
                product: "0x0001".into(),
                mac_address: "52:54:00:00:00:01".into(),
                ipv4_address: "192.168.111.20".into(),
                ipv6_address: String::new(),
            }],
            disks: vec![Disk {
                name: "/dev/sda".into(),
                size: 53_687_091_200,
                vendor: "QEMU".into(),
                model: "QEMU HARDDISK".into(),
                hctl: "0:0:0:0".into(),
                ..Disk::default()
            }],
            cpu: CpuInfo {
                architecture: "x86_64".into(),
                model_name: "Intel Xeon E3-12xx v2 (Ivy Bridge)".into(),
                frequency: "2399.998".into(),
                count: 4,
                flags: vec!["vmx".into(), "fpu".into(), "aes".into()],
            },
            system_vendor: SystemVendorInfo {
                manufacturer: "QEMU".into(),
                product_name: "Standard PC (Q35 + ICH9, 2009)".into(),
                serial_number: String::new(),
            },
            hostname: hostname.to_string(),
        },
        all_interfaces,
        memory_mb: 16_384,
        ..IntrospectionData::default()
    }
}
