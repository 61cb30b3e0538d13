//! Huawei iBMC driver.

use serde_json::Value;
use url::Url;

use super::{
    host_port, transport_or, url_path, AccessDetails, BmcError, Credentials, DriverFactory,
    DriverInfo,
};

pub(super) const FACTORY: DriverFactory = DriverFactory {
    name: "ibmc",
    transports: &["http", "https"],
    build,
};

const DEFAULT_TRANSPORT: &str = "https";

fn build(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>, BmcError> {
    Ok(Box::new(IbmcAccessDetails {
        bmc_type: url.scheme().to_string(),
        host: host_port(url),
        path: url_path(url).to_string(),
        disable_certificate_verification,
    }))
}

#[derive(Debug)]
struct IbmcAccessDetails {
    bmc_type: String,
    host: String,
    path: String,
    disable_certificate_verification: bool,
}

impl IbmcAccessDetails {
    /// Endpoint rebuilt from the transport, host and path.
    fn address(&self) -> String {
        format!(
            "{}://{}{}",
            transport_or(&self.bmc_type, DEFAULT_TRANSPORT),
            self.host,
            self.path
        )
    }
}

impl AccessDetails for IbmcAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        "ibmc"
    }

    // Inspection cannot find the NIC without it.
    fn needs_mac(&self) -> bool {
        true
    }

    fn disable_certificate_verification(&self) -> bool {
        self.disable_certificate_verification
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let mut info = DriverInfo::new();
        info.insert("ibmc_username".into(), Value::from(credentials.username.clone()));
        info.insert("ibmc_password".into(), Value::from(credentials.password.clone()));
        info.insert("ibmc_address".into(), Value::from(self.address()));
        if self.disable_certificate_verification {
            info.insert("ibmc_verify_ca".into(), Value::Bool(false));
        }
        info
    }

    fn boot_interface(&self) -> &'static str {
        "pxe"
    }

    fn management_interface(&self) -> &'static str {
        "ibmc"
    }

    fn power_interface(&self) -> &'static str {
        "ibmc"
    }

    fn raid_interface(&self) -> &'static str {
        ""
    }

    fn vendor_interface(&self) -> &'static str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use crate::bmc::new_access_details;

    use super::*;

    #[test]
    fn test_ibmc_defaults_to_https() {
        let details = new_access_details("ibmc://10.0.0.5/redfish", false).unwrap();
        assert_eq!(details.driver(), "ibmc");
        assert!(details.needs_mac());

        let info = details.driver_info(&Credentials::new("admin", "pw"));
        assert_eq!(info["ibmc_address"], "https://10.0.0.5/redfish");
        assert_eq!(info["ibmc_username"], "admin");
        assert_eq!(info["ibmc_password"], "pw");
        assert!(!info.contains_key("ibmc_verify_ca"));
    }

    #[test]
    fn test_ibmc_keeps_transport_and_port() {
        let details = new_access_details("ibmc+http://bmc.lab:8080", true).unwrap();
        assert_eq!(details.bmc_type(), "ibmc+http");

        let info = details.driver_info(&Credentials::default());
        assert_eq!(info["ibmc_address"], "http://bmc.lab:8080");
        assert_eq!(info["ibmc_verify_ca"], false);
        assert_eq!(details.node_properties()["boot_mode"], "UEFI");
    }

    #[test]
    fn test_ibmc_interfaces() {
        let details = new_access_details("ibmc://10.0.0.5", false).unwrap();
        assert_eq!(details.boot_interface(), "pxe");
        assert_eq!(details.management_interface(), "ibmc");
        assert_eq!(details.power_interface(), "ibmc");
        assert_eq!(details.raid_interface(), "");
        assert_eq!(details.vendor_interface(), "");
    }
}
