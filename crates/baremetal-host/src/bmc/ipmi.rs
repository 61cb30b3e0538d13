//! IPMI driver. Bare host addresses resolve here.

use serde_json::{Map, Value};
use url::Url;

use super::{
    hostname, AccessDetails, BmcError, Credentials, DriverFactory, DriverInfo, BOOT_MODE_LEGACY,
};

pub(super) const FACTORY: DriverFactory = DriverFactory {
    name: "ipmi",
    transports: &[],
    build,
};

const DEFAULT_PORT: u16 = 623;

fn build(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>, BmcError> {
    Ok(Box::new(IpmiAccessDetails {
        bmc_type: url.scheme().to_string(),
        host: hostname(url),
        port: url.port().unwrap_or(DEFAULT_PORT),
        disable_certificate_verification,
    }))
}

#[derive(Debug)]
struct IpmiAccessDetails {
    bmc_type: String,
    host: String,
    port: u16,
    disable_certificate_verification: bool,
}

impl AccessDetails for IpmiAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        "ipmi"
    }

    fn needs_mac(&self) -> bool {
        false
    }

    fn disable_certificate_verification(&self) -> bool {
        self.disable_certificate_verification
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let mut info = DriverInfo::new();
        info.insert("ipmi_address".into(), Value::from(self.host.clone()));
        info.insert("ipmi_port".into(), Value::from(self.port.to_string()));
        info.insert("ipmi_username".into(), Value::from(credentials.username.clone()));
        info.insert("ipmi_password".into(), Value::from(credentials.password.clone()));
        info
    }

    fn node_properties(&self) -> DriverInfo {
        let mut properties = Map::new();
        properties.insert("boot_mode".into(), Value::from(BOOT_MODE_LEGACY));
        properties
    }

    fn boot_interface(&self) -> &'static str {
        "ipxe"
    }

    fn management_interface(&self) -> &'static str {
        ""
    }

    fn power_interface(&self) -> &'static str {
        ""
    }

    fn raid_interface(&self) -> &'static str {
        "no-raid"
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
    fn test_ipmi_default_port() {
        let details = new_access_details("ipmi://192.168.122.1", false).unwrap();
        let info = details.driver_info(&Credentials::new("admin", "pw"));
        assert_eq!(info["ipmi_address"], "192.168.122.1");
        assert_eq!(info["ipmi_port"], "623");
        assert_eq!(info["ipmi_username"], "admin");
        assert!(!details.needs_mac());
    }

    #[test]
    fn test_ipmi_explicit_port_and_legacy_boot() {
        let details = new_access_details("ipmi://192.168.122.1:6233", false).unwrap();
        let info = details.driver_info(&Credentials::default());
        assert_eq!(info["ipmi_port"], "6233");
        assert_eq!(details.node_properties()["boot_mode"], "legacy");
        assert_eq!(details.raid_interface(), "no-raid");
        assert_eq!(details.boot_interface(), "ipxe");
    }

    #[test]
    fn test_ipmi_ipv6_address_has_no_brackets() {
        let details = new_access_details("ipmi://[fe80::1]:623", false).unwrap();
        let info = details.driver_info(&Credentials::default());
        assert_eq!(info["ipmi_address"], "fe80::1");
        assert_eq!(info["ipmi_port"], "623");
    }
}
