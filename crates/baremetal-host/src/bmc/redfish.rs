//! DMTF Redfish driver.

use serde_json::Value;
use url::Url;

use super::{
    host_port, transport_or, url_path, AccessDetails, BmcError, Credentials, DriverFactory,
    DriverInfo,
};

pub(super) const FACTORY: DriverFactory = DriverFactory {
    name: "redfish",
    transports: &["http", "https"],
    build,
};

fn build(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>, BmcError> {
    Ok(Box::new(RedfishAccessDetails {
        bmc_type: url.scheme().to_string(),
        host: host_port(url),
        system_id: url_path(url).to_string(),
        disable_certificate_verification,
    }))
}

#[derive(Debug)]
struct RedfishAccessDetails {
    bmc_type: String,
    host: String,
    system_id: String,
    disable_certificate_verification: bool,
}

impl AccessDetails for RedfishAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        "redfish"
    }

    fn needs_mac(&self) -> bool {
        true
    }

    fn disable_certificate_verification(&self) -> bool {
        self.disable_certificate_verification
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let address = format!("{}://{}", transport_or(&self.bmc_type, "https"), self.host);

        let mut info = DriverInfo::new();
        info.insert("redfish_address".into(), Value::from(address));
        info.insert("redfish_system_id".into(), Value::from(self.system_id.clone()));
        info.insert("redfish_username".into(), Value::from(credentials.username.clone()));
        info.insert("redfish_password".into(), Value::from(credentials.password.clone()));
        if self.disable_certificate_verification {
            info.insert("redfish_verify_ca".into(), Value::Bool(false));
        }
        info
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
