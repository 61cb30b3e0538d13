//! Dell iDRAC driver.

use serde_json::Value;
use url::Url;

use super::{
    hostname, transport_or, url_path, AccessDetails, BmcError, Credentials, DriverFactory,
    DriverInfo,
};

pub(super) const FACTORY: DriverFactory = DriverFactory {
    name: "idrac",
    transports: &["http", "https"],
    build,
};

fn build(
    url: &Url,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>, BmcError> {
    Ok(Box::new(IdracAccessDetails {
        bmc_type: url.scheme().to_string(),
        host: hostname(url),
        port: url.port(),
        path: url_path(url).to_string(),
        disable_certificate_verification,
    }))
}

#[derive(Debug)]
struct IdracAccessDetails {
    bmc_type: String,
    host: String,
    port: Option<u16>,
    path: String,
    disable_certificate_verification: bool,
}

impl AccessDetails for IdracAccessDetails {
    fn bmc_type(&self) -> &str {
        &self.bmc_type
    }

    fn driver(&self) -> &'static str {
        "idrac"
    }

    fn needs_mac(&self) -> bool {
        false
    }

    fn disable_certificate_verification(&self) -> bool {
        self.disable_certificate_verification
    }

    fn driver_info(&self, credentials: &Credentials) -> DriverInfo {
        let mut info = DriverInfo::new();
        info.insert("drac_address".into(), Value::from(self.host.clone()));
        info.insert("drac_username".into(), Value::from(credentials.username.clone()));
        info.insert("drac_password".into(), Value::from(credentials.password.clone()));

        // Only pass what the address spelled out; the backend has defaults.
        if self.bmc_type.contains('+') {
            info.insert(
                "drac_protocol".into(),
                Value::from(transport_or(&self.bmc_type, "https")),
            );
        }
        if let Some(port) = self.port {
            info.insert("drac_port".into(), Value::from(port.to_string()));
        }
        if !self.path.is_empty() {
            info.insert("drac_path".into(), Value::from(self.path.clone()));
        }
        if self.disable_certificate_verification {
            info.insert("drac_verify_ca".into(), Value::Bool(false));
        }
        info
    }

    fn boot_interface(&self) -> &'static str {
        "ipxe"
    }

    fn management_interface(&self) -> &'static str {
        "idrac"
    }

    fn power_interface(&self) -> &'static str {
        "idrac"
    }

    fn raid_interface(&self) -> &'static str {
        ""
    }

    fn vendor_interface(&self) -> &'static str {
        ""
    }
}
