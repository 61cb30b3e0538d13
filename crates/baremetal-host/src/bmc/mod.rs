//! BMC driver registry.
//!
//! A BMC address is a URL whose scheme names the driver, optionally with
//! the transport appended (`redfish+http://...`). Each driver contributes a
//! factory that turns the parsed address into [`AccessDetails`], which the
//! provisioning backend uses to talk to the controller.
//!
//! The table of drivers is built once from a closed list and never changes
//! afterwards, so lookups from concurrent passes need no locking.

mod credentials;
mod ibmc;
mod idrac;
mod ipmi;
mod redfish;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

pub use credentials::{Credentials, CredentialsError};

/// Parameters handed to the provisioning backend for one driver.
pub type DriverInfo = Map<String, Value>;

/// Errors resolving a BMC address.
#[derive(Error, Debug)]
pub enum BmcError {
    /// The host has no BMC address.
    #[error("missing BMC address")]
    EmptyAddress,

    /// The address is not a valid URL.
    #[error("failed to parse BMC address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// No driver is registered for the scheme.
    #[error("unsupported BMC driver '{scheme}' in address '{address}'")]
    UnsupportedDriver { scheme: String, address: String },
}

/// Driver-specific way of reaching one BMC.
pub trait AccessDetails: fmt::Debug + Send + Sync {
    /// Full scheme of the address, e.g. `ibmc+http`.
    fn bmc_type(&self) -> &str;

    /// Driver name understood by the provisioning backend.
    fn driver(&self) -> &'static str;

    /// Whether the boot MAC must be supplied because the backend cannot
    /// discover the NIC on its own.
    fn needs_mac(&self) -> bool;

    fn disable_certificate_verification(&self) -> bool;

    /// Connection parameters, including the credentials.
    fn driver_info(&self, credentials: &Credentials) -> DriverInfo;

    /// Node properties such as the boot mode.
    fn node_properties(&self) -> DriverInfo {
        let mut properties = Map::new();
        properties.insert("boot_mode".into(), Value::from(BOOT_MODE_UEFI));
        properties
    }

    fn boot_interface(&self) -> &'static str;
    fn management_interface(&self) -> &'static str;
    fn power_interface(&self) -> &'static str;
    fn raid_interface(&self) -> &'static str;
    fn vendor_interface(&self) -> &'static str;
}

/// UEFI boot mode.
pub const BOOT_MODE_UEFI: &str = "UEFI";

/// Legacy BIOS boot mode.
pub const BOOT_MODE_LEGACY: &str = "legacy";

/// Builds access details from a parsed address and the certificate policy.
pub type FactoryFn = fn(&Url, bool) -> Result<Box<dyn AccessDetails>, BmcError>;

/// One entry in the driver table.
#[derive(Clone, Copy)]
pub struct DriverFactory {
    /// Base scheme, e.g. `redfish`.
    pub name: &'static str,
    /// Transports accepted as `name+transport`.
    pub transports: &'static [&'static str],
    pub build: FactoryFn,
}

impl fmt::Debug for DriverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverFactory")
            .field("name", &self.name)
            .field("transports", &self.transports)
            .finish_non_exhaustive()
    }
}

/// Immutable scheme → factory table.
#[derive(Debug)]
pub struct DriverRegistry {
    factories: BTreeMap<String, DriverFactory>,
}

static REGISTRY: LazyLock<DriverRegistry> = LazyLock::new(DriverRegistry::with_default_drivers);

/// The process-wide registry of supported drivers.
#[must_use]
pub fn registry() -> &'static DriverRegistry {
    &REGISTRY
}

/// Resolve an address against the process-wide registry.
///
/// # Errors
/// See [`DriverRegistry::resolve`].
pub fn new_access_details(
    address: &str,
    disable_certificate_verification: bool,
) -> Result<Box<dyn AccessDetails>, BmcError> {
    registry().resolve(address, disable_certificate_verification)
}

impl DriverRegistry {
    /// Build a registry from a list of driver factories.
    #[must_use]
    pub fn new(drivers: &[DriverFactory]) -> Self {
        let mut factories = BTreeMap::new();
        for driver in drivers {
            factories.insert(driver.name.to_string(), *driver);
            for transport in driver.transports {
                factories.insert(format!("{}+{transport}", driver.name), *driver);
            }
        }
        Self { factories }
    }

    /// Registry with every driver this crate ships.
    #[must_use]
    pub fn with_default_drivers() -> Self {
        Self::new(&[
            ibmc::FACTORY,
            idrac::FACTORY,
            ipmi::FACTORY,
            redfish::FACTORY,
        ])
    }

    /// All registered schemes, sorted.
    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn supports(&self, scheme: &str) -> bool {
        self.factories.contains_key(scheme)
    }

    /// Parse a BMC address and build its access details.
    ///
    /// An address without `://` is taken to be a bare IPMI host.
    ///
    /// # Errors
    /// Returns [`BmcError::EmptyAddress`] for an empty address,
    /// [`BmcError::InvalidAddress`] when it does not parse and
    /// [`BmcError::UnsupportedDriver`] when no driver handles the scheme.
    pub fn resolve(
        &self,
        address: &str,
        disable_certificate_verification: bool,
    ) -> Result<Box<dyn AccessDetails>, BmcError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(BmcError::EmptyAddress);
        }

        let parsed = parse_address(address)?;
        let factory =
            self.factories
                .get(parsed.scheme())
                .ok_or_else(|| BmcError::UnsupportedDriver {
                    scheme: parsed.scheme().to_string(),
                    address: address.to_string(),
                })?;
        (factory.build)(&parsed, disable_certificate_verification)
    }
}

fn parse_address(address: &str) -> Result<Url, BmcError> {
    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("ipmi://{address}")
    };
    Url::parse(&with_scheme).map_err(|source| BmcError::InvalidAddress {
        address: address.to_string(),
        source,
    })
}

/// Transport half of a compound scheme, or `default` when there is none.
fn transport_or<'a>(bmc_type: &'a str, default: &'a str) -> &'a str {
    bmc_type
        .split_once('+')
        .map_or(default, |(_, transport)| transport)
}

/// Host and optional port of a parsed address, as written.
fn host_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Bare host of a parsed address. IPv6 literals lose their brackets.
fn hostname(url: &Url) -> String {
    match url.host() {
        Some(url::Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    }
}

/// Path of a parsed address, empty when the address had none.
fn url_path(url: &Url) -> &str {
    match url.path() {
        "/" => "",
        path => path,
    }
}
