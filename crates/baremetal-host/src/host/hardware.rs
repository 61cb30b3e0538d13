//! Canonical hardware inventory recorded on a host after inspection.

use serde::{Deserialize, Serialize};

/// Clock speed in megahertz.
pub type ClockSpeed = f64;

/// Multiplier to convert gigahertz to [`ClockSpeed`].
pub const GIGAHERTZ: ClockSpeed = 1000.0;

/// Storage capacity in bytes.
pub type Capacity = i64;

/// VLAN identifier, 0 when unset.
pub type VlanId = i32;

/// Everything discovered about a host's hardware in one inspection.
///
/// Replaced wholesale on re-inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HardwareDetails {
    pub system_vendor: SystemVendor,
    pub firmware: Firmware,
    pub ram_mebibytes: i64,
    #[serde(rename = "nics")]
    pub nics: Vec<Nic>,
    pub storage: Vec<Storage>,
    pub cpu: Cpu,
    pub hostname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemVendor {
    pub manufacturer: String,
    pub product_name: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Firmware {
    pub bios: Bios,
}

/// BIOS details. Any field the inspection did not report stays empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bios {
    pub date: String,
    pub vendor: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vlan {
    pub id: VlanId,
    pub name: String,
}

/// One network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Nic {
    pub name: String,
    /// Vendor and product, space separated.
    pub model: String,
    pub mac: String,
    /// IPv4 address when present, otherwise IPv6.
    pub ip: String,
    #[serde(rename = "vlans")]
    pub vlans: Vec<Vlan>,
    /// Untagged (native) VLAN.
    #[serde(rename = "vlanId")]
    pub vlan_id: VlanId,
    pub speed_gbps: i32,
    pub pxe: bool,
}

/// One disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Storage {
    pub name: String,
    pub rotational: bool,
    pub size_bytes: Capacity,
    pub vendor: String,
    pub model: String,
    pub serial_number: String,
    #[serde(rename = "wwn")]
    pub wwn: String,
    #[serde(rename = "wwnVendorExtension")]
    pub wwn_vendor_extension: String,
    #[serde(rename = "wwnWithExtension")]
    pub wwn_with_extension: String,
    #[serde(rename = "hctl")]
    pub hctl: String,
}

/// Processor summary. `flags` are kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cpu {
    pub arch: String,
    pub model: String,
    pub clock_megahertz: ClockSpeed,
    pub flags: Vec<String>,
    pub count: i32,
}
