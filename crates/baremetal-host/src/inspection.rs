//! Normalization of raw introspection payloads into [`HardwareDetails`].
//!
//! The payload comes from the inspection agent and is only loosely
//! structured: `inventory` is typed, while `extra` holds free-form sections
//! whose fields may or may not be present. Missing data never fails the
//! conversion; the corresponding field is left at its zero value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::host::hardware::{
    Bios, ClockSpeed, Cpu, Firmware, HardwareDetails, Nic, Storage, SystemVendor, Vlan, VlanId,
    GIGAHERTZ,
};

/// One free-form `extra` entry, e.g. the data for a single NIC.
pub type ExtraHardwareData = Map<String, Value>;

/// A free-form `extra` section, keyed by component name.
pub type ExtraHardwareDataSection = BTreeMap<String, ExtraHardwareData>;

/// Raw introspection payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectionData {
    pub inventory: Inventory,
    /// Per-interface data keyed by interface name.
    pub all_interfaces: BTreeMap<String, BaseInterface>,
    pub extra: ExtraData,
    pub memory_mb: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub interfaces: Vec<Interface>,
    pub disks: Vec<Disk>,
    pub cpu: CpuInfo,
    pub system_vendor: SystemVendorInfo,
    pub hostname: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Interface {
    pub name: String,
    pub vendor: String,
    pub product: String,
    pub mac_address: String,
    pub ipv4_address: String,
    pub ipv6_address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseInterface {
    pub pxe: bool,
    /// Processed LLDP neighbour data, absent when LLDP was not collected.
    pub lldp_processed: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Disk {
    pub name: String,
    pub rotational: bool,
    pub size: i64,
    pub vendor: String,
    pub model: String,
    pub serial: String,
    pub wwn: String,
    pub wwn_vendor_extension: String,
    pub wwn_with_extension: String,
    pub hctl: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuInfo {
    pub architecture: String,
    pub model_name: String,
    /// Free text such as `2400.000` or `2.4 GHz`.
    pub frequency: String,
    pub count: i32,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemVendorInfo {
    pub manufacturer: String,
    pub product_name: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraData {
    pub firmware: ExtraHardwareDataSection,
    pub network: ExtraHardwareDataSection,
}

/// Convert an introspection payload into the canonical inventory.
#[must_use]
pub fn get_hardware_details(data: &IntrospectionData) -> HardwareDetails {
    HardwareDetails {
        system_vendor: system_vendor_details(&data.inventory.system_vendor),
        firmware: firmware_details(&data.extra.firmware),
        ram_mebibytes: data.memory_mb,
        nics: nic_details(
            &data.inventory.interfaces,
            &data.all_interfaces,
            &data.extra.network,
        ),
        storage: data.inventory.disks.iter().map(storage_details).collect(),
        cpu: cpu_details(&data.inventory.cpu),
        hostname: data.inventory.hostname.clone(),
    }
}

fn system_vendor_details(vendor: &SystemVendorInfo) -> SystemVendor {
    SystemVendor {
        manufacturer: vendor.manufacturer.clone(),
        product_name: vendor.product_name.clone(),
        serial_number: vendor.serial_number.clone(),
    }
}

fn firmware_details(firmware: &ExtraHardwareDataSection) -> Firmware {
    let field = |bios: &ExtraHardwareData, key: &str| {
        bios.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let bios = firmware
        .get("bios")
        .map(|bios| Bios {
            date: field(bios, "date"),
            vendor: field(bios, "vendor"),
            version: field(bios, "version"),
        })
        .unwrap_or_default();

    Firmware { bios }
}

fn nic_details(
    interfaces: &[Interface],
    base: &BTreeMap<String, BaseInterface>,
    network: &ExtraHardwareDataSection,
) -> Vec<Nic> {
    interfaces
        .iter()
        .map(|intf| {
            let base_intf = base.get(&intf.name);
            let (vlans, vlan_id) = base_intf
                .and_then(|b| b.lldp_processed.as_ref())
                .map(vlans_from_lldp)
                .unwrap_or_default();

            let ip = if intf.ipv4_address.is_empty() {
                intf.ipv6_address.clone()
            } else {
                intf.ipv4_address.clone()
            };

            Nic {
                name: intf.name.clone(),
                model: format!("{} {}", intf.vendor, intf.product)
                    .trim_start_matches(' ')
                    .to_string(),
                mac: intf.mac_address.clone(),
                ip,
                vlans,
                vlan_id,
                speed_gbps: network.get(&intf.name).map_or(0, nic_speed_gbps),
                pxe: base_intf.is_some_and(|b| b.pxe),
            }
        })
        .collect()
}

fn vlans_from_lldp(lldp: &Map<String, Value>) -> (Vec<Vlan>, VlanId) {
    let vlans = lldp
        .get("switch_port_vlans")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| Vlan {
                    id: entry.get("id").and_then(as_vlan_id).unwrap_or_default(),
                    name: entry
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let untagged = lldp
        .get("switch_port_untagged_vlan_id")
        .and_then(as_vlan_id)
        .unwrap_or_default();

    (vlans, untagged)
}

fn as_vlan_id(value: &Value) -> Option<VlanId> {
    value.as_i64().and_then(|id| VlanId::try_from(id).ok())
}

/// Link speed, only when reported in whole gigabits (`"10Gbps"`).
fn nic_speed_gbps(extra: &ExtraHardwareData) -> i32 {
    extra
        .get("speed")
        .and_then(Value::as_str)
        .filter(|speed| speed.ends_with("Gbps"))
        .and_then(|speed| leading_number(speed).split('.').next()?.parse().ok())
        .unwrap_or_default()
}

fn storage_details(disk: &Disk) -> Storage {
    Storage {
        name: disk.name.clone(),
        rotational: disk.rotational,
        size_bytes: disk.size,
        vendor: disk.vendor.clone(),
        model: disk.model.clone(),
        serial_number: disk.serial.clone(),
        wwn: disk.wwn.clone(),
        wwn_vendor_extension: disk.wwn_vendor_extension.clone(),
        wwn_with_extension: disk.wwn_with_extension.clone(),
        hctl: disk.hctl.clone(),
    }
}

fn cpu_details(cpu: &CpuInfo) -> Cpu {
    let mut flags = cpu.flags.clone();
    flags.sort_unstable();

    Cpu {
        arch: cpu.architecture.clone(),
        model: cpu.model_name.clone(),
        clock_megahertz: clock_megahertz(&cpu.frequency),
        flags,
        count: cpu.count,
    }
}

/// Parse a free-text frequency into megahertz. Unparsable text is 0.
fn clock_megahertz(frequency: &str) -> ClockSpeed {
    let Ok(value) = leading_number(frequency).parse::<ClockSpeed>() else {
        return 0.0;
    };
    if frequency.to_ascii_lowercase().contains("ghz") {
        value * GIGAHERTZ
    } else {
        value
    }
}

/// The numeric prefix of `text`, after leading whitespace.
fn leading_number(text: &str) -> &str {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(text.len(), |(i, _)| i);
    &text[..end]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_payload() -> IntrospectionData {
        serde_json::from_value(json!({
            "inventory": {
                "hostname": "node-0",
                "system_vendor": {
                    "manufacturer": "Dell Inc.",
                    "product_name": "PowerEdge R640",
                    "serial_number": "ABC1234"
                },
                "cpu": {
                    "architecture": "x86_64",
                    "model_name": "Intel(R) Xeon(R) Gold 6130",
                    "frequency": "2.10 GHz",
                    "count": 32,
                    "flags": ["vmx", "aes", "sse4_2", "avx"]
                },
                "interfaces": [
                    {
                        "name": "eth0",
                        "vendor": "0x8086",
                        "product": "0x1572",
                        "mac_address": "00:11:22:33:44:55",
                        "ipv4_address": "192.168.111.20",
                        "ipv6_address": "fe80::1"
                    },
                    {
                        "name": "eth1",
                        "vendor": "",
                        "product": "virtio",
                        "mac_address": "00:11:22:33:44:56",
                        "ipv6_address": "fd00::20"
                    }
                ],
                "disks": [
                    {
                        "name": "/dev/sda",
                        "rotational": true,
                        "size": 1_000_000_000_000_i64,
                        "vendor": "ATA",
                        "model": "ST1000",
                        "serial": "Z1D0",
                        "wwn": "0x5000c500",
                        "hctl": "0:0:0:0"
                    }
                ]
            },
            "all_interfaces": {
                "eth0": {
                    "pxe": true,
                    "lldp_processed": {
                        "switch_port_vlans": [
                            {"id": 100, "name": "prov"},
                            {"id": 200, "name": "ext"}
                        ],
                        "switch_port_untagged_vlan_id": 100
                    }
                },
                "eth1": { "pxe": false }
            },
            "extra": {
                "firmware": {
                    "bios": { "vendor": "Dell Inc.", "version": "2.1.8" }
                },
                "network": {
                    "eth0": { "speed": "25Gbps" },
                    "eth1": { "speed": "1000Mbps" }
                }
            },
            "memory_mb": 196_608
        }))
        .unwrap()
    }

    #[test]
    fn test_full_payload() {
        let details = get_hardware_details(&sample_payload());

        assert_eq!(details.hostname, "node-0");
        assert_eq!(details.ram_mebibytes, 196_608);
        assert_eq!(details.system_vendor.product_name, "PowerEdge R640");

        assert_eq!(details.firmware.bios.vendor, "Dell Inc.");
        assert_eq!(details.firmware.bios.version, "2.1.8");
        assert!(details.firmware.bios.date.is_empty());

        assert_eq!(details.storage.len(), 1);
        assert_eq!(details.storage[0].serial_number, "Z1D0");
        assert_eq!(details.storage[0].size_bytes, 1_000_000_000_000);
        assert_eq!(details.storage[0].hctl, "0:0:0:0");

        assert!((details.cpu.clock_megahertz - 2100.0).abs() < 1e-6);
        assert_eq!(details.cpu.count, 32);
    }

    #[test]
    fn test_nic_ip_prefers_ipv4() {
        let details = get_hardware_details(&sample_payload());
        assert_eq!(details.nics[0].ip, "192.168.111.20");
        assert_eq!(details.nics[1].ip, "fd00::20");
    }

    #[test]
    fn test_nic_model_and_speed() {
        let details = get_hardware_details(&sample_payload());
        assert_eq!(details.nics[0].model, "0x8086 0x1572");
        assert_eq!(details.nics[1].model, "virtio");
        assert_eq!(details.nics[0].speed_gbps, 25);
        assert_eq!(details.nics[1].speed_gbps, 0);
    }

    #[test]
    fn test_nic_vlans_and_pxe() {
        let details = get_hardware_details(&sample_payload());
        let eth0 = &details.nics[0];
        assert!(eth0.pxe);
        assert_eq!(eth0.vlan_id, 100);
        assert_eq!(
            eth0.vlans,
            vec![
                Vlan { id: 100, name: "prov".into() },
                Vlan { id: 200, name: "ext".into() },
            ]
        );

        let eth1 = &details.nics[1];
        assert!(!eth1.pxe);
        assert!(eth1.vlans.is_empty());
        assert_eq!(eth1.vlan_id, 0);
    }

    #[test]
    fn test_cpu_flags_sorted_and_idempotent() {
        let payload = sample_payload();
        let first = get_hardware_details(&payload);
        let second = get_hardware_details(&payload);

        assert_eq!(first.cpu.flags, vec!["aes", "avx", "sse4_2", "vmx"]);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(payload.inventory.cpu.flags[0], "vmx");
    }

    #[test]
    fn test_empty_payload() {
        let details = get_hardware_details(&IntrospectionData::default());
        assert_eq!(details, HardwareDetails::default());
    }

    #[test]
    fn test_clock_megahertz() {
        assert!((clock_megahertz("2400.000") - 2400.0).abs() < 1e-6);
        assert!((clock_megahertz("3.5GHz") - 3500.0).abs() < 1e-6);
        assert!((clock_megahertz("2.4 ghz") - 2400.0).abs() < 1e-6);
        assert!((clock_megahertz(" 1800 MHz") - 1800.0).abs() < 1e-6);
        assert!(clock_megahertz("fast").abs() < 1e-6);
        assert!(clock_megahertz("").abs() < 1e-6);
    }

    #[test]
    fn test_nic_speed_requires_gbps() {
        let extra = |speed: &str| {
            let mut map = ExtraHardwareData::new();
            map.insert("speed".into(), Value::from(speed));
            map
        };
        assert_eq!(nic_speed_gbps(&extra("10Gbps")), 10);
        assert_eq!(nic_speed_gbps(&extra("100 Gbps")), 100);
        assert_eq!(nic_speed_gbps(&extra("1000Mbps")), 0);
        assert_eq!(nic_speed_gbps(&ExtraHardwareData::new()), 0);
    }
}
