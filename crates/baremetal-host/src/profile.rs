//! Hardware profiles: named defaults for where the root filesystem goes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use thiserror::Error;

use crate::host::RootDeviceHints;

/// Profile used when nothing more specific is known.
pub const DEFAULT_PROFILE_NAME: &str = "unknown";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("no hardware profile named \"{0}\"")]
    NotFound(String),
}

/// Settings for a class of hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    /// Where to place the root filesystem unless the host overrides it.
    pub root_device_hints: RootDeviceHints,
}

impl Profile {
    fn by_device_name(name: &'static str, device_name: &str) -> Self {
        Self {
            name,
            root_device_hints: RootDeviceHints {
                device_name: device_name.to_string(),
                ..RootDeviceHints::default()
            },
        }
    }

    fn by_hctl(name: &'static str, hctl: &str) -> Self {
        Self {
            name,
            root_device_hints: RootDeviceHints {
                hctl: hctl.to_string(),
                ..RootDeviceHints::default()
            },
        }
    }
}

static PROFILES: LazyLock<BTreeMap<&'static str, Profile>> = LazyLock::new(|| {
    [
        Profile::by_device_name(DEFAULT_PROFILE_NAME, "/dev/sda"),
        Profile::by_device_name("libvirt", "/dev/vda"),
        Profile::by_hctl("dell", "0:0:0:0"),
        Profile::by_hctl("dell-raid", "0:2:0:0"),
        Profile::by_device_name("openstack", "/dev/vdb"),
    ]
    .into_iter()
    .map(|profile| (profile.name, profile))
    .collect()
});

/// Look up a profile by exact name.
///
/// There is no fallback here; callers that want one ask for
/// [`DEFAULT_PROFILE_NAME`] themselves.
///
/// # Errors
/// Returns [`ProfileError::NotFound`] for an unknown name.
pub fn get_profile(name: &str) -> Result<&'static Profile, ProfileError> {
    PROFILES
        .get(name)
        .ok_or_else(|| ProfileError::NotFound(name.to_string()))
}

/// Every known profile, ordered by name.
pub fn profiles() -> impl Iterator<Item = &'static Profile> {
    PROFILES.values()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_uses_first_disk() {
        let profile = get_profile(DEFAULT_PROFILE_NAME).unwrap();
        assert_eq!(profile.root_device_hints.device_name, "/dev/sda");
        assert!(profile.root_device_hints.hctl.is_empty());
    }

    #[test]
    fn test_named_profiles() {
        assert_eq!(
            get_profile("libvirt").unwrap().root_device_hints.device_name,
            "/dev/vda"
        );
        assert_eq!(get_profile("dell").unwrap().root_device_hints.hctl, "0:0:0:0");
        assert_eq!(
            get_profile("dell-raid").unwrap().root_device_hints.hctl,
            "0:2:0:0"
        );
        assert_eq!(
            get_profile("openstack").unwrap().root_device_hints.device_name,
            "/dev/vdb"
        );
    }

    #[test]
    fn test_unknown_name_has_no_fallback() {
        assert_eq!(
            get_profile("supermicro"),
            Err(ProfileError::NotFound("supermicro".to_string()))
        );
    }

    #[test]
    fn test_profiles_are_sorted() {
        let names: Vec<&str> = profiles().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["dell", "dell-raid", "libvirt", "openstack", "unknown"]
        );
    }
}
