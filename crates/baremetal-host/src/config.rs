//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Annotation that suspends reconciliation of a host while present.
pub const PAUSED_ANNOTATION: &str = "baremetalhost.metal3.io/paused";

/// Tunables for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// How often steady-state hosts re-check their power state.
    pub power_check_interval_secs: u64,

    /// Delay before retrying a host whose credentials secret is missing.
    pub host_error_retry_secs: u64,

    /// Delay before looking at a paused host again.
    pub paused_requeue_secs: u64,

    /// Finalizer the engine keeps on hosts it manages.
    pub finalizer: String,

    /// Label mirroring the matched hardware profile.
    pub hardware_profile_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            power_check_interval_secs: 60,
            host_error_retry_secs: 10,
            paused_requeue_secs: 60,
            finalizer: "baremetalhost.metal3.io".to_string(),
            hardware_profile_label: "metal3.io/hardwareprofile".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file. Missing fields keep their
    /// defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration fails [`EngineConfig::validate`].
    pub fn from_file(config_path: &str) -> Result<Self, anyhow::Error> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {config_path}: {e}"))?;

        let config: EngineConfig = serde_yaml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {e}"))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.power_check_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "powerCheckIntervalSecs must be greater than zero"
            ));
        }
        if self.host_error_retry_secs == 0 {
            return Err(anyhow::anyhow!("hostErrorRetrySecs must be greater than zero"));
        }
        if self.finalizer.trim().is_empty() {
            return Err(anyhow::anyhow!("finalizer must not be empty"));
        }
        if self.hardware_profile_label.trim().is_empty() {
            return Err(anyhow::anyhow!("hardwareProfileLabel must not be empty"));
        }
        Ok(())
    }

    #[must_use]
    pub fn power_check_interval(&self) -> Duration {
        Duration::from_secs(self.power_check_interval_secs)
    }

    #[must_use]
    pub fn host_error_retry(&self) -> Duration {
        Duration::from_secs(self.host_error_retry_secs)
    }

    #[must_use]
    pub fn paused_requeue(&self) -> Duration {
        Duration::from_secs(self.paused_requeue_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.power_check_interval(), Duration::from_secs(60));
        assert_eq!(config.host_error_retry(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_file_merges_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "powerCheckIntervalSecs: 15").unwrap();
        writeln!(file, "finalizer: hosts.example.com").unwrap();

        let config = EngineConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.power_check_interval_secs, 15);
        assert_eq!(config.finalizer, "hosts.example.com");
        assert_eq!(config.paused_requeue_secs, 60);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = EngineConfig {
            power_check_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let err = EngineConfig::from_file("/nonexistent/engine.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
