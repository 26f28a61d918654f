//! Device configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a device configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid device configuration: {0}")]
    Parse(String),

    #[error("Device label must not be empty")]
    EmptyLabel,
}

/// Per-link device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Human-readable link name used in log lines
    pub label: String,
    /// Whether the peer understands name-service announcements
    pub ns_supported: bool,
}

impl DeviceConfig {
    /// Parses a configuration from JSON
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values no device can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel);
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            label: "rpmsg".to_string(),
            ns_supported: true,
        }
    }
}
