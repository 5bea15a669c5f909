//! Optional YAML configuration.
//!
//! Everything has a sensible default; a config file only needs the fields
//! it wants to override:
//!
//! ```yaml
//! serial:
//!   baud_rate: 57600
//! staleness_ms: 45000
//! ```

use std::path::Path;
use std::time::Duration;

use relaylink_engine::{EngineConfig, HeartbeatConfig, SerialSettings};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid YAML for this schema.
    #[error("unable to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Console configuration file schema.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Serial port settings.
    pub serial: SerialSettings,
    /// Heartbeat scan interval in milliseconds.
    pub heartbeat_period_ms: Option<u64>,
    /// Node staleness threshold in milliseconds.
    pub staleness_ms: Option<u64>,
}

impl ConsoleConfig {
    /// Load and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Convert to engine configuration, filling gaps with defaults.
    pub fn engine_config(&self) -> EngineConfig {
        let defaults = HeartbeatConfig::default();
        EngineConfig {
            serial: self.serial.clone(),
            heartbeat: HeartbeatConfig {
                period: self
                    .heartbeat_period_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.period),
                staleness: self
                    .staleness_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.staleness),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ConsoleConfig = serde_yaml::from_str("{}").unwrap();
        let engine = config.engine_config();
        assert_eq!(engine.serial, SerialSettings::default());
        assert_eq!(engine.heartbeat, HeartbeatConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config: ConsoleConfig = serde_yaml::from_str(
            "serial:\n  baud_rate: 57600\nstaleness_ms: 45000\n",
        )
        .unwrap();
        let engine = config.engine_config();
        assert_eq!(engine.serial.baud_rate, 57_600);
        assert_eq!(engine.serial.data_bits, 8);
        assert_eq!(engine.heartbeat.staleness, Duration::from_millis(45_000));
        assert_eq!(engine.heartbeat.period, HeartbeatConfig::default().period);
    }
}
