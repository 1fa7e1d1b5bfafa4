use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::mdns::MdnsConfig;
use crate::interface::InterfaceChoice;

/// Main configuration structure for Ferrous mDNS
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Protocol engine configuration
    pub mdns: MdnsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-mdns.toml in current directory
    /// 3. /etc/ferrous-mdns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("ferrous-mdns.toml").exists() {
            Self::from_file("ferrous-mdns.toml")?
        } else if std::path::Path::new("/etc/ferrous-mdns/config.toml").exists() {
            Self::from_file("/etc/ferrous-mdns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(interfaces) = overrides.interfaces {
            self.mdns.interfaces = interfaces;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mdns.validate().map_err(ConfigError::Validation)
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub interfaces: Option<InterfaceChoice>,
}
