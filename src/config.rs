use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::device::DeviceSettings;
use crate::mqtt::BrokerSettings;

const CONFIG_ENV: &str = "IOTSIM_CONFIG";
const CONFIG_DIR: &str = "iotsim";
const CONFIG_FILE: &str = "iotsim.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON in {field} of device {device}: {source}")]
    InvalidJson {
        device: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Device #{0} has no name")]
    MissingName(usize),

    #[error("Duplicate device name: {0}")]
    DuplicateName(String),

    #[error("Unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of the simulator's TOML file: one broker, any number of devices
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub devices: Vec<DeviceSettings>,
}

impl SimulatorConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate_names()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading simulator config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&content, path)?;
        debug!(
            "Loaded {} device(s) for broker {}:{}",
            config.devices.len(),
            config.broker.host,
            config.broker.port
        );
        Ok(config)
    }

    fn validate_names(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            let name = device
                .name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .ok_or(ConfigError::MissingName(index))?;
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateName(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Picks the config file: explicit argument, then `IOTSIM_CONFIG`, then the
/// user's config directory.
pub fn resolve_config_path(arg: Option<String>) -> PathBuf {
    if let Some(path) = arg {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}
