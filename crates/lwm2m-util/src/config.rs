//! Object manager configuration
//!
//! Capacities are fixed for the lifetime of a manager: the slot arena is
//! allocated once from these values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{UtilError, UtilResult};

/// Configuration for an [`ObjectManager`](crate::ObjectManager)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilConfig {
    /// Satellite object instances tracked per gateway instance
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// Gateway instances (slot tables) that can be managed
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,
    /// Unmanaged creates below this instance id are rejected; the range is
    /// reserved for gateway-managed instances
    #[serde(default)]
    pub legacy_instance_offset: u16,
    /// Publish a lifecycle event after each successful creation
    #[serde(default = "default_true")]
    pub broadcast_on_create: bool,
    /// Resource value persistence
    #[serde(default)]
    pub config_data: ConfigDataConfig,
}

fn default_max_nodes() -> usize {
    8
}

fn default_max_instances() -> usize {
    16
}

fn default_true() -> bool {
    true
}

impl Default for UtilConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_instances: default_max_instances(),
            legacy_instance_offset: 0,
            broadcast_on_create: true,
            config_data: ConfigDataConfig::default(),
        }
    }
}

impl UtilConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> UtilResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> UtilResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| UtilError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> UtilResult<()> {
        if self.max_nodes == 0 {
            return Err(UtilError::Config("max_nodes must be at least 1".into()));
        }
        if self.max_instances == 0 {
            return Err(UtilError::Config("max_instances must be at least 1".into()));
        }
        if self.config_data.max_size == 0 {
            return Err(UtilError::Config(
                "config_data.max_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where and how much resource configuration is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDataConfig {
    /// Directory holding one file per persisted resource
    #[serde(default = "default_config_dir")]
    pub directory: PathBuf,
    /// Largest value that can be saved or loaded, in bytes
    #[serde(default = "default_config_max_size")]
    pub max_size: usize,
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("lwm2m_cfg")
}

fn default_config_max_size() -> usize {
    256
}

impl Default for ConfigDataConfig {
    fn default() -> Self {
        Self {
            directory: default_config_dir(),
            max_size: default_config_max_size(),
        }
    }
}
