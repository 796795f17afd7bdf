use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, PartialEq, Clone, Error)]
pub enum ConfigError {
    #[error("configuration is not valid YAML: {0}")]
    Yaml(String),
    #[error("unknown spec preset {0:?}")]
    UnknownPreset(String),
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecPreset {
    Mainnet,
    Minimal,
}

/// Node settings, loadable from YAML.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub preset: SpecPreset,
    pub genesis_time: u64,
    pub eth1_block_hash: String,
    pub validator_count: usize,
}

impl NodeConfig {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|error| ConfigError::Yaml(error.to_string()))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            preset: SpecPreset::Minimal,
            genesis_time: 0,
            eth1_block_hash: format!("0x{}", "42".repeat(32)),
            validator_count: 16,
        }
    }
}
