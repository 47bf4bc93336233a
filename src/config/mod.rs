// ABOUTME: Configuration types and parsing for canarist.yml.
// ABOUTME: Names the target cluster/service, canary settings and phase timeouts.

mod canary;

pub use canary::CanaryConfig;

use crate::error::{Error, Result};
use crate::timeout::TimeoutConfig;
use crate::types::ServiceName;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "canarist.yml";
pub const CONFIG_FILENAME_ALT: &str = "canarist.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".canarist/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub cluster: String,

    pub service: ServiceName,

    #[serde(default)]
    pub canary: CanaryConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Config {
    pub fn new(cluster: impl Into<String>, service: ServiceName) -> Self {
        Config {
            cluster: cluster.into(),
            service,
            canary: CanaryConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first configuration file found in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.cluster.trim().is_empty() {
            return Err(Error::InvalidConfig("cluster cannot be empty".to_string()));
        }
        if self.canary.task_group.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "canary.task_group cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
