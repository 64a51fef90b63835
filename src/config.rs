use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DeployError, DeployResult};
use crate::health::RetryPolicy;

/// Optional YAML file with answers to the interactive prompts.
///
/// ```yaml
/// repo: https://github.com/acme/shop.git
/// branch: main
/// ssh_user: deploy
/// ssh_host: 203.0.113.10
/// ssh_key: ~/.ssh/id_ed25519
/// app_port: 3000
/// health:
///   attempts: 20
///   interval_secs: 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub ssh_user: Option<String>,
    pub ssh_host: Option<String>,
    pub ssh_key: Option<String>,
    pub app_port: Option<u32>,
    pub workdir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub health: HealthConfig,
}

/// Polling of the application after it is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    pub attempts: u32,
    pub interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            interval_secs: policy.interval.as_secs(),
        }
    }
}

impl HealthConfig {
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.interval_secs))
    }
}

impl DeployConfig {
    pub fn from_yaml(content: &str) -> DeployResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        if config.health.attempts == 0 {
            return Err(DeployError::invalid("health.attempts", "must be at least 1"));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> DeployResult<Self> {
        if !path.is_file() {
            return Err(DeployError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
