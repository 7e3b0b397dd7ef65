//! TOML configuration with environment overrides
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::role_chain::RoleChains;

pub const ENV_DB_PATH: &str = "SITE_APPROVALS_DB_PATH";
pub const ENV_MAX_COMMIT_ATTEMPTS: &str = "SITE_APPROVALS_MAX_COMMIT_ATTEMPTS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub store: StoreConfig,
    pub engine: EngineConfig,
    pub chains: ChainConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub flush_on_commit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Total load/compute/commit attempts before giving up on a contended document.
    pub max_commit_attempts: u32,
}

/// Approver role codes (or titles) per request kind, first approver first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub material_request: Vec<String>,
    pub manpower_request: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("site-approvals.db"),
            flush_on_commit: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        let standard = vec!["PM".to_string(), "AM".to_string(), "CEO".to_string()];
        Self {
            material_request: standard.clone(),
            manpower_request: standard,
        }
    }
}

impl WorkflowConfig {
    /// Read `path`, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env_overrides<F>(&mut self, read: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| read(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = lookup(ENV_DB_PATH) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_MAX_COMMIT_ATTEMPTS) {
            self.engine.max_commit_attempts =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvOverride {
                        key: ENV_MAX_COMMIT_ATTEMPTS.to_string(),
                        value: value.clone(),
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("store.path must not be empty".into()));
        }
        if self.engine.max_commit_attempts == 0 {
            return Err(ConfigError::Validation(
                "engine.max_commit_attempts must be at least 1".into(),
            ));
        }
        RoleChains::from_config(&self.chains)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = WorkflowConfig::from_toml_str("").unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = WorkflowConfig::from_toml_str(
            r#"
            [engine]
            max_commit_attempts = 5

            [chains]
            manpower_request = ["Project Manager", "Area Manager"]
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.max_commit_attempts, 5);
        assert_eq!(config.chains.manpower_request.len(), 2);
        assert_eq!(config.chains.material_request.len(), 3);
        assert!(config.store.flush_on_commit);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = WorkflowConfig::default();
        config
            .apply_env_overrides(|key| match key {
                ENV_DB_PATH => Some("/var/lib/approvals.db".into()),
                ENV_MAX_COMMIT_ATTEMPTS => Some("7".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.store.path, PathBuf::from("/var/lib/approvals.db"));
        assert_eq!(config.engine.max_commit_attempts, 7);

        let err = config
            .apply_env_overrides(|key| (key == ENV_MAX_COMMIT_ATTEMPTS).then(|| "many".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvOverride { .. }));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = WorkflowConfig::default();
        config.engine.max_commit_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = WorkflowConfig::default();
        config.chains.material_request = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = WorkflowConfig::load(Path::new("/nonexistent/site-approvals.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
