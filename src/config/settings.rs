//! User configuration settings
//!
//! Layered configuration: defaults → config file → environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::ledger::RetentionHorizon;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Days a tracked deletion is kept before it is pruned (1-365)
    pub retention_days: u32,

    /// Upper bound for reading the reflog, in seconds
    pub reflog_timeout_secs: u64,

    /// Upper bound for every other git command, in seconds
    pub command_timeout_secs: u64,

    /// Flag the deletion history for cross-machine sync in the state file
    pub sync_history: bool,

    /// Path to the state file (defaults to the data directory)
    pub state_file: Option<PathBuf>,

    /// Tool passed to `git difftool` when inspecting a file.
    /// If unset, a plain `git diff` is printed instead.
    pub diff_tool: Option<String>,

    /// Enable debug logging
    pub debug: bool,

    /// Log file path (if set, logs to file instead of stderr)
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retention_days: RetentionHorizon::DEFAULT_DAYS,
            reflog_timeout_secs: 30,
            command_timeout_secs: 60,
            sync_history: true,
            state_file: None,
            diff_tool: None,
            debug: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration layered over a specific config file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // GIT_REVIVE_RETENTION_DAYS, GIT_REVIVE_DIFF_TOOL, ...
            .merge(Env::prefixed("GIT_REVIVE_"))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values outside their documented ranges
    pub fn validate(&self) -> Result<()> {
        RetentionHorizon::new(self.retention_days)?;

        if self.reflog_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reflog_timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            }
            .into());
        }

        if self.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "command_timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// The configured retention horizon, clamped into range
    pub fn retention(&self) -> RetentionHorizon {
        RetentionHorizon::clamped(self.retention_days)
    }

    pub fn reflog_timeout(&self) -> Duration {
        Duration::from_secs(self.reflog_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the state file path, honoring the `state_file` override
    pub fn state_file_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("state.json")),
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|_e| {
                Error::Config(ConfigError::DirectoryCreationFailed(parent.to_path_buf()))
            })?;
        }

        let toml =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        std::fs::write(config_path, toml).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "git-revive", "git-revive").ok_or_else(|| {
            Error::Config(ConfigError::LoadFailed(
                "Could not determine home directory".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retention_days, 90);
        assert_eq!(config.reflog_timeout_secs, 30);
        assert!(config.sync_history);
        assert!(config.diff_tool.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("retention_days"));
        assert!(toml.contains("90"));
    }

    #[test]
    fn test_retention_out_of_range_rejected() {
        let mut config = Config::default();
        config.retention_days = 0;
        assert!(config.validate().is_err());

        config.retention_days = 366;
        assert!(config.validate().is_err());

        config.retention_days = 365;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_layers_over_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "retention_days = 14\ndiff_tool = \"meld\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.diff_tool.as_deref(), Some("meld"));
        assert_eq!(config.reflog_timeout_secs, 30);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retention_days = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.retention_days, 7);
    }
}
