//! Configuration management for cloudpoll
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with one table per operation kind.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use super::retry::RetryConfig;
use crate::operation::{OperationKind, PollSettings};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Poll setting overrides, keyed by operation kind name (`volume_detach`, ...)
    #[serde(default)]
    pub polling: BTreeMap<String, PollSettings>,
    /// Retry policy for cluster creation
    #[serde(default)]
    pub cluster_retry: RetryConfig,
}

impl Config {
    /// Settings for `kind`: the configured override, else the kind's default
    pub fn poll_settings(&self, kind: OperationKind) -> PollSettings {
        self.polling
            .get(kind.as_str())
            .copied()
            .unwrap_or_else(|| kind.default_settings())
    }

    /// Set or replace the override for `kind`
    pub fn set_poll_settings(&mut self, kind: OperationKind, settings: PollSettings) {
        self.polling.insert(kind.as_str().to_string(), settings);
    }

    /// Effective settings for every known kind, in catalogue order
    pub fn effective_settings(&self) -> Vec<(OperationKind, PollSettings)> {
        OperationKind::ALL
            .iter()
            .map(|kind| (*kind, self.poll_settings(*kind)))
            .collect()
    }

    /// Reject settings the poller cannot run with
    pub fn validate(&self) -> Result<()> {
        for (kind, settings) in &self.polling {
            if !OperationKind::ALL.iter().any(|k| k.as_str() == kind) {
                return Err(ConfigError::InvalidSettings {
                    kind: kind.clone(),
                    reason: "unknown operation kind".to_string(),
                });
            }
            if settings.interval.is_zero() {
                return Err(ConfigError::InvalidSettings {
                    kind: kind.clone(),
                    reason: "interval_secs must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        // Expand environment variables in the config content
        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, ~/.config/cloudpoll/config.toml is preferred when it exists,
    /// falling back to ~/Library/Application Support/io.cloudpoll.cloudpoll/config.toml.
    ///
    /// On Linux: ~/.config/cloudpoll/config.toml
    /// On Windows: %APPDATA%\cloudpoll\cloudpoll\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("cloudpoll")
                    .join("config.toml");

                if linux_style_path
                    .parent()
                    .map(|p| p.exists())
                    .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("io", "cloudpoll", "cloudpoll").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default}. Unset variables are left as-is.
    ///
    /// ```toml
    /// [polling.instance_stop]
    /// timeout_secs = ${RDS_STOP_TIMEOUT:-3600}
    /// interval_secs = 60
    /// ```
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    #[test]
    fn test_default_config_uses_catalogue() {
        let config = Config::default();
        for kind in OperationKind::ALL {
            assert_eq!(config.poll_settings(kind), kind.default_settings());
        }
        assert_eq!(config.cluster_retry, RetryConfig::default());
    }

    #[test]
    fn test_override_applies_to_one_kind_only() {
        let toml = r#"
[polling.volume_detach]
timeout_secs = 600
interval_secs = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.poll_settings(OperationKind::VolumeDetach),
            PollSettings::from_secs(600, 10)
        );
        assert_eq!(
            config.poll_settings(OperationKind::VolumeAttach),
            OperationKind::VolumeAttach.default_settings()
        );
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_poll_settings(OperationKind::InstanceStop, PollSettings::from_secs(1800, 30));
        config.cluster_retry.delay_secs = 120;

        let serialized = toml::to_string_pretty(&config).unwrap();
        assert!(serialized.contains("[polling.instance_stop]"));
        assert!(serialized.contains("interval_secs = 30"));

        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.set_poll_settings(
            OperationKind::SnapshotCreate,
            PollSettings::new(Duration::from_secs(60), Duration::ZERO),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("snapshot_create"));
    }

    #[test]
    fn test_zero_timeout_is_allowed() {
        let mut config = Config::default();
        config.set_poll_settings(OperationKind::VolumeAttach, PollSettings::from_secs(0, 5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_kind() {
        let config: Config = toml::from_str(
            r#"
[polling.volume_detatch]
timeout_secs = 60
interval_secs = 5
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("volume_detatch"));
        assert!(err.to_string().contains("unknown operation kind"));
    }

    #[test]
    #[serial]
    fn test_env_var_expansion() {
        unsafe {
            std::env::set_var("CLOUDPOLL_TEST_TIMEOUT", "900");
        }
        let content = "timeout_secs = ${CLOUDPOLL_TEST_TIMEOUT}";
        assert_eq!(Config::expand_env_vars(content), "timeout_secs = 900");
        unsafe {
            std::env::remove_var("CLOUDPOLL_TEST_TIMEOUT");
        }
    }

    #[test]
    fn test_env_var_expansion_with_defaults() {
        let content = "interval_secs = ${CLOUDPOLL_TEST_UNSET_INTERVAL:-15}";
        assert_eq!(Config::expand_env_vars(content), "interval_secs = 15");
    }

    #[test]
    fn test_effective_settings_covers_all_kinds() {
        let effective = Config::default().effective_settings();
        assert_eq!(effective.len(), OperationKind::ALL.len());
        assert_eq!(effective[0].0, OperationKind::VolumeAttach);
    }
}
