//! Configuration settings for leadsync.
//!
//! Settings are loaded from `~/.leadsync/config.yaml`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::SyncError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Remote authority settings.
    pub remote: RemoteConfig,
    /// Reachability probe settings.
    pub connectivity: ConnectivityConfig,
    /// Reconciliation pass settings.
    pub sync: SyncSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
}

/// Remote authority settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote authority's sync API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with push and pull requests.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Reachability probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Stable external endpoint used as the reachability target.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    /// Probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
    /// How often the connectivity watcher re-probes, in seconds.
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
}

/// Reconciliation pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Maximum items pushed per pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Transient failures after which an item goes dormant.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause between consecutive pushes, in milliseconds.
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
    /// Auto-sync period in minutes.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Days synced items are kept before `clear` removes them.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Start a pass after each enqueue when online and idle.
    #[serde(default = "default_true")]
    pub trigger_on_enqueue: bool,
    /// Upper bound for one push, in seconds.
    #[serde(default = "default_remote_timeout")]
    pub push_timeout_secs: u64,
    /// Upper bound for one pull, in seconds.
    #[serde(default = "default_remote_timeout")]
    pub pull_timeout_secs: u64,
}

// Default value functions for serde
const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_probe_url() -> String {
    "https://www.google.com/generate_204".to_string()
}

const fn default_remote_timeout() -> u64 {
    30
}

const fn default_probe_timeout() -> u64 {
    5
}

const fn default_watch_interval() -> u64 {
    30
}

const fn default_batch_size() -> usize {
    50
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_item_delay_ms() -> u64 {
    100
}

const fn default_interval_minutes() -> u64 {
    5
}

const fn default_retention_days() -> u32 {
    30
}

const fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: default_probe_url(),
            timeout_secs: default_probe_timeout(),
            watch_interval_secs: default_watch_interval(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            item_delay_ms: default_item_delay_ms(),
            interval_minutes: default_interval_minutes(),
            retention_days: default_retention_days(),
            trigger_on_enqueue: default_true(),
            push_timeout_secs: default_remote_timeout(),
            pull_timeout_secs: default_remote_timeout(),
        }
    }
}

impl SyncSettings {
    /// Pause inserted between two pushes of the same pass.
    #[must_use]
    pub const fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    #[must_use]
    pub const fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    #[must_use]
    pub const fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.pull_timeout_secs)
    }
}

impl ConnectivityConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, SyncError> {
        let paths = Paths::new()?;
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            SyncError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), SyncError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| SyncError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            SyncError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
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

        assert_eq!(config.general.default_output, OutputFormat::Pretty);
        assert_eq!(config.sync.batch_size, 50);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.item_delay(), Duration::from_millis(100));
        assert_eq!(config.connectivity.timeout(), Duration::from_secs(5));
        assert!(config.sync.trigger_on_enqueue);
        assert!(config.remote.auth_token.is_none());
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.sync.interval_minutes, 5);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut config = Config::default();
        config.sync.max_retries = 5;
        config.remote.base_url = "https://crm.example.com/api".to_string();

        config.save_to_path(&config_path).unwrap();
        let loaded = Config::load_from_path(&config_path).unwrap();

        assert_eq!(loaded.sync.max_retries, 5);
        assert_eq!(loaded.remote.base_url, "https://crm.example.com/api");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let partial_yaml = r"
sync:
  batch_size: 10
  pull_timeout_secs: 12
";
        std::fs::write(&config_path, partial_yaml).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(config.sync.batch_size, 10);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.pull_timeout(), Duration::from_secs(12));
        assert_eq!(config.sync.push_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_malformed_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "sync: [not, a, map]").unwrap();

        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
