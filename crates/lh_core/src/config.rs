//! Configuration for a local history workspace.

use crate::error::{HistoryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file inside the `.lh` directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Comprehensive configuration for a local history workspace.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Storage-related configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// History retention configuration.
    #[serde(default)]
    pub purge: PurgeConfig,
}

impl Config {
    /// Load configuration from `<lh_dir>/config.toml`, or defaults if absent.
    pub fn load(lh_dir: &Path) -> Result<Self> {
        let path = lh_dir.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| HistoryError::ConfigError(format!("failed to read config: {}", e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| HistoryError::ConfigError(format!("failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `<lh_dir>/config.toml`.
    pub fn save(&self, lh_dir: &Path) -> Result<()> {
        let path = lh_dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).map_err(|e| {
            HistoryError::ConfigError(format!("failed to serialize config: {}", e))
        })?;
        fs::write(&path, content)
            .map_err(|e| HistoryError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(1..=22).contains(&self.storage.compression_level) {
            return Err(HistoryError::ConfigError(format!(
                "compression_level must be between 1 and 22, got {}",
                self.storage.compression_level
            )));
        }
        Ok(())
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Compression level for zstd (1-22, default: 3).
    pub compression_level: i32,

    /// Largest file content (in bytes) that is captured. Anything bigger is
    /// recorded as unavailable content (default: 1 MiB).
    pub max_content_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            max_content_size: 1024 * 1024,
        }
    }
}

/// History retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurgeConfig {
    /// Change sets older than this many days are purged by
    /// `purge_with_config` (default: 5).
    pub retention_days: u32,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self { retention_days: 5 }
    }
}

impl PurgeConfig {
    /// Returns the retention period as a Duration.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days as u64 * 24 * 60 * 60)
    }
}
