//! Configuration for oncecall.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::{CacheStore, SnapshotFormat};
use crate::memoize::KwargsOrder;
use crate::CacheResult;

/// Main configuration for oncecall.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Persisted store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Cache key settings.
    #[serde(default)]
    pub keys: KeysConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Persisted store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Snapshot file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Layout used when writing snapshots.
    #[serde(default)]
    pub format: SnapshotFormat,

    /// Start with an empty store when the snapshot file does not exist.
    #[serde(default = "default_true")]
    pub allow_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            format: SnapshotFormat::default(),
            allow_missing: true,
        }
    }
}

impl StoreConfig {
    /// Loads the configured snapshot.
    pub fn open(&self) -> CacheResult<CacheStore> {
        CacheStore::load_from_path(&self.path, self.allow_missing)
    }

    /// Writes `store` to the configured snapshot.
    pub fn save(&self, store: &CacheStore) -> CacheResult<()> {
        store.save_to_path_as(&self.path, self.format)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".oncecall/cache.json")
}

fn default_true() -> bool {
    true
}

/// Cache key settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Whether keyword argument order is part of the key.
    #[serde(default)]
    pub kwargs_order: KwargsOrder,
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CacheResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Tries to load configuration from the current directory or uses default.
    pub fn load_or_default() -> Self {
        Self::load("oncecall.toml").unwrap_or_else(|_| Self::default_config())
    }

    /// Key policy selected by `[keys]`.
    pub fn key_policy(&self) -> KwargsOrder {
        self.keys.kwargs_order
    }
}
