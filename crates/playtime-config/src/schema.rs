//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Steam installation root (the directory containing `steamapps`)
    pub steam_path: PathBuf,

    /// Polling settings
    #[serde(default)]
    pub watcher: RawWatcherConfig,

    /// Playtime store settings
    #[serde(default)]
    pub store: RawStoreConfig,

    /// Catalog scanning settings
    #[serde(default)]
    pub catalog: RawCatalogConfig,
}

/// Watcher cadence
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWatcherConfig {
    /// Seconds between process scans (default: 1)
    pub poll_interval_secs: Option<u64>,

    /// Seconds to wait after a failed scan before the next one (default: 1)
    pub error_backoff_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStoreConfig {
    /// Directory holding playtime.json
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCatalogConfig {
    /// Extra executable names never treated as games
    #[serde(default)]
    pub exe_blacklist: Vec<String>,
}
