//! Validated settings structures

use crate::schema::RawConfig;
use playtime_util::default_data_dir;
use std::path::PathBuf;
use std::time::Duration;

/// Validated settings ready for use by the watcher and store
#[derive(Debug, Clone)]
pub struct Settings {
    /// Steam installation root
    pub steam_path: PathBuf,

    /// Polling cadence
    pub watcher: WatcherSettings,

    /// Directory holding the playtime document
    pub data_dir: PathBuf,

    /// Additional blacklisted executables, lowercased
    pub exe_blacklist: Vec<String>,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            steam_path: raw.steam_path,
            watcher: WatcherSettings {
                poll_interval: raw
                    .watcher
                    .poll_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_POLL_INTERVAL),
                error_backoff: raw
                    .watcher
                    .error_backoff_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_ERROR_BACKOFF),
            },
            data_dir: raw.store.data_dir.unwrap_or_else(default_data_dir),
            exe_blacklist: raw
                .catalog
                .exe_blacklist
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect(),
        }
    }
}

/// Time between scans, and the pause after a scan that failed outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);
