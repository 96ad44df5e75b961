//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("steam_path cannot be empty")]
    EmptySteamPath,

    #[error("{field} must be at least 1 second, got {value}")]
    IntervalTooShort { field: &'static str, value: u64 },

    #[error("store.data_dir cannot be empty")]
    EmptyDataDir,

    #[error("catalog.exe_blacklist entry '{0}' is not an executable filename")]
    InvalidBlacklistEntry(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.steam_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptySteamPath);
    }

    let intervals = [
        ("watcher.poll_interval_secs", config.watcher.poll_interval_secs),
        ("watcher.error_backoff_secs", config.watcher.error_backoff_secs),
    ];
    for (field, value) in intervals {
        if let Some(value) = value
            && value == 0
        {
            errors.push(ValidationError::IntervalTooShort { field, value });
        }
    }

    if let Some(dir) = &config.store.data_dir
        && dir.as_os_str().is_empty()
    {
        errors.push(ValidationError::EmptyDataDir);
    }

    for name in &config.catalog.exe_blacklist {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
            errors.push(ValidationError::InvalidBlacklistEntry(name.clone()));
        }
    }

    errors
}
