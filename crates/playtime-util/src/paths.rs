//! Default paths for steam-playtime components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/steam-playtime/config.toml` or `~/.config/steam-playtime/config.toml`
//! - Data: `$XDG_DATA_HOME/steam-playtime` or `~/.local/share/steam-playtime`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const PLAYTIME_DATA_DIR_ENV: &str = "STEAM_PLAYTIME_DATA_DIR";

/// Name of the playtime document inside the data directory
pub const PLAYTIME_FILENAME: &str = "playtime.json";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "steam-playtime";

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$STEAM_PLAYTIME_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/steam-playtime` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/steam-playtime` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(PLAYTIME_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking STEAM_PLAYTIME_DATA_DIR.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("data")
}

/// Location of the playtime document inside a data directory
pub fn playtime_file(data_dir: impl Into<PathBuf>) -> PathBuf {
    data_dir.into().join(PLAYTIME_FILENAME)
}
