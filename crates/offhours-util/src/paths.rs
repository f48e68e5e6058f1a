//! Default paths for offhoursd components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/offhours/config.toml` or `~/.config/offhours/config.toml`
//! - Data: `$XDG_DATA_HOME/offhoursd` or `~/.local/share/offhoursd`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const OFFHOURS_DATA_DIR_ENV: &str = "OFFHOURS_DATA_DIR";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Config subdirectory name
const CONFIG_DIR: &str = "offhours";

/// Application data subdirectory name
const APP_DIR: &str = "offhoursd";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/offhours/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/offhours/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home)
            .join(CONFIG_DIR)
            .join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(CONFIG_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$OFFHOURS_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/offhoursd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/offhoursd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(OFFHOURS_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking OFFHOURS_DATA_DIR env var.
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
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
