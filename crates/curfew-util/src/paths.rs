//! Default paths for curfewd components
//!
//! The daemon normally runs as root from a system unit, so system locations
//! win when they exist. User-writable fallbacks keep development runs working:
//! - Config: `/etc/curfew/config.toml`, else `$XDG_CONFIG_HOME/curfew/config.toml`
//! - Data: `$XDG_DATA_HOME/curfewd` or `~/.local/share/curfewd`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const CURFEW_CONFIG_ENV: &str = "CURFEW_CONFIG";

/// Environment variable for overriding the data directory
pub const CURFEW_DATA_DIR_ENV: &str = "CURFEW_DATA_DIR";

/// System-wide config location
const SYSTEM_CONFIG_PATH: &str = "/etc/curfew/config.toml";

/// Config subdirectory name
const CONFIG_DIR: &str = "curfew";

/// Data subdirectory name
const APP_DIR: &str = "curfewd";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$CURFEW_CONFIG` environment variable (if set)
/// 2. `/etc/curfew/config.toml` (if it exists)
/// 3. `$XDG_CONFIG_HOME/curfew/config.toml` or `~/.config/curfew/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CURFEW_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system.exists() {
        return system;
    }

    user_config_path()
}

/// Get the per-user config path without checking the system location.
pub fn user_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(CONFIG_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join("config.toml");
    }

    PathBuf::from(SYSTEM_CONFIG_PATH)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$CURFEW_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/curfewd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/curfewd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(CURFEW_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking CURFEW_DATA_DIR env var.
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
