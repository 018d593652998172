//! XDG Base Directory paths for questlog.
//!
//! The config file and the local libSQL database live under XDG paths on
//! every platform so that a deployment can be relocated with the usual
//! `XDG_CONFIG_HOME` / `XDG_DATA_HOME` overrides.

use std::path::PathBuf;

const APP_DIR: &str = "questlog";

/// Get the questlog config directory.
///
/// Returns `$XDG_CONFIG_HOME/questlog` if set, otherwise `~/.config/questlog`.
///
/// # Examples
///
/// ```
/// use questlog_paths::config_dir;
///
/// let config = config_dir();
/// assert!(config.ends_with("questlog"));
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the questlog data directory.
///
/// Returns `$XDG_DATA_HOME/questlog` if set, otherwise `~/.local/share/questlog`.
/// The embedded gamification database is kept here.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default location of `config.toml`.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default location of the local libSQL database file.
pub fn default_database_path() -> PathBuf {
    data_dir().join("questlog.db")
}

fn xdg_dir(env_var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(env_var) {
        PathBuf::from(base).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}
