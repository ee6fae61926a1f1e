//! User configuration loading for musicbridge.
//!
//! User config location: $XDG_CONFIG_HOME/musicbridge/musicbridge.toml
//! Fallback: the platform config directory (via `dirs`), e.g.
//! ~/.config/musicbridge/musicbridge.toml on Linux.

use std::path::PathBuf;

use super::{BridgeSettings, ConfigResult};

const APP_DIR: &str = "musicbridge";
const FILE_NAME: &str = "musicbridge.toml";

/// Returns the path to the user configuration file.
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Some(PathBuf::from(xdg_config).join(APP_DIR).join(FILE_NAME));
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
}

/// Load the user config file.
///
/// A missing file is not an error: it yields `Ok(None)`.
pub fn load_user_config() -> ConfigResult<Option<BridgeSettings>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    log::debug!(target: "musicbridge::config", "Loading user config from {}", path.display());
    BridgeSettings::load_from_path(&path).map(Some)
}
