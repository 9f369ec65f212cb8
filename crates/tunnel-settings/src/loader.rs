//! Config file location and forgiving load.

use crate::{SettingsError, TunnelSettings, APP_NAME};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Locates and loads `TunnelSettings`.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Path of the config file: `<user config dir>/go-proxy-tunnel/config.json`.
    ///
    /// # Errors
    /// Returns `SettingsError::NoConfigDir` when the platform has no user
    /// config directory (e.g. `$HOME` unset).
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|dir| Self::config_path_in(&dir))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Path of the config file under an explicit config directory.
    pub fn config_path_in(config_dir: &Path) -> PathBuf {
        config_dir.join(APP_NAME).join("config.json")
    }

    /// Load settings from `path`, falling back to factory defaults.
    ///
    /// A missing file is normal on first run. A malformed file is reported
    /// and ignored so that a bad edit never blocks startup.
    pub fn load_or_default(path: &Path) -> TunnelSettings {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return TunnelSettings::default();
        }
        match TunnelSettings::load(path) {
            Ok(settings) => {
                info!(path = %path.display(), "Loaded config");
                settings
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to parse config, using defaults");
                TunnelSettings::default()
            }
        }
    }
}
