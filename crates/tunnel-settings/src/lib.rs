//! Persistent configuration for the SOCKS5 tunnel.
//!
//! The tunnel remembers the three addresses it was last started with in a
//! JSON file under the user's config directory:
//!
//! ```text
//! <config dir>/go-proxy-tunnel/config.json
//!
//! {
//!   "local_addr": "127.0.0.1:10808",
//!   "remote_addr": "example.com:80",
//!   "socks_addr": "127.0.0.1:1080"
//! }
//! ```
//!
//! A missing or unreadable file falls back to [`TunnelSettings::default`].
//!
//! # Example
//!
//! ```no_run
//! use tunnel_settings::ConfigLoader;
//!
//! let path = ConfigLoader::config_path().unwrap();
//! let settings = ConfigLoader::load_or_default(&path);
//! println!("{}", settings.local_addr);
//! ```

mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Directory name under the user config dir.
pub const APP_NAME: &str = "go-proxy-tunnel";

/// Factory default local listen address.
pub const DEFAULT_LOCAL_ADDR: &str = "127.0.0.1:10808";

/// Factory default remote target.
pub const DEFAULT_REMOTE_ADDR: &str = "example.com:80";

/// Factory default SOCKS5 proxy.
pub const DEFAULT_SOCKS_ADDR: &str = "127.0.0.1:1080";

/// Errors from settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// JSON deserialization or serialization failed.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    /// TOML serialization failed.
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// The platform has no per-user config directory.
    #[error("Cannot determine user config directory")]
    NoConfigDir,

    /// I/O error reading or writing a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Saved tunnel addresses, corresponding to `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSettings {
    /// Local listen address (`host:port`).
    #[serde(default = "default_local_addr")]
    pub local_addr: String,

    /// Remote target address (`host:port`).
    #[serde(default = "default_remote_addr")]
    pub remote_addr: String,

    /// SOCKS5 proxy address (`host:port`).
    #[serde(default = "default_socks_addr")]
    pub socks_addr: String,

    /// Upstream dial timeout in seconds.
    /// If absent, the tunnel's built-in default is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

fn default_local_addr() -> String {
    DEFAULT_LOCAL_ADDR.to_string()
}

fn default_remote_addr() -> String {
    DEFAULT_REMOTE_ADDR.to_string()
}

fn default_socks_addr() -> String {
    DEFAULT_SOCKS_ADDR.to_string()
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            local_addr: default_local_addr(),
            remote_addr: default_remote_addr(),
            socks_addr: default_socks_addr(),
            connect_timeout_secs: None,
        }
    }
}

impl TunnelSettings {
    /// Parse settings from a JSON string.
    ///
    /// Missing address fields take their factory defaults.
    ///
    /// # Errors
    /// Returns `SettingsError::ParseError` if the JSON is malformed.
    pub fn parse(json: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(json).map_err(SettingsError::ParseError)
    }

    /// Load settings from a file on disk.
    ///
    /// # Errors
    /// Returns `SettingsError::Io` on read failure, or
    /// `SettingsError::ParseError` if the file content is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `SettingsError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(SettingsError::ParseError)
    }

    /// Serialize to TOML, for display.
    ///
    /// # Errors
    /// Returns `SettingsError::SerializeError` if serialization fails.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(SettingsError::SerializeError)
    }

    /// Save to a file, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns `SettingsError::Io` on write failure, or
    /// `SettingsError::ParseError` if serialization fails.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = self.to_json()?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
