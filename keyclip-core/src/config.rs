//! Ring configuration and its on-disk form.
//!
//! A [`RingConfig`] is what a [`Builder`](crate::Builder) accumulates. It can
//! also be read from a TOML file:
//!
//! ```toml
//! service = "com.example.app"
//! access_group = "TEAMID.com.example.shared"
//! accessibility = "when_unlocked"
//! print_error = true
//! ```
//!
//! The default file lives at `~/.config/keyclip/keyclip.toml` on Linux,
//! `~/Library/Application Support/pw.aska.keyclip/keyclip.toml` on macOS and
//! `%APPDATA%\aska\keyclip\config\keyclip.toml` on Windows.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Service name used when none is configured.
pub const DEFAULT_SERVICE: &str = "pw.aska.KeyClip";

const CONFIG_FILE_NAME: &str = "keyclip.toml";

/// Condition under which a stored record may be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Readable only while the device is unlocked.
    WhenUnlocked,
    /// Readable any time after the first unlock since boot.
    #[default]
    AfterFirstUnlock,
    /// Always readable.
    Always,
    /// Readable while unlocked, only if a passcode is set; never migrates.
    WhenPasscodeSetThisDeviceOnly,
    /// Like [`WhenUnlocked`](Self::WhenUnlocked); never migrates.
    WhenUnlockedThisDeviceOnly,
    /// Like [`AfterFirstUnlock`](Self::AfterFirstUnlock); never migrates.
    AfterFirstUnlockThisDeviceOnly,
    /// Like [`Always`](Self::Always); never migrates.
    AlwaysThisDeviceOnly,
}

impl Accessibility {
    /// Stable snake_case name, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhenUnlocked => "when_unlocked",
            Self::AfterFirstUnlock => "after_first_unlock",
            Self::Always => "always",
            Self::WhenPasscodeSetThisDeviceOnly => "when_passcode_set_this_device_only",
            Self::WhenUnlockedThisDeviceOnly => "when_unlocked_this_device_only",
            Self::AfterFirstUnlockThisDeviceOnly => "after_first_unlock_this_device_only",
            Self::AlwaysThisDeviceOnly => "always_this_device_only",
        }
    }

    /// Name of the matching keychain attribute constant.
    pub fn attribute_name(&self) -> &'static str {
        match self {
            Self::WhenUnlocked => "kSecAttrAccessibleWhenUnlocked",
            Self::AfterFirstUnlock => "kSecAttrAccessibleAfterFirstUnlock",
            Self::Always => "kSecAttrAccessibleAlways",
            Self::WhenPasscodeSetThisDeviceOnly => {
                "kSecAttrAccessibleWhenPasscodeSetThisDeviceOnly"
            }
            Self::WhenUnlockedThisDeviceOnly => "kSecAttrAccessibleWhenUnlockedThisDeviceOnly",
            Self::AfterFirstUnlockThisDeviceOnly => {
                "kSecAttrAccessibleAfterFirstUnlockThisDeviceOnly"
            }
            Self::AlwaysThisDeviceOnly => "kSecAttrAccessibleAlwaysThisDeviceOnly",
        }
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the configuration file.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unexpected fields.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration directory not available.
    #[error("configuration directory not available")]
    ConfigDirUnavailable,
}

/// Settings a [`Ring`](crate::Ring) is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RingConfig {
    /// Service namespace records are stored under.
    pub service: String,

    /// Access group shared between applications, if any.
    pub access_group: Option<String>,

    /// Accessibility applied to newly inserted records.
    pub accessibility: Accessibility,

    /// Emit a log line for every failed operation.
    pub print_error: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            access_group: None,
            accessibility: Accessibility::default(),
            print_error: false,
        }
    }
}

impl RingConfig {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("pw", "aska", "keyclip")
            .ok_or(ConfigError::ConfigDirUnavailable)?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load the configuration from the default location.
    ///
    /// Returns defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load the configuration from a specific file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded ring configuration from {:?}", path);
        Ok(config)
    }
}
