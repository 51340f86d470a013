//! Client settings
//!
//! Settings are read from a TOML document. Every section and field is optional, missing values
//! take the defaults the controller protocol was tuned for.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use validator::Validate;

use crate::dispatcher::Channel;
use crate::scanner::HostOrder;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("error parsing settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("error serializing settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid settings: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    #[validate(nested)]
    pub transport: TransportSettings,
    #[validate(nested)]
    pub debounce: DebounceSettings,
    #[validate(nested)]
    pub scan: ScanSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSettings {
    #[validate(range(min = 1))]
    pub connect_timeout_ms: u64,
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

impl TransportSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2000,
            timeout_ms: 3000,
        }
    }
}

/// Quiet intervals of the debounced channels
///
/// Color drags fire more often than slider moves, so the color channel waits longer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct DebounceSettings {
    #[validate(range(min = 1, max = 5000))]
    pub color_ms: u64,
    #[validate(range(min = 1, max = 5000))]
    pub local_brightness_ms: u64,
    #[validate(range(min = 1, max = 5000))]
    pub global_brightness_ms: u64,
}

impl DebounceSettings {
    pub fn interval(&self, channel: Channel) -> Duration {
        Duration::from_millis(match channel {
            Channel::Color => self.color_ms,
            Channel::LocalBrightness => self.local_brightness_ms,
            Channel::GlobalBrightness => self.global_brightness_ms,
        })
    }
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            color_ms: 120,
            local_brightness_ms: 80,
            global_brightness_ms: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSettings {
    #[validate(range(min = 1, max = 254))]
    pub batch_size: usize,
    #[validate(length(min = 1))]
    pub health_path: String,
    pub host_order: HostOrder,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            batch_size: 32,
            health_path: "/state".to_owned(),
            host_order: HostOrder::default(),
        }
    }
}

impl Settings {
    /// Default location of the settings file, in the user configuration directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("ledctrl");
            path.push("config.toml");
            path
        })
    }

    pub fn from_toml(source: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn load_file(path: &Path) -> Result<Self, SettingsError> {
        let full = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_toml(&full)?;

        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Load the settings from `path` if given, else from the default location if that file
    /// exists, else fall back to the defaults
    pub async fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = path {
            return Self::load_file(path).await;
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_file(&path).await,
            _ => {
                debug!("no settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
