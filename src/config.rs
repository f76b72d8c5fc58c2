//! Driver configuration
//!
//! Stored as TOML, by default at `~/.config/sdm4540/driver.toml`. Every field
//! is optional; a missing file gives the built-in defaults.
//!
//! ```toml
//! device_name = "Compaq Internet Keyboard SDM4540UL (extra keys)"
//! rescan_interval_ms = 2000
//!
//! [keys]
//! mail = "KEY_MAIL"
//! help = 138
//!
//! [reader]
//! read_timeout_ms = 10
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sdm4540_keyboard::{KeyCode, KeyMapping, KeyboardError, SpecialKey};
use sdm4540_transport::ReaderConfig;

/// Substitute code overrides, one optional entry per vendor button
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnifier: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullseye: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<KeyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<KeyCode>,
}

impl KeyOverrides {
    /// Every button set explicitly to its code in `mapping`
    pub fn from_mapping(mapping: &KeyMapping) -> Self {
        let mut overrides = Self::default();
        for key in SpecialKey::ALL {
            *overrides.slot_mut(key) = Some(mapping.key_code(key));
        }
        overrides
    }

    pub fn get(&self, key: SpecialKey) -> Option<KeyCode> {
        match key {
            SpecialKey::Magnifier => self.magnifier,
            SpecialKey::Bullseye => self.bullseye,
            SpecialKey::Mail => self.mail,
            SpecialKey::Info => self.info,
            SpecialKey::Logo => self.logo,
            SpecialKey::Marketplace => self.marketplace,
            SpecialKey::Media => self.media,
            SpecialKey::Help => self.help,
            SpecialKey::Contact => self.contact,
        }
    }

    fn slot_mut(&mut self, key: SpecialKey) -> &mut Option<KeyCode> {
        match key {
            SpecialKey::Magnifier => &mut self.magnifier,
            SpecialKey::Bullseye => &mut self.bullseye,
            SpecialKey::Mail => &mut self.mail,
            SpecialKey::Info => &mut self.info,
            SpecialKey::Logo => &mut self.logo,
            SpecialKey::Marketplace => &mut self.marketplace,
            SpecialKey::Media => &mut self.media,
            SpecialKey::Help => &mut self.help,
            SpecialKey::Contact => &mut self.contact,
        }
    }
}

/// Reader thread tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// hidraw read timeout, bounds how fast a shutdown is noticed.
    /// Negative values count as 0.
    pub read_timeout_ms: i32,
    /// Pause after a failed read
    pub error_sleep_ms: u64,
    /// Failed reads in a row before an interface counts as unplugged
    pub max_consecutive_errors: u32,
    /// Zero-fill reads shorter than a report instead of dropping them
    pub pad_short_reports: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        let defaults = ReaderConfig::default();
        Self {
            read_timeout_ms: defaults.read_timeout_ms,
            error_sleep_ms: defaults.error_sleep_ms,
            max_consecutive_errors: defaults.max_consecutive_errors,
            pad_short_reports: defaults.pad_short_reports,
        }
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Name of the virtual keyboard device
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// How often to look for the keyboard when hot-plug events are unavailable
    #[serde(default = "default_rescan_interval")]
    pub rescan_interval_ms: u64,
    #[serde(default)]
    pub keys: KeyOverrides,
    #[serde(default)]
    pub reader: ReaderSettings,
}

fn default_device_name() -> String {
    "Compaq Internet Keyboard SDM4540UL (extra keys)".to_string()
}

fn default_rescan_interval() -> u64 {
    2000
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            rescan_interval_ms: default_rescan_interval(),
            keys: KeyOverrides::default(),
            reader: ReaderSettings::default(),
        }
    }
}

impl DriverConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sdm4540")
            .join("driver.toml")
    }

    /// Defaults with every key written out, for a fresh config file
    pub fn documented_default() -> Self {
        Self {
            keys: KeyOverrides::from_mapping(&KeyMapping::DEFAULT),
            ..Self::default()
        }
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DriverConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default mapping with the `[keys]` overrides applied, validated
    pub fn key_mapping(&self) -> Result<KeyMapping, KeyboardError> {
        let mut mapping = KeyMapping::DEFAULT;
        for key in SpecialKey::ALL {
            if let Some(code) = self.keys.get(key) {
                mapping.set(key, code);
            }
        }
        mapping.validate()?;
        Ok(mapping)
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            read_timeout_ms: self.reader.read_timeout_ms.max(0),
            error_sleep_ms: self.reader.error_sleep_ms,
            max_consecutive_errors: self.reader.max_consecutive_errors.max(1),
            pad_short_reports: self.reader.pad_short_reports,
        }
    }
}
