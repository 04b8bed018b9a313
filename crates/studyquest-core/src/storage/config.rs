//! TOML-based application configuration.
//!
//! Stores deployment tuning:
//! - Reward parameters (premium XP multiplier)
//! - Notifier settings (webhook endpoint)
//!
//! Configuration is stored at `~/.config/studyquest/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Reward tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// XP multiplier applied to premium players' claims.
    #[serde(default = "default_premium_multiplier")]
    pub premium_xp_multiplier: f64,
}

/// Notification transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Webhook endpoint notifications are POSTed to; empty disables delivery.
    #[serde(default)]
    pub webhook_url: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyquest/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

fn default_premium_multiplier() -> f64 {
    1.5
}
fn default_true() -> bool {
    true
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            premium_xp_multiplier: default_premium_multiplier(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: String::new(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/studyquest"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk; a missing file is written out with defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(_) => {
                let config = Self::default();
                config.save()?;
                Ok(config)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Load from disk, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.rewards.premium_xp_multiplier, 1.5);
        assert!(parsed.notifier.enabled);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed, Config::default());

        let parsed: Config =
            toml::from_str("[notifier]\nwebhook_url = \"https://push.example/send\"\n").unwrap();
        assert_eq!(parsed.notifier.webhook_url, "https://push.example/send");
        assert_eq!(parsed.rewards.premium_xp_multiplier, 1.5);
    }
}
