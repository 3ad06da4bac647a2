//! Leash settings
//!
//! Behaviour toggles for the leash engine and the host around it, stored as
//! JSON or TOML. The engine section maps directly onto
//! [`EngineConfig`]; the rest is read by the host (who may manage leashes,
//! the default radius offered by the leash form, and when rings are drawn).

pub use leashkit_core::{
    ClampStrategy, DisplacementMode, EngineConfig, ExceedPolicy, LeashAccess, PullMode,
    RingVisibility,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult, SettingsResult};

/// Default leash radius offered by the leash form, in scene units.
pub const DEFAULT_DISTANCE: f64 = 5.0;

/// File formats settings can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Json,
    Toml,
}

impl SettingsFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Complete leash configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeashSettings {
    /// Default radius for new leashes, in scene units.
    pub default_distance: f64,
    /// Only game masters may create or remove leashes.
    pub gm_only: bool,
    /// When leash rings are displayed.
    pub ring_visibility: RingVisibility,
    /// Engine behaviour.
    pub engine: EngineConfig,
}

impl Default for LeashSettings {
    fn default() -> Self {
        Self {
            default_distance: DEFAULT_DISTANCE,
            gm_only: true,
            ring_visibility: RingVisibility::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl LeashSettings {
    /// Create new settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = SettingsFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let settings: Self = match format {
            SettingsFormat::Json => serde_json::from_str(&content)?,
            SettingsFormat::Toml => toml::from_str(&content)?,
        };
        settings.validate()?;
        tracing::debug!("Loaded leash settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let content = match SettingsFormat::from_path(path)? {
            SettingsFormat::Json => serde_json::to_string_pretty(self)?,
            SettingsFormat::Toml => toml::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;
        tracing::debug!("Saved leash settings to {}", path.display());
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.default_distance.is_finite() && self.default_distance > 0.0) {
            return Err(ConfigError::ValueOutOfRange {
                key: "default_distance".to_string(),
                value: self.default_distance.to_string(),
            });
        }
        if self.engine.session_timeout_ms == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "engine.session_timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// The engine section.
    pub fn to_engine_config(&self) -> EngineConfig {
        self.engine
    }

    /// Who may create or remove leashes.
    pub fn leash_access(&self) -> LeashAccess {
        if self.gm_only {
            LeashAccess::GmOnly
        } else {
            LeashAccess::Everyone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = LeashSettings::default();
        assert_eq!(settings.default_distance, 5.0);
        assert!(settings.gm_only);
        assert_eq!(settings.ring_visibility, RingVisibility::Hover);
        assert_eq!(settings.engine.exceed_policy, ExceedPolicy::Block);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_leash_access() {
        let mut settings = LeashSettings::default();
        assert_eq!(settings.leash_access(), LeashAccess::GmOnly);

        settings.gm_only = false;
        assert_eq!(settings.leash_access(), LeashAccess::Everyone);
    }

    #[test]
    fn test_validation() {
        let mut settings = LeashSettings::default();
        settings.default_distance = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = LeashSettings::default();
        settings.engine.session_timeout_ms = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leash.toml");

        let mut settings = LeashSettings::default();
        settings.ring_visibility = RingVisibility::Always;
        settings.engine = settings
            .engine
            .with_exceed_policy(ExceedPolicy::Clamp)
            .with_pull_mode(PullMode::ClampOnly);
        settings.save_to_file(&path).unwrap();

        let loaded = LeashSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leash.json");
        std::fs::write(
            &path,
            r#"{ "gm_only": false, "engine": { "exceed_policy": "clamp" } }"#,
        )
        .unwrap();

        let loaded = LeashSettings::load_from_file(&path).unwrap();
        assert!(!loaded.gm_only);
        assert_eq!(loaded.default_distance, 5.0);
        assert_eq!(loaded.engine.exceed_policy, ExceedPolicy::Clamp);
        assert_eq!(loaded.engine.session_timeout_ms, 250);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leash.json");
        std::fs::write(&path, r#"{ "default_distance": -1 }"#).unwrap();
        assert!(LeashSettings::load_from_file(&path).is_err());

        let yaml = dir.path().join("leash.yaml");
        assert!(LeashSettings::save_to_file(&LeashSettings::default(), &yaml).is_err());
    }
}
