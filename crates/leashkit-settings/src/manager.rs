//! Settings Manager
//!
//! Resolves where settings live on disk and owns the loaded copy.

use std::path::{Path, PathBuf};

use crate::config::LeashSettings;
use crate::error::{ConfigError, SettingsError, SettingsResult};

const APP_DIR: &str = "leashkit";
const SETTINGS_FILE: &str = "settings.toml";

/// Loaded settings plus the file they belong to.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    path: PathBuf,
    settings: LeashSettings,
}

impl SettingsManager {
    /// Platform configuration directory for Leashkit.
    pub fn config_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| {
                ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string()).into()
            })
    }

    /// Default settings file path.
    pub fn config_file_path() -> SettingsResult<PathBuf> {
        Ok(Self::config_dir()?.join(SETTINGS_FILE))
    }

    /// Creates the configuration directory if needed.
    pub fn ensure_config_dir() -> SettingsResult<PathBuf> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)
            .map_err(|e| SettingsError::ConfigDirectory(format!("{}: {}", dir.display(), e)))?;
        Ok(dir)
    }

    /// Opens the settings at the default location, falling back to defaults
    /// when the file does not exist yet.
    pub fn open() -> SettingsResult<Self> {
        Self::load_or_default(Self::config_file_path()?)
    }

    /// Loads settings from `path`, or defaults when the file is missing.
    pub fn load_or_default(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let settings = if path.exists() {
            LeashSettings::load_from_file(&path)
                .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?
        } else {
            tracing::info!("No settings at {}, using defaults", path.display());
            LeashSettings::default()
        };
        Ok(Self { path, settings })
    }

    /// Wraps already-loaded settings.
    pub fn with_settings(path: impl Into<PathBuf>, settings: LeashSettings) -> Self {
        Self {
            path: path.into(),
            settings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &LeashSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut LeashSettings {
        &mut self.settings
    }

    /// Writes the settings back to their file, creating parent directories.
    pub fn save(&self) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.settings
            .save_to_file(&self.path)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", self.path.display(), e)))
    }
}
