//! Leashkit Settings Crate
//!
//! Handles leash behaviour configuration, its persistence, and the string
//! based update path used by settings forms.

pub mod config;
pub mod controller;
pub mod error;
pub mod manager;

pub use config::{LeashSettings, SettingsFormat, DEFAULT_DISTANCE};
pub use controller::{SettingUiModel, SettingsController, SETTING_IDS};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
pub use manager::SettingsManager;
