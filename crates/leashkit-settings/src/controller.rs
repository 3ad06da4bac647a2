//! Settings Controller
//!
//! Handles interaction between a settings form and the settings model.
//! Values arrive as strings keyed by setting id; listeners are told about
//! every accepted change.

use std::cell::RefCell;
use std::str::FromStr;

use crate::config::{
    ClampStrategy, DisplacementMode, ExceedPolicy, LeashSettings, PullMode, RingVisibility,
};
use crate::error::{SettingsError, SettingsResult};
use crate::manager::SettingsManager;

/// Setting ids understood by [`SettingsController::update_setting`].
pub const SETTING_IDS: [&str; 8] = [
    "default_distance",
    "gm_only",
    "ring_visibility",
    "exceed_behavior",
    "enforcement_strategy",
    "handler_pull_mode",
    "displacement_mode",
    "session_timeout_ms",
];

/// UI-friendly representation of a setting
#[derive(Debug, Clone, PartialEq)]
pub struct SettingUiModel {
    pub id: String,
    pub name: String,
    pub value: String,
    pub value_type: String,
    pub description: String,
    pub options: Vec<String>,
    pub current_index: i32,
}

impl SettingUiModel {
    fn new(id: &str, name: &str, value: String, description: &str) -> Self {
        let value_type = match value.as_str() {
            "true" | "false" => "Boolean",
            v if v.parse::<f64>().is_ok() => "Float",
            _ => "String",
        };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            value,
            value_type: value_type.to_string(),
            description: description.to_string(),
            options: Vec::new(),
            current_index: 0,
        }
    }

    fn with_options(mut self, options: &[&str]) -> Self {
        self.value_type = "Enum".to_string();
        self.current_index = options
            .iter()
            .position(|o| *o == self.value)
            .unwrap_or(0) as i32;
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }
}

type Listener = Box<dyn Fn(&str, &str)>;

/// Controller for settings logic
pub struct SettingsController {
    manager: RefCell<SettingsManager>,
    listeners: RefCell<Vec<Listener>>,
}

fn parse<T: FromStr>(id: &str, value: &str) -> SettingsResult<T>
where
    T::Err: ToString,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| SettingsError::InvalidSetting {
            key: id.to_string(),
            reason: e.to_string(),
        })
}

impl SettingsController {
    pub fn new(manager: SettingsManager) -> Self {
        Self {
            manager: RefCell::new(manager),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Register a callback to be notified when a setting changes
    pub fn on_setting_changed<F>(&self, callback: F)
    where
        F: Fn(&str, &str) + 'static,
    {
        self.listeners.borrow_mut().push(Box::new(callback));
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> LeashSettings {
        self.manager.borrow().settings().clone()
    }

    /// Get settings formatted for UI display, sorted by name
    pub fn get_settings_for_ui(&self) -> Vec<SettingUiModel> {
        let settings = self.settings();
        let engine = settings.engine;
        let mut items = vec![
            SettingUiModel::new(
                "default_distance",
                "Default Distance",
                settings.default_distance.to_string(),
                "Radius offered for new leashes, in scene units",
            ),
            SettingUiModel::new(
                "gm_only",
                "GM Only",
                settings.gm_only.to_string(),
                "Only game masters may create or remove leashes",
            ),
            SettingUiModel::new(
                "ring_visibility",
                "Ring Visibility",
                settings.ring_visibility.to_string(),
                "When leash rings are drawn",
            )
            .with_options(&["hover", "always", "never"]),
            SettingUiModel::new(
                "exceed_behavior",
                "Exceed Behavior",
                engine.exceed_policy.to_string(),
                "Block a leashed move past the radius, or clamp it to the edge",
            )
            .with_options(&["block", "clamp"]),
            SettingUiModel::new(
                "enforcement_strategy",
                "Enforcement Strategy",
                engine.enforcement_strategy.to_string(),
                "Measure the leash in straight pixels or by grid rules",
            )
            .with_options(&["grid", "pixel"]),
            SettingUiModel::new(
                "handler_pull_mode",
                "Handler Pull Mode",
                engine.pull_mode.to_string(),
                "Drag targets along with their handler, or only clamp them",
            )
            .with_options(&["drag", "clamp_only"]),
            SettingUiModel::new(
                "displacement_mode",
                "Displacement Mode",
                engine.displacement_mode.to_string(),
                "Measure handler motion from the drag start or per step",
            )
            .with_options(&["session", "incremental"]),
            SettingUiModel::new(
                "session_timeout_ms",
                "Session Timeout",
                engine.session_timeout_ms.to_string(),
                "Idle time in milliseconds before a drag session ends",
            ),
        ];
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    /// Update a setting value from string input
    ///
    /// The change is validated against the whole settings object before it
    /// is kept; a rejected value leaves the settings untouched.
    pub fn update_setting(&self, id: &str, value: &str) -> SettingsResult<()> {
        let mut updated = self.settings();
        match id {
            "default_distance" => updated.default_distance = parse(id, value)?,
            "gm_only" => updated.gm_only = parse(id, value)?,
            "ring_visibility" => updated.ring_visibility = parse::<RingVisibility>(id, value)?,
            "exceed_behavior" => updated.engine.exceed_policy = parse::<ExceedPolicy>(id, value)?,
            "enforcement_strategy" => {
                updated.engine.enforcement_strategy = parse::<ClampStrategy>(id, value)?
            }
            "handler_pull_mode" => updated.engine.pull_mode = parse::<PullMode>(id, value)?,
            "displacement_mode" => {
                updated.engine.displacement_mode = parse::<DisplacementMode>(id, value)?
            }
            "session_timeout_ms" => updated.engine.session_timeout_ms = parse(id, value)?,
            _ => {
                return Err(SettingsError::InvalidSetting {
                    key: id.to_string(),
                    reason: "unknown setting".to_string(),
                })
            }
        }
        updated.validate()?;

        *self.manager.borrow_mut().settings_mut() = updated;
        tracing::debug!("Setting {} = {}", id, value);

        // Notify listeners
        for listener in self.listeners.borrow().iter() {
            listener(id, value);
        }
        Ok(())
    }

    /// Save settings to disk
    pub fn save(&self) -> SettingsResult<()> {
        self.manager.borrow().save()
    }

    /// Restore default settings, notifying listeners of every value that
    /// changed.
    pub fn restore_defaults(&self) {
        let before = self.get_settings_for_ui();
        *self.manager.borrow_mut().settings_mut() = LeashSettings::default();
        let after = self.get_settings_for_ui();

        let listeners = self.listeners.borrow();
        for (old, new) in before.iter().zip(after.iter()) {
            if old.value != new.value {
                for listener in listeners.iter() {
                    listener(&new.id, &new.value);
                }
            }
        }
    }
}
