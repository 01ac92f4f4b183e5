//! Input settings and key bindings

use crate::{DomainService, SettingsScope};
use serde::Serialize;
use shell_settings::{SettingsError, SettingsKey, SettingsService};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

pub const MOUSE_SENSITIVITY_RANGE: RangeInclusive<f32> = 0.01..=10.0;
pub const SCROLL_SENSITIVITY_RANGE: RangeInclusive<f32> = 0.01..=10.0;
pub const DEADZONE_RANGE: RangeInclusive<f32> = 0.0..=0.9;

/// Default chord for each bindable action.
pub const DEFAULT_BINDINGS: &[(&str, &str)] = &[
    ("move_forward", "W"),
    ("move_back", "S"),
    ("move_left", "A"),
    ("move_right", "D"),
    ("move_up", "E"),
    ("move_down", "Q"),
    ("boost", "LeftShift"),
    ("toggle_camera_mode", "Tab"),
    ("toggle_ui", "F1"),
    ("toggle_stats", "F2"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSettings {
    pub mouse_sensitivity: f32,
    pub scroll_sensitivity: f32,
    pub invert_y: bool,
    pub gamepad_deadzone: f32,
    pub bindings: BTreeMap<String, String>,
}

pub struct InputSettingsService {
    scope: SettingsScope,
}

impl InputSettingsService {
    pub const PREFIX: &'static str = "input";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
        }
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.scope
            .float_in("mouse_sensitivity", 0.2, MOUSE_SENSITIVITY_RANGE)
    }

    pub fn set_mouse_sensitivity(&self, value: f32) -> Result<bool, SettingsError> {
        self.scope
            .set_float_in("mouse_sensitivity", value, MOUSE_SENSITIVITY_RANGE)
    }

    pub fn scroll_sensitivity(&self) -> f32 {
        self.scope
            .float_in("scroll_sensitivity", 1.0, SCROLL_SENSITIVITY_RANGE)
    }

    pub fn set_scroll_sensitivity(&self, value: f32) -> Result<bool, SettingsError> {
        self.scope
            .set_float_in("scroll_sensitivity", value, SCROLL_SENSITIVITY_RANGE)
    }

    pub fn invert_y(&self) -> bool {
        self.scope.bool_or("invert_y", false)
    }

    pub fn set_invert_y(&self, invert: bool) -> Result<bool, SettingsError> {
        self.scope.set_bool("invert_y", invert)
    }

    pub fn gamepad_deadzone(&self) -> f32 {
        self.scope.float_in("gamepad_deadzone", 0.15, DEADZONE_RANGE)
    }

    pub fn set_gamepad_deadzone(&self, value: f32) -> Result<bool, SettingsError> {
        self.scope.set_float_in("gamepad_deadzone", value, DEADZONE_RANGE)
    }

    /// Chord bound to `action`, falling back to the default table.
    pub fn binding(&self, action: &str) -> Option<String> {
        let name = binding_key(action).ok()?;
        self.scope
            .string(&name)
            .or_else(|| default_binding(action).map(str::to_string))
    }

    /// Action names must be a single key segment.
    pub fn set_binding(&self, action: &str, chord: &str) -> Result<bool, SettingsError> {
        self.scope.set_string(&binding_key(action)?, chord)
    }

    /// Forget a custom binding so the default applies again.
    pub fn clear_binding(&self, action: &str) -> Result<bool, SettingsError> {
        self.scope.remove(&binding_key(action)?)
    }

    /// Actions bound to `chord`, for conflict hints in the UI.
    pub fn actions_for(&self, chord: &str) -> Vec<String> {
        self.bindings()
            .into_iter()
            .filter(|(_, bound)| bound.eq_ignore_ascii_case(chord))
            .map(|(action, _)| action)
            .collect()
    }

    /// Defaults overlaid with every stored binding.
    pub fn bindings(&self) -> BTreeMap<String, String> {
        let mut bindings: BTreeMap<String, String> = DEFAULT_BINDINGS
            .iter()
            .map(|(action, chord)| (action.to_string(), chord.to_string()))
            .collect();
        let stored = self.scope.key("bindings");
        for action in self.scope.settings().keys(&stored) {
            if let Some(chord) = self.scope.string(&format!("bindings.{action}")) {
                bindings.insert(action, chord);
            }
        }
        bindings
    }

    pub fn snapshot(&self) -> InputSettings {
        InputSettings {
            mouse_sensitivity: self.mouse_sensitivity(),
            scroll_sensitivity: self.scroll_sensitivity(),
            invert_y: self.invert_y(),
            gamepad_deadzone: self.gamepad_deadzone(),
            bindings: self.bindings(),
        }
    }
}

impl DomainService for InputSettingsService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

fn default_binding(action: &str) -> Option<&'static str> {
    DEFAULT_BINDINGS
        .iter()
        .find(|(name, _)| *name == action)
        .map(|(_, chord)| *chord)
}

/// Scope-relative key for an action binding.
fn binding_key(action: &str) -> Result<String, SettingsError> {
    let key = SettingsKey::parse(action)?;
    if key.segments().len() != 1 {
        return Err(SettingsError::InvalidKey {
            key: action.to_string(),
            reason: "action names cannot contain '.'",
        });
    }
    Ok(format!("bindings.{action}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> InputSettingsService {
        InputSettingsService::new(Arc::new(SettingsService::new()))
    }

    #[test]
    fn defaults() {
        let input = service();
        assert_eq!(input.mouse_sensitivity(), 0.2);
        assert!(!input.invert_y());
        assert_eq!(input.binding("move_forward").as_deref(), Some("W"));
        assert_eq!(input.binding("unknown"), None);
        assert_eq!(input.bindings().len(), DEFAULT_BINDINGS.len());
    }

    #[test]
    fn custom_bindings_override_defaults() {
        let input = service();
        input.set_binding("move_forward", "Up").unwrap();
        input.set_binding("screenshot", "F12").unwrap();

        assert_eq!(input.binding("move_forward").as_deref(), Some("Up"));
        let bindings = input.bindings();
        assert_eq!(bindings.get("screenshot").map(String::as_str), Some("F12"));
        assert_eq!(bindings.len(), DEFAULT_BINDINGS.len() + 1);

        input.clear_binding("move_forward").unwrap();
        assert_eq!(input.binding("move_forward").as_deref(), Some("W"));
    }

    #[test]
    fn conflicting_chords_are_reported() {
        let input = service();
        input.set_binding("toggle_stats", "tab").unwrap();
        let mut actions = input.actions_for("Tab");
        actions.sort();
        assert_eq!(actions, ["toggle_camera_mode", "toggle_stats"]);
    }

    #[test]
    fn deadzone_is_clamped() {
        let input = service();
        input.set_gamepad_deadzone(2.0).unwrap();
        assert_eq!(input.gamepad_deadzone(), 0.9);
        assert!(input.set_gamepad_deadzone(f32::INFINITY).is_err());
    }

    #[test]
    fn invalid_action_names_are_rejected() {
        let input = service();
        assert!(input.set_binding("", "X").is_err());
        assert!(input.set_binding("a..b", "X").is_err());
    }

    #[test]
    fn action_names_must_be_one_segment() {
        let input = service();
        assert!(matches!(
            input.set_binding("camera.orbit", "Alt"),
            Err(SettingsError::InvalidKey { .. })
        ));
        assert!(input.set_binding("", "Alt").is_err());
        assert!(input.clear_binding("a.b").is_err());
        assert_eq!(input.binding("camera.orbit"), None);
        assert!(!input.scope().settings().contains("input"));
        assert_eq!(input.bindings().len(), DEFAULT_BINDINGS.len());
    }
}
