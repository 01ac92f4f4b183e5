//! UI panel visibility and window layout

use crate::{DomainService, SettingsScope};
use glam::IVec2;
use serde::Serialize;
use shell_settings::{SettingsError, SettingsKey, SettingsService};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

pub const UI_SCALE_RANGE: RangeInclusive<f32> = 0.5..=3.0;
pub const MIN_WINDOW_SIZE: IVec2 = IVec2::new(320, 240);
pub const DEFAULT_WINDOW_SIZE: IVec2 = IVec2::new(1600, 900);

/// Panels the shell ships with and whether they start open.
pub const DEFAULT_PANELS: &[(&str, bool)] = &[
    ("camera", true),
    ("environment", true),
    ("post_process", true),
    ("content", true),
    ("stats", false),
    ("grid", false),
    ("skybox", false),
    ("console", false),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiSettings {
    pub panels: BTreeMap<String, bool>,
    pub active_panel: Option<String>,
    pub show_stats_overlay: bool,
    pub scale: f32,
    pub window_size: IVec2,
    pub window_position: Option<IVec2>,
}

pub struct UiSettingsService {
    scope: SettingsScope,
}

impl UiSettingsService {
    pub const PREFIX: &'static str = "ui";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
        }
    }

    // -- panels --------------------------------------------------------------

    /// Unknown panels start hidden.
    pub fn is_panel_visible(&self, panel: &str) -> bool {
        let default = default_visibility(panel).unwrap_or(false);
        match panel_key(panel) {
            Ok(name) => self.scope.bool_or(&name, default),
            Err(_) => default,
        }
    }

    pub fn set_panel_visible(&self, panel: &str, visible: bool) -> Result<bool, SettingsError> {
        let name = panel_key(panel)?;
        let changed = self.scope.set_bool(&name, visible)?;
        if changed {
            tracing::debug!(panel, visible, "panel visibility changed");
        }
        Ok(changed)
    }

    /// Flip a panel and return its new visibility.
    pub fn toggle_panel(&self, panel: &str) -> Result<bool, SettingsError> {
        let visible = !self.is_panel_visible(panel);
        self.set_panel_visible(panel, visible)?;
        Ok(visible)
    }

    /// Every known panel plus any stored one, with its visibility.
    pub fn panels(&self) -> BTreeMap<String, bool> {
        let mut names: Vec<String> = DEFAULT_PANELS.iter().map(|(n, _)| n.to_string()).collect();
        names.extend(self.scope.settings().keys(&self.scope.key("panels")));
        names
            .into_iter()
            .map(|name| {
                let visible = self.is_panel_visible(&name);
                (name, visible)
            })
            .collect()
    }

    pub fn active_panel(&self) -> Option<String> {
        self.scope.string("active_panel")
    }

    pub fn set_active_panel(&self, panel: Option<&str>) -> Result<bool, SettingsError> {
        match panel {
            Some(panel) => {
                panel_key(panel)?;
                self.scope.set_string("active_panel", panel)
            }
            None => self.scope.remove("active_panel"),
        }
    }

    // -- overlay & scale -----------------------------------------------------

    pub fn show_stats_overlay(&self) -> bool {
        self.scope.bool_or("show_stats_overlay", false)
    }

    pub fn set_show_stats_overlay(&self, show: bool) -> Result<bool, SettingsError> {
        self.scope.set_bool("show_stats_overlay", show)
    }

    pub fn scale(&self) -> f32 {
        self.scope.float_in("scale", 1.0, UI_SCALE_RANGE)
    }

    pub fn set_scale(&self, scale: f32) -> Result<bool, SettingsError> {
        self.scope.set_float_in("scale", scale, UI_SCALE_RANGE)
    }

    // -- window --------------------------------------------------------------

    pub fn window_size(&self) -> IVec2 {
        self.scope
            .vec2i("window_size")
            .unwrap_or(DEFAULT_WINDOW_SIZE)
            .max(MIN_WINDOW_SIZE)
    }

    pub fn set_window_size(&self, size: IVec2) -> Result<bool, SettingsError> {
        self.scope.set_vec2i("window_size", size.max(MIN_WINDOW_SIZE))
    }

    pub fn window_position(&self) -> Option<IVec2> {
        self.scope.vec2i("window_position")
    }

    pub fn set_window_position(&self, position: Option<IVec2>) -> Result<bool, SettingsError> {
        match position {
            Some(position) => self.scope.set_vec2i("window_position", position),
            None => self.scope.remove("window_position"),
        }
    }

    pub fn snapshot(&self) -> UiSettings {
        UiSettings {
            panels: self.panels(),
            active_panel: self.active_panel(),
            show_stats_overlay: self.show_stats_overlay(),
            scale: self.scale(),
            window_size: self.window_size(),
            window_position: self.window_position(),
        }
    }
}

impl DomainService for UiSettingsService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

fn default_visibility(panel: &str) -> Option<bool> {
    DEFAULT_PANELS
        .iter()
        .find(|(name, _)| *name == panel)
        .map(|(_, visible)| *visible)
}

/// Scope-relative key for a panel; the name must be a single segment.
fn panel_key(panel: &str) -> Result<String, SettingsError> {
    let key = SettingsKey::parse(panel)?;
    if key.segments().len() != 1 {
        return Err(SettingsError::InvalidKey {
            key: panel.to_string(),
            reason: "panel names cannot contain '.'",
        });
    }
    Ok(format!("panels.{panel}.visible"))
}
