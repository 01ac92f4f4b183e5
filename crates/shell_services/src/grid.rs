//! Editor grid parameters
//!
//! The grid renderer polls [`GridSettingsService::epoch`] once per frame and
//! rebuilds its uniforms only when it moved.

use crate::{DomainService, SettingsScope};
use glam::Vec3;
use serde::Serialize;
use shell_settings::{SettingsError, SettingsService};
use std::ops::RangeInclusive;
use std::sync::Arc;

pub const CELL_SIZE_RANGE: RangeInclusive<f32> = 0.001..=1000.0;
pub const MAJOR_EVERY_RANGE: RangeInclusive<u32> = 1..=1000;
pub const LINE_THICKNESS_RANGE: RangeInclusive<f32> = 0.1..=10.0;
pub const FADE_RANGE: RangeInclusive<f32> = 0.0..=1.0e6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridColors {
    pub minor: Vec3,
    pub major: Vec3,
    pub axis_x: Vec3,
    pub axis_z: Vec3,
}

impl Default for GridColors {
    fn default() -> Self {
        Self {
            minor: Vec3::splat(0.3),
            major: Vec3::splat(0.5),
            axis_x: Vec3::new(0.8, 0.2, 0.2),
            axis_z: Vec3::new(0.2, 0.3, 0.8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridSettings {
    pub enabled: bool,
    pub cell_size: f32,
    pub major_every: u32,
    pub line_thickness: f32,
    pub fade_start: f32,
    pub fade_end: f32,
    pub colors: GridColors,
}

pub struct GridSettingsService {
    scope: SettingsScope,
}

impl GridSettingsService {
    pub const PREFIX: &'static str = "grid";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
        }
    }

    pub fn enabled(&self) -> bool {
        self.scope.bool_or("enabled", true)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<bool, SettingsError> {
        self.scope.set_bool("enabled", enabled)
    }

    pub fn cell_size(&self) -> f32 {
        self.scope.float_in("cell_size", 1.0, CELL_SIZE_RANGE)
    }

    pub fn set_cell_size(&self, size: f32) -> Result<bool, SettingsError> {
        self.scope.set_float_in("cell_size", size, CELL_SIZE_RANGE)
    }

    /// Every n-th line is drawn as a major line.
    pub fn major_every(&self) -> u32 {
        self.scope
            .get_or("major_every", 10u32)
            .clamp(*MAJOR_EVERY_RANGE.start(), *MAJOR_EVERY_RANGE.end())
    }

    pub fn set_major_every(&self, every: u32) -> Result<bool, SettingsError> {
        let every = every.clamp(*MAJOR_EVERY_RANGE.start(), *MAJOR_EVERY_RANGE.end());
        self.scope.set("major_every", &every)
    }

    pub fn line_thickness(&self) -> f32 {
        self.scope
            .float_in("line_thickness", 1.0, LINE_THICKNESS_RANGE)
    }

    pub fn set_line_thickness(&self, thickness: f32) -> Result<bool, SettingsError> {
        self.scope
            .set_float_in("line_thickness", thickness, LINE_THICKNESS_RANGE)
    }

    pub fn fade_start(&self) -> f32 {
        self.fade().0
    }

    pub fn fade_end(&self) -> f32 {
        self.fade().1
    }

    /// Fade distances; a start beyond the end moves the end out with it.
    pub fn set_fade(&self, start: f32, end: f32) -> Result<bool, SettingsError> {
        let start = self.scope.finite("fade_start", start)?;
        let end = self.scope.finite("fade_end", end)?;
        let start = start.clamp(*FADE_RANGE.start(), *FADE_RANGE.end());
        let end = end.clamp(start, *FADE_RANGE.end());
        let moved_start = self.scope.set_float("fade_start", start)?;
        let moved_end = self.scope.set_float("fade_end", end)?;
        Ok(moved_start || moved_end)
    }

    pub fn colors(&self) -> GridColors {
        let defaults = GridColors::default();
        GridColors {
            minor: self.scope.vec3_or("minor_color", defaults.minor),
            major: self.scope.vec3_or("major_color", defaults.major),
            axis_x: self.scope.vec3_or("axis_x_color", defaults.axis_x),
            axis_z: self.scope.vec3_or("axis_z_color", defaults.axis_z),
        }
    }

    /// All four colours are checked before any of them is stored.
    pub fn set_colors(&self, colors: GridColors) -> Result<bool, SettingsError> {
        let entries = [
            ("minor_color", colors.minor),
            ("major_color", colors.major),
            ("axis_x_color", colors.axis_x),
            ("axis_z_color", colors.axis_z),
        ];
        for (name, color) in entries {
            self.scope.finite_vec3(name, color)?;
        }

        let mut changed = false;
        for (name, color) in entries {
            changed |= self.scope.set_vec3(name, color)?;
        }
        Ok(changed)
    }

    pub fn snapshot(&self) -> GridSettings {
        let (fade_start, fade_end) = self.fade();
        GridSettings {
            enabled: self.enabled(),
            cell_size: self.cell_size(),
            major_every: self.major_every(),
            line_thickness: self.line_thickness(),
            fade_start,
            fade_end,
            colors: self.colors(),
        }
    }

    fn fade(&self) -> (f32, f32) {
        let start = self.scope.float_in("fade_start", 20.0, FADE_RANGE);
        let end = self.scope.float_in("fade_end", 100.0, FADE_RANGE);
        (start, end.max(start))
    }
}

impl DomainService for GridSettingsService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}
