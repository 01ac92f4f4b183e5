//! Prefixed view over the shared settings store

use glam::{IVec2, Vec3};
use serde::{de::DeserializeOwned, Serialize};
use shell_core::Epoch;
use shell_settings::{SettingsError, SettingsService};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Reads and writes keys below one prefix and counts effective changes.
#[derive(Debug)]
pub struct SettingsScope {
    settings: Arc<SettingsService>,
    prefix: &'static str,
    epoch: Epoch,
}

impl SettingsScope {
    pub fn new(settings: Arc<SettingsService>, prefix: &'static str) -> Self {
        Self {
            settings,
            prefix,
            epoch: Epoch::new(),
        }
    }

    pub fn settings(&self) -> &Arc<SettingsService> {
        &self.settings
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.current()
    }

    /// Full key for `name`, e.g. `camera.fly_move_speed`.
    pub fn key(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, name)
    }

    // -- reads -------------------------------------------------------------

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.settings.get_bool(&self.key(name)).unwrap_or(default)
    }

    pub fn float_or(&self, name: &str, default: f32) -> f32 {
        self.settings.get_float(&self.key(name)).unwrap_or(default)
    }

    /// Stored float clamped into `range`; hand-edited files may hold anything.
    pub fn float_in(&self, name: &str, default: f32, range: RangeInclusive<f32>) -> f32 {
        self.float_or(name, default)
            .clamp(*range.start(), *range.end())
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.settings.get_string(&self.key(name))
    }

    pub fn vec2i(&self, name: &str) -> Option<IVec2> {
        self.settings.get_vec2i(&self.key(name))
    }

    pub fn vec3_or(&self, name: &str, default: Vec3) -> Vec3 {
        self.settings.get_vec3(&self.key(name)).unwrap_or(default)
    }

    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.settings.get(&self.key(name))
    }

    pub fn get_or<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.get(name).unwrap_or(default)
    }

    // -- writes ------------------------------------------------------------

    pub fn set_bool(&self, name: &str, value: bool) -> Result<bool, SettingsError> {
        self.track(self.settings.set_bool(&self.key(name), value))
    }

    pub fn set_float(&self, name: &str, value: f32) -> Result<bool, SettingsError> {
        self.track(self.settings.set_float(&self.key(name), value))
    }

    /// Reject non-finite input, then clamp into `range` before storing.
    pub fn set_float_in(
        &self,
        name: &str,
        value: f32,
        range: RangeInclusive<f32>,
    ) -> Result<bool, SettingsError> {
        let value = self.finite(name, value)?;
        self.set_float(name, value.clamp(*range.start(), *range.end()))
    }

    pub fn set_string(&self, name: &str, value: impl Into<String>) -> Result<bool, SettingsError> {
        self.track(self.settings.set_string(&self.key(name), value))
    }

    pub fn set_vec2i(&self, name: &str, value: IVec2) -> Result<bool, SettingsError> {
        self.track(self.settings.set_vec2i(&self.key(name), value))
    }

    pub fn set_vec3(&self, name: &str, value: Vec3) -> Result<bool, SettingsError> {
        self.track(self.settings.set_vec3(&self.key(name), value))
    }

    pub fn set<T: Serialize>(&self, name: &str, value: &T) -> Result<bool, SettingsError> {
        self.track(self.settings.set(&self.key(name), value))
    }

    /// Remove `name`; returns whether anything was stored.
    pub fn remove(&self, name: &str) -> Result<bool, SettingsError> {
        let removed = self.settings.remove(&self.key(name))?.is_some();
        self.track(Ok(removed))
    }

    /// Drop every key below the prefix so defaults apply again.
    pub fn reset(&self) -> Result<bool, SettingsError> {
        let removed = self.settings.remove(self.prefix)?.is_some();
        self.track(Ok(removed))
    }

    /// Fail with `NonFiniteFloat` for NaN or infinite input.
    pub fn finite(&self, name: &str, value: f32) -> Result<f32, SettingsError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(SettingsError::NonFiniteFloat { key: self.key(name) })
        }
    }

    /// Like [`SettingsScope::finite`] for every component of `value`.
    pub fn finite_vec3(&self, name: &str, value: Vec3) -> Result<Vec3, SettingsError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(SettingsError::NonFiniteFloat { key: self.key(name) })
        }
    }

    /// Bump the epoch for an externally detected change.
    pub fn touch(&self) -> u64 {
        self.epoch.bump()
    }

    fn track(&self, result: Result<bool, SettingsError>) -> Result<bool, SettingsError> {
        if let Ok(true) = result {
            self.epoch.bump();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> SettingsScope {
        SettingsScope::new(Arc::new(SettingsService::new()), "camera")
    }

    #[test]
    fn keys_are_prefixed() {
        let scope = scope();
        scope.set_float("fly_move_speed", 3.0).unwrap();
        assert_eq!(scope.settings().get_float("camera.fly_move_speed"), Some(3.0));
        assert_eq!(scope.float_or("fly_move_speed", 1.0), 3.0);
        assert_eq!(scope.float_or("missing", 1.0), 1.0);
    }

    #[test]
    fn epoch_counts_effective_changes_only() {
        let scope = scope();
        assert!(scope.set_bool("invert_y", true).unwrap());
        assert!(!scope.set_bool("invert_y", true).unwrap());
        assert_eq!(scope.epoch(), 1);

        assert!(scope.remove("invert_y").unwrap());
        assert!(!scope.remove("invert_y").unwrap());
        assert_eq!(scope.epoch(), 2);
    }

    #[test]
    fn clamped_writes_and_reads() {
        let scope = scope();
        scope.set_float_in("fov_degrees", 500.0, 10.0..=120.0).unwrap();
        assert_eq!(scope.float_or("fov_degrees", 0.0), 120.0);

        scope.settings().set_float("camera.fov_degrees", 1.0).unwrap();
        assert_eq!(scope.float_in("fov_degrees", 60.0, 10.0..=120.0), 10.0);

        assert!(matches!(
            scope.set_float_in("fov_degrees", f32::NAN, 10.0..=120.0),
            Err(SettingsError::NonFiniteFloat { .. })
        ));
    }

    #[test]
    fn reset_drops_subtree() {
        let scope = scope();
        scope.set_float("fly_move_speed", 3.0).unwrap();
        scope.set_bool("invert_y", true).unwrap();
        scope.settings().set_bool("grid.enabled", true).unwrap();

        assert!(scope.reset().unwrap());
        assert!(!scope.settings().contains("camera"));
        assert_eq!(scope.settings().get_bool("grid.enabled"), Some(true));
        assert!(!scope.reset().unwrap());
    }
}
