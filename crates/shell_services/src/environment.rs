//! Environment and sky parameters

use crate::{Binding, DomainService, SettingsScope};
use glam::Vec3;
use serde::Serialize;
use shell_core::math::{direction_from_angles, wrap_degrees};
use shell_settings::{SettingsError, SettingsService};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

pub const ELEVATION_RANGE: RangeInclusive<f32> = -90.0..=90.0;
pub const SUN_INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=1.0e6;
pub const SKY_LIGHT_RANGE: RangeInclusive<f32> = 0.0..=1.0e6;
pub const FOG_DENSITY_RANGE: RangeInclusive<f32> = 0.0..=1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SunParams {
    pub enabled: bool,
    pub azimuth_degrees: f32,
    pub elevation_degrees: f32,
    /// Unit vector pointing from the scene toward the sun.
    pub direction: Vec3,
    pub intensity: f32,
    pub color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkyParams {
    pub atmosphere_enabled: bool,
    pub light_intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FogParams {
    pub enabled: bool,
    pub density: f32,
}

/// Scene environment node that owns the sun, sky and fog.
pub trait EnvironmentTarget: Send {
    fn set_sun(&mut self, sun: &SunParams);
    fn set_sky(&mut self, sky: &SkyParams);
    fn set_fog(&mut self, fog: &FogParams);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSettings {
    pub sun: SunParams,
    pub sky: SkyParams,
    pub fog: FogParams,
}

pub struct EnvironmentSettingsService {
    scope: SettingsScope,
    target: Binding<dyn EnvironmentTarget>,
}

impl EnvironmentSettingsService {
    pub const PREFIX: &'static str = "environment";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
            target: Binding::new(),
        }
    }

    pub fn bind_target(&self, target: &Arc<Mutex<dyn EnvironmentTarget>>) {
        self.target.bind(target);
        self.apply();
    }

    pub fn unbind_target(&self) {
        self.target.unbind();
    }

    // -- sun -----------------------------------------------------------------

    pub fn sun_enabled(&self) -> bool {
        self.scope.bool_or("sun.enabled", true)
    }

    pub fn set_sun_enabled(&self, enabled: bool) -> Result<bool, SettingsError> {
        let changed = self.scope.set_bool("sun.enabled", enabled)?;
        self.push_sun(changed);
        Ok(changed)
    }

    pub fn sun_azimuth_degrees(&self) -> f32 {
        wrap_degrees(self.scope.float_or("sun.azimuth_degrees", 45.0))
    }

    /// Azimuth is stored wrapped into `[0, 360)`.
    pub fn set_sun_azimuth_degrees(&self, azimuth: f32) -> Result<bool, SettingsError> {
        let azimuth = self.scope.finite("sun.azimuth_degrees", azimuth)?;
        let changed = self
            .scope
            .set_float("sun.azimuth_degrees", wrap_degrees(azimuth))?;
        self.push_sun(changed);
        Ok(changed)
    }

    pub fn sun_elevation_degrees(&self) -> f32 {
        self.scope
            .float_in("sun.elevation_degrees", 35.0, ELEVATION_RANGE)
    }

    pub fn set_sun_elevation_degrees(&self, elevation: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("sun.elevation_degrees", elevation, ELEVATION_RANGE)?;
        self.push_sun(changed);
        Ok(changed)
    }

    pub fn sun_intensity(&self) -> f32 {
        self.scope.float_in("sun.intensity", 1.0, SUN_INTENSITY_RANGE)
    }

    pub fn set_sun_intensity(&self, intensity: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("sun.intensity", intensity, SUN_INTENSITY_RANGE)?;
        self.push_sun(changed);
        Ok(changed)
    }

    pub fn sun_color(&self) -> Vec3 {
        self.scope
            .vec3_or("sun.color", Vec3::ONE)
            .clamp(Vec3::ZERO, Vec3::ONE)
    }

    /// Linear RGB, each channel clamped into `[0, 1]`.
    pub fn set_sun_color(&self, color: Vec3) -> Result<bool, SettingsError> {
        if !color.is_finite() {
            return Err(SettingsError::NonFiniteFloat {
                key: self.scope.key("sun.color"),
            });
        }
        let changed = self
            .scope
            .set_vec3("sun.color", color.clamp(Vec3::ZERO, Vec3::ONE))?;
        self.push_sun(changed);
        Ok(changed)
    }

    pub fn sun(&self) -> SunParams {
        let azimuth_degrees = self.sun_azimuth_degrees();
        let elevation_degrees = self.sun_elevation_degrees();
        SunParams {
            enabled: self.sun_enabled(),
            azimuth_degrees,
            elevation_degrees,
            direction: direction_from_angles(azimuth_degrees, elevation_degrees),
            intensity: self.sun_intensity(),
            color: self.sun_color(),
        }
    }

    // -- sky -----------------------------------------------------------------

    pub fn atmosphere_enabled(&self) -> bool {
        self.scope.bool_or("sky.atmosphere_enabled", true)
    }

    pub fn set_atmosphere_enabled(&self, enabled: bool) -> Result<bool, SettingsError> {
        let changed = self.scope.set_bool("sky.atmosphere_enabled", enabled)?;
        self.push_sky(changed);
        Ok(changed)
    }

    pub fn sky_light_intensity(&self) -> f32 {
        self.scope
            .float_in("sky.light_intensity", 1.0, SKY_LIGHT_RANGE)
    }

    pub fn set_sky_light_intensity(&self, intensity: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("sky.light_intensity", intensity, SKY_LIGHT_RANGE)?;
        self.push_sky(changed);
        Ok(changed)
    }

    pub fn sky(&self) -> SkyParams {
        SkyParams {
            atmosphere_enabled: self.atmosphere_enabled(),
            light_intensity: self.sky_light_intensity(),
        }
    }

    // -- fog -----------------------------------------------------------------

    pub fn fog_enabled(&self) -> bool {
        self.scope.bool_or("fog.enabled", false)
    }

    pub fn set_fog_enabled(&self, enabled: bool) -> Result<bool, SettingsError> {
        let changed = self.scope.set_bool("fog.enabled", enabled)?;
        self.push_fog(changed);
        Ok(changed)
    }

    pub fn fog_density(&self) -> f32 {
        self.scope.float_in("fog.density", 0.01, FOG_DENSITY_RANGE)
    }

    pub fn set_fog_density(&self, density: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("fog.density", density, FOG_DENSITY_RANGE)?;
        self.push_fog(changed);
        Ok(changed)
    }

    pub fn fog(&self) -> FogParams {
        FogParams {
            enabled: self.fog_enabled(),
            density: self.fog_density(),
        }
    }

    /// Push every block into the bound target.
    pub fn apply(&self) -> bool {
        let settings = self.snapshot();
        self.target
            .with(|target| {
                target.set_sun(&settings.sun);
                target.set_sky(&settings.sky);
                target.set_fog(&settings.fog);
            })
            .is_some()
    }

    pub fn snapshot(&self) -> EnvironmentSettings {
        EnvironmentSettings {
            sun: self.sun(),
            sky: self.sky(),
            fog: self.fog(),
        }
    }

    fn push_sun(&self, changed: bool) {
        if changed {
            let sun = self.sun();
            self.target.with(|target| target.set_sun(&sun));
        }
    }

    fn push_sky(&self, changed: bool) {
        if changed {
            let sky = self.sky();
            self.target.with(|target| target.set_sky(&sky));
        }
    }

    fn push_fog(&self, changed: bool) {
        if changed {
            let fog = self.fog();
            self.target.with(|target| target.set_fog(&fog));
        }
    }
}

impl DomainService for EnvironmentSettingsService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingEnvironment {
        sun: Vec<SunParams>,
        sky: Vec<SkyParams>,
        fog: Vec<FogParams>,
    }

    impl EnvironmentTarget for RecordingEnvironment {
        fn set_sun(&mut self, sun: &SunParams) {
            self.sun.push(*sun);
        }
        fn set_sky(&mut self, sky: &SkyParams) {
            self.sky.push(*sky);
        }
        fn set_fog(&mut self, fog: &FogParams) {
            self.fog.push(*fog);
        }
    }

    fn service() -> EnvironmentSettingsService {
        EnvironmentSettingsService::new(Arc::new(SettingsService::new()))
    }

    #[test]
    fn defaults() {
        let env = service();
        let snapshot = env.snapshot();
        assert!(snapshot.sun.enabled);
        assert_eq!(snapshot.sun.azimuth_degrees, 45.0);
        assert_eq!(snapshot.sun.elevation_degrees, 35.0);
        assert!((snapshot.sun.direction.length() - 1.0).abs() < 1e-5);
        assert!(snapshot.sky.atmosphere_enabled);
        assert!(!snapshot.fog.enabled);
    }

    #[test]
    fn azimuth_wraps_and_elevation_clamps() {
        let env = service();
        env.set_sun_azimuth_degrees(-30.0).unwrap();
        assert_eq!(env.sun_azimuth_degrees(), 330.0);
        env.set_sun_elevation_degrees(120.0).unwrap();
        assert_eq!(env.sun_elevation_degrees(), 90.0);
        assert!((env.sun().direction - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn sun_color_is_clamped() {
        let env = service();
        env.set_sun_color(Vec3::new(2.0, 0.5, -1.0)).unwrap();
        assert_eq!(env.sun_color(), Vec3::new(1.0, 0.5, 0.0));
        assert!(env.set_sun_color(Vec3::new(f32::NAN, 0.0, 0.0)).is_err());
    }

    #[test]
    fn changes_push_only_the_affected_block() {
        let env = service();
        let recorder = Arc::new(Mutex::new(RecordingEnvironment::default()));
        let target: Arc<Mutex<dyn EnvironmentTarget>> = recorder.clone();
        env.bind_target(&target);
        {
            let rec = recorder.lock().unwrap();
            assert_eq!((rec.sun.len(), rec.sky.len(), rec.fog.len()), (1, 1, 1));
        }

        env.set_fog_density(0.2).unwrap();
        env.set_fog_density(0.2).unwrap();
        env.set_sun_intensity(3.0).unwrap();

        let rec = recorder.lock().unwrap();
        assert_eq!((rec.sun.len(), rec.sky.len(), rec.fog.len()), (2, 1, 2));
        assert_eq!(rec.fog.last().unwrap().density, 0.2);
        assert_eq!(rec.sun.last().unwrap().intensity, 3.0);
        assert_eq!(env.epoch(), 2);
    }
}
