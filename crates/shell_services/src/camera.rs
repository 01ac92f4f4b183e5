//! Camera rig settings

use crate::{Binding, DomainService, SettingsScope};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use shell_settings::{SettingsError, SettingsService};
use std::sync::{Arc, Mutex};

pub const FLY_SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.01..=1000.0;
pub const FLY_BOOST_RANGE: std::ops::RangeInclusive<f32> = 1.0..=100.0;
pub const ORBIT_DISTANCE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=10_000.0;
pub const ORBIT_ZOOM_RANGE: std::ops::RangeInclusive<f32> = 0.01..=100.0;
pub const FOV_RANGE: std::ops::RangeInclusive<f32> = 10.0..=120.0;
const MIN_NEAR_PLANE: f32 = 0.001;
const MAX_FAR_PLANE: f32 = 1.0e7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    #[default]
    Orbit,
    Fly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

/// Controller tuning applied to the active camera rig
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerTuning {
    pub fly_move_speed: f32,
    pub fly_boost_multiplier: f32,
    pub orbit_distance: f32,
    pub orbit_zoom_speed: f32,
}

/// Scene camera node driven by the shell.
pub trait CameraRig: Send {
    fn set_mode(&mut self, mode: CameraMode);
    fn set_projection(&mut self, projection: Projection);
    fn set_tuning(&mut self, tuning: ControllerTuning);
    fn set_pose(&mut self, pose: CameraPose);
    fn pose(&self) -> CameraPose;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSettings {
    pub mode: CameraMode,
    pub projection: Projection,
    pub tuning: ControllerTuning,
    pub pose: CameraPose,
}

pub struct CameraSettingsService {
    scope: SettingsScope,
    rig: Binding<dyn CameraRig>,
}

impl CameraSettingsService {
    pub const PREFIX: &'static str = "camera";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
            rig: Binding::new(),
        }
    }

    /// Bind the live camera and push the stored settings into it.
    pub fn bind_rig(&self, rig: &Arc<Mutex<dyn CameraRig>>) {
        self.rig.bind(rig);
        self.apply_to_rig();
    }

    pub fn unbind_rig(&self) {
        self.rig.unbind();
    }

    pub fn has_rig(&self) -> bool {
        self.rig.is_bound()
    }

    // -- mode --------------------------------------------------------------

    pub fn mode(&self) -> CameraMode {
        self.scope.get_or("mode", CameraMode::default())
    }

    pub fn set_mode(&self, mode: CameraMode) -> Result<bool, SettingsError> {
        let changed = self.scope.set("mode", &mode)?;
        if changed {
            self.rig.with(|rig| rig.set_mode(mode));
        }
        Ok(changed)
    }

    // -- controller tuning ---------------------------------------------------

    pub fn fly_move_speed(&self) -> f32 {
        self.scope.float_in("fly_move_speed", 5.0, FLY_SPEED_RANGE)
    }

    pub fn set_fly_move_speed(&self, speed: f32) -> Result<bool, SettingsError> {
        let changed = self.scope.set_float_in("fly_move_speed", speed, FLY_SPEED_RANGE)?;
        self.push_tuning(changed);
        Ok(changed)
    }

    pub fn fly_boost_multiplier(&self) -> f32 {
        self.scope.float_in("fly_boost_multiplier", 4.0, FLY_BOOST_RANGE)
    }

    pub fn set_fly_boost_multiplier(&self, multiplier: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("fly_boost_multiplier", multiplier, FLY_BOOST_RANGE)?;
        self.push_tuning(changed);
        Ok(changed)
    }

    pub fn orbit_distance(&self) -> f32 {
        self.scope.float_in("orbit_distance", 10.0, ORBIT_DISTANCE_RANGE)
    }

    pub fn set_orbit_distance(&self, distance: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("orbit_distance", distance, ORBIT_DISTANCE_RANGE)?;
        self.push_tuning(changed);
        Ok(changed)
    }

    pub fn orbit_zoom_speed(&self) -> f32 {
        self.scope.float_in("orbit_zoom_speed", 1.0, ORBIT_ZOOM_RANGE)
    }

    pub fn set_orbit_zoom_speed(&self, speed: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("orbit_zoom_speed", speed, ORBIT_ZOOM_RANGE)?;
        self.push_tuning(changed);
        Ok(changed)
    }

    pub fn tuning(&self) -> ControllerTuning {
        ControllerTuning {
            fly_move_speed: self.fly_move_speed(),
            fly_boost_multiplier: self.fly_boost_multiplier(),
            orbit_distance: self.orbit_distance(),
            orbit_zoom_speed: self.orbit_zoom_speed(),
        }
    }

    // -- projection ----------------------------------------------------------

    pub fn fov_degrees(&self) -> f32 {
        self.scope.float_in("fov_degrees", 60.0, FOV_RANGE)
    }

    pub fn set_fov_degrees(&self, fov: f32) -> Result<bool, SettingsError> {
        let changed = self.scope.set_float_in("fov_degrees", fov, FOV_RANGE)?;
        self.push_projection(changed);
        Ok(changed)
    }

    pub fn far_plane(&self) -> f32 {
        self.scope
            .float_in("far_plane", 1000.0, MIN_NEAR_PLANE * 2.0..=MAX_FAR_PLANE)
    }

    /// The far plane never moves inside the near plane.
    pub fn set_far_plane(&self, far: f32) -> Result<bool, SettingsError> {
        let far = self.scope.finite("far_plane", far)?;
        let min = self.near_plane() * 1.001;
        let changed = self
            .scope
            .set_float_in("far_plane", far, min..=MAX_FAR_PLANE)?;
        self.push_projection(changed);
        Ok(changed)
    }

    pub fn near_plane(&self) -> f32 {
        let far = self.far_plane();
        self.scope.float_in("near_plane", 0.1, MIN_NEAR_PLANE..=far * 0.999)
    }

    /// The near plane is kept strictly in front of the far plane.
    pub fn set_near_plane(&self, near: f32) -> Result<bool, SettingsError> {
        let near = self.scope.finite("near_plane", near)?;
        let max = self.far_plane() * 0.999;
        let changed = self
            .scope
            .set_float_in("near_plane", near, MIN_NEAR_PLANE..=max)?;
        self.push_projection(changed);
        Ok(changed)
    }

    pub fn projection(&self) -> Projection {
        Projection {
            fov_degrees: self.fov_degrees(),
            near_plane: self.near_plane(),
            far_plane: self.far_plane(),
        }
    }

    // -- pose ----------------------------------------------------------------

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.scope.vec3_or("position", Vec3::new(0.0, 2.0, 10.0)),
            target: self.scope.vec3_or("target", Vec3::ZERO),
        }
    }

    /// Both vectors are checked before either is stored.
    pub fn set_pose(&self, pose: CameraPose) -> Result<bool, SettingsError> {
        self.scope.finite_vec3("position", pose.position)?;
        self.scope.finite_vec3("target", pose.target)?;
        let moved = self.scope.set_vec3("position", pose.position)?;
        let retargeted = self.scope.set_vec3("target", pose.target)?;
        let changed = moved || retargeted;
        if changed {
            self.rig.with(|rig| rig.set_pose(pose));
        }
        Ok(changed)
    }

    /// Persist the bound rig's current pose. Returns `false` without a rig.
    pub fn capture_from_rig(&self) -> Result<bool, SettingsError> {
        let Some(pose) = self.rig.with(|rig| rig.pose()) else {
            return Ok(false);
        };
        self.scope.finite_vec3("position", pose.position)?;
        self.scope.finite_vec3("target", pose.target)?;
        let moved = self.scope.set_vec3("position", pose.position)?;
        let retargeted = self.scope.set_vec3("target", pose.target)?;
        Ok(moved || retargeted)
    }

    /// Push every stored value into the bound rig.
    pub fn apply_to_rig(&self) -> bool {
        let settings = self.snapshot();
        self.rig
            .with(|rig| {
                rig.set_mode(settings.mode);
                rig.set_projection(settings.projection);
                rig.set_tuning(settings.tuning);
                rig.set_pose(settings.pose);
            })
            .is_some()
    }

    pub fn snapshot(&self) -> CameraSettings {
        CameraSettings {
            mode: self.mode(),
            projection: self.projection(),
            tuning: self.tuning(),
            pose: self.pose(),
        }
    }

    fn push_tuning(&self, changed: bool) {
        if changed {
            let tuning = self.tuning();
            self.rig.with(|rig| rig.set_tuning(tuning));
        }
    }

    fn push_projection(&self, changed: bool) {
        if changed {
            let projection = self.projection();
            self.rig.with(|rig| rig.set_projection(projection));
        }
    }
}

impl DomainService for CameraSettingsService {
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
    struct RecordingRig {
        mode: Option<CameraMode>,
        projection: Option<Projection>,
        tuning: Option<ControllerTuning>,
        pose: Option<CameraPose>,
        pushes: usize,
    }

    impl CameraRig for RecordingRig {
        fn set_mode(&mut self, mode: CameraMode) {
            self.mode = Some(mode);
            self.pushes += 1;
        }
        fn set_projection(&mut self, projection: Projection) {
            self.projection = Some(projection);
            self.pushes += 1;
        }
        fn set_tuning(&mut self, tuning: ControllerTuning) {
            self.tuning = Some(tuning);
            self.pushes += 1;
        }
        fn set_pose(&mut self, pose: CameraPose) {
            self.pose = Some(pose);
            self.pushes += 1;
        }
        fn pose(&self) -> CameraPose {
            self.pose.unwrap_or(CameraPose {
                position: Vec3::new(1.0, 2.0, 3.0),
                target: Vec3::new(0.0, 1.0, 0.0),
            })
        }
    }

    fn service() -> CameraSettingsService {
        CameraSettingsService::new(Arc::new(SettingsService::new()))
    }

    #[test]
    fn defaults_without_stored_values() {
        let camera = service();
        let snapshot = camera.snapshot();
        assert_eq!(snapshot.mode, CameraMode::Orbit);
        assert_eq!(snapshot.projection.fov_degrees, 60.0);
        assert_eq!(snapshot.projection.near_plane, 0.1);
        assert_eq!(snapshot.projection.far_plane, 1000.0);
        assert_eq!(snapshot.tuning.fly_move_speed, 5.0);
        assert_eq!(snapshot.pose.position, Vec3::new(0.0, 2.0, 10.0));
        assert_eq!(camera.epoch(), 0);
    }

    #[test]
    fn setters_persist_through_shared_store() {
        let settings = Arc::new(SettingsService::new());
        let camera = CameraSettingsService::new(settings.clone());

        camera.set_mode(CameraMode::Fly).unwrap();
        camera.set_fly_move_speed(12.0).unwrap();
        assert_eq!(settings.get_string("camera.mode").as_deref(), Some("fly"));
        assert_eq!(settings.get_float("camera.fly_move_speed"), Some(12.0));

        let other = CameraSettingsService::new(settings);
        assert_eq!(other.mode(), CameraMode::Fly);
        assert_eq!(other.fly_move_speed(), 12.0);
    }

    #[test]
    fn values_are_clamped() {
        let camera = service();
        camera.set_fov_degrees(400.0).unwrap();
        assert_eq!(camera.fov_degrees(), 120.0);
        camera.set_fly_move_speed(-3.0).unwrap();
        assert_eq!(camera.fly_move_speed(), 0.01);
        assert!(camera.set_orbit_distance(f32::NAN).is_err());
    }

    #[test]
    fn near_plane_stays_in_front_of_far_plane() {
        let camera = service();
        camera.set_far_plane(50.0).unwrap();
        camera.set_near_plane(80.0).unwrap();
        let projection = camera.projection();
        assert!(projection.near_plane < projection.far_plane);

        camera.set_far_plane(0.0).unwrap();
        let projection = camera.projection();
        assert!(projection.near_plane < projection.far_plane);
    }

    #[test]
    fn epoch_tracks_effective_changes() {
        let camera = service();
        camera.set_fly_move_speed(8.0).unwrap();
        camera.set_fly_move_speed(8.0).unwrap();
        assert_eq!(camera.epoch(), 1);
        camera.set_mode(CameraMode::Fly).unwrap();
        assert_eq!(camera.epoch(), 2);
    }

    #[test]
    fn bound_rig_receives_updates() {
        let camera = service();
        let rig = Arc::new(Mutex::new(RecordingRig::default()));
        let as_rig: Arc<Mutex<dyn CameraRig>> = rig.clone();

        camera.bind_rig(&as_rig);
        assert!(camera.has_rig());
        assert_eq!(rig.lock().unwrap().pushes, 4);

        camera.set_fov_degrees(75.0).unwrap();
        assert_eq!(rig.lock().unwrap().projection.unwrap().fov_degrees, 75.0);

        camera.set_mode(CameraMode::Fly).unwrap();
        assert_eq!(rig.lock().unwrap().mode, Some(CameraMode::Fly));

        // No push when nothing changed
        let pushes = rig.lock().unwrap().pushes;
        camera.set_mode(CameraMode::Fly).unwrap();
        assert_eq!(rig.lock().unwrap().pushes, pushes);
    }

    #[test]
    fn captures_pose_from_rig() {
        let camera = service();
        assert!(!camera.capture_from_rig().unwrap());

        let rig: Arc<Mutex<dyn CameraRig>> = Arc::new(Mutex::new(RecordingRig::default()));
        camera.bind_rig(&rig);
        rig.lock().unwrap().set_pose(CameraPose {
            position: Vec3::new(4.0, 5.0, 6.0),
            target: Vec3::new(1.0, 0.0, 0.0),
        });

        assert!(camera.capture_from_rig().unwrap());
        assert_eq!(camera.pose().position, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(camera.pose().target, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn dropped_rig_is_ignored() {
        let camera = service();
        {
            let rig: Arc<Mutex<dyn CameraRig>> = Arc::new(Mutex::new(RecordingRig::default()));
            camera.bind_rig(&rig);
        }
        assert!(!camera.has_rig());
        assert!(camera.set_fov_degrees(90.0).unwrap());
        assert!(!camera.apply_to_rig());
    }

    #[test]
    fn non_finite_pose_stores_nothing() {
        let camera = service();
        let result = camera.set_pose(CameraPose {
            position: Vec3::new(1.0, 1.0, 1.0),
            target: Vec3::new(0.0, f32::INFINITY, 0.0),
        });
        assert!(matches!(result, Err(SettingsError::NonFiniteFloat { .. })));
        assert_eq!(camera.pose().position, Vec3::new(0.0, 2.0, 10.0));
        assert_eq!(camera.epoch(), 0);
    }
}
