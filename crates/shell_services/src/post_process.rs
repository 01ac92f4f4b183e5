//! Exposure and tonemapping

use crate::{Binding, DomainService, SettingsScope};
use serde::{Deserialize, Serialize};
use shell_settings::{SettingsError, SettingsService};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

pub const EV_RANGE: RangeInclusive<f32> = -10.0..=20.0;
pub const COMPENSATION_RANGE: RangeInclusive<f32> = -10.0..=10.0;
pub const ADAPTATION_SPEED_RANGE: RangeInclusive<f32> = 0.01..=100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMode {
    #[default]
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tonemapper {
    None,
    Reinhard,
    #[default]
    AcesFitted,
    Filmic,
    Agx,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExposureParams {
    pub mode: ExposureMode,
    pub manual_ev100: f32,
    pub compensation: f32,
    pub auto_min_ev: f32,
    pub auto_max_ev: f32,
    pub adaptation_speed: f32,
    /// Linear scale applied to scene luminance in manual mode.
    pub scale: f32,
}

/// Rendering pipeline stage that applies exposure.
pub trait ExposureTarget: Send {
    fn set_exposure(&mut self, exposure: &ExposureParams);
}

/// Scene post-process volume.
pub trait PostProcessVolume: Send {
    fn set_tonemapper(&mut self, tonemapper: Tonemapper);
    fn set_exposure_compensation(&mut self, ev: f32);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostProcessSettings {
    pub exposure: ExposureParams,
    pub tonemapper: Tonemapper,
}

/// Linear exposure for an EV100 value after compensation.
pub fn exposure_scale(ev100: f32, compensation: f32) -> f32 {
    1.0 / (1.2 * (ev100 - compensation).exp2())
}

pub struct PostProcessSettingsService {
    scope: SettingsScope,
    pipeline: Binding<dyn ExposureTarget>,
    volume: Binding<dyn PostProcessVolume>,
}

impl PostProcessSettingsService {
    pub const PREFIX: &'static str = "post_process";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
            pipeline: Binding::new(),
            volume: Binding::new(),
        }
    }

    pub fn bind_pipeline(&self, pipeline: &Arc<Mutex<dyn ExposureTarget>>) {
        self.pipeline.bind(pipeline);
        let exposure = self.exposure();
        self.pipeline.with(|p| p.set_exposure(&exposure));
    }

    pub fn bind_volume(&self, volume: &Arc<Mutex<dyn PostProcessVolume>>) {
        self.volume.bind(volume);
        let tonemapper = self.tonemapper();
        let compensation = self.compensation();
        self.volume.with(|v| {
            v.set_tonemapper(tonemapper);
            v.set_exposure_compensation(compensation);
        });
    }

    pub fn unbind_all(&self) {
        self.pipeline.unbind();
        self.volume.unbind();
    }

    pub fn exposure_mode(&self) -> ExposureMode {
        self.scope.get_or("exposure.mode", ExposureMode::default())
    }

    pub fn set_exposure_mode(&self, mode: ExposureMode) -> Result<bool, SettingsError> {
        let changed = self.scope.set("exposure.mode", &mode)?;
        self.push_exposure(changed);
        Ok(changed)
    }

    pub fn manual_ev100(&self) -> f32 {
        self.scope.float_in("exposure.manual_ev100", 9.7, EV_RANGE)
    }

    pub fn set_manual_ev100(&self, ev: f32) -> Result<bool, SettingsError> {
        let changed = self.scope.set_float_in("exposure.manual_ev100", ev, EV_RANGE)?;
        self.push_exposure(changed);
        Ok(changed)
    }

    pub fn compensation(&self) -> f32 {
        self.scope
            .float_in("exposure.compensation", 0.0, COMPENSATION_RANGE)
    }

    pub fn set_compensation(&self, ev: f32) -> Result<bool, SettingsError> {
        let changed = self
            .scope
            .set_float_in("exposure.compensation", ev, COMPENSATION_RANGE)?;
        if changed {
            let compensation = self.compensation();
            self.volume
                .with(|v| v.set_exposure_compensation(compensation));
        }
        self.push_exposure(changed);
        Ok(changed)
    }

    pub fn auto_min_ev(&self) -> f32 {
        self.auto_range().0
    }

    pub fn auto_max_ev(&self) -> f32 {
        self.auto_range().1
    }

    /// Raising the minimum above the maximum drags the maximum along.
    pub fn set_auto_min_ev(&self, ev: f32) -> Result<bool, SettingsError> {
        let ev = self.scope.finite("exposure.auto_min_ev", ev)?;
        let ev = ev.clamp(*EV_RANGE.start(), *EV_RANGE.end());
        let mut changed = self.scope.set_float("exposure.auto_min_ev", ev)?;
        if self.stored_auto_max() < ev {
            changed |= self.scope.set_float("exposure.auto_max_ev", ev)?;
        }
        self.push_exposure(changed);
        Ok(changed)
    }

    /// Lowering the maximum below the minimum drags the minimum along.
    pub fn set_auto_max_ev(&self, ev: f32) -> Result<bool, SettingsError> {
        let ev = self.scope.finite("exposure.auto_max_ev", ev)?;
        let ev = ev.clamp(*EV_RANGE.start(), *EV_RANGE.end());
        let mut changed = self.scope.set_float("exposure.auto_max_ev", ev)?;
        if self.stored_auto_min() > ev {
            changed |= self.scope.set_float("exposure.auto_min_ev", ev)?;
        }
        self.push_exposure(changed);
        Ok(changed)
    }

    pub fn adaptation_speed(&self) -> f32 {
        self.scope
            .float_in("exposure.adaptation_speed", 1.5, ADAPTATION_SPEED_RANGE)
    }

    pub fn set_adaptation_speed(&self, speed: f32) -> Result<bool, SettingsError> {
        let changed = self.scope.set_float_in(
            "exposure.adaptation_speed",
            speed,
            ADAPTATION_SPEED_RANGE,
        )?;
        self.push_exposure(changed);
        Ok(changed)
    }

    pub fn tonemapper(&self) -> Tonemapper {
        self.scope.get_or("tonemapper", Tonemapper::default())
    }

    pub fn set_tonemapper(&self, tonemapper: Tonemapper) -> Result<bool, SettingsError> {
        let changed = self.scope.set("tonemapper", &tonemapper)?;
        if changed {
            self.volume.with(|v| v.set_tonemapper(tonemapper));
        }
        Ok(changed)
    }

    pub fn exposure_scale(&self) -> f32 {
        exposure_scale(self.manual_ev100(), self.compensation())
    }

    pub fn exposure(&self) -> ExposureParams {
        let (auto_min_ev, auto_max_ev) = self.auto_range();
        ExposureParams {
            mode: self.exposure_mode(),
            manual_ev100: self.manual_ev100(),
            compensation: self.compensation(),
            auto_min_ev,
            auto_max_ev,
            adaptation_speed: self.adaptation_speed(),
            scale: self.exposure_scale(),
        }
    }

    pub fn snapshot(&self) -> PostProcessSettings {
        PostProcessSettings {
            exposure: self.exposure(),
            tonemapper: self.tonemapper(),
        }
    }

    fn stored_auto_min(&self) -> f32 {
        self.scope.float_in("exposure.auto_min_ev", -2.0, EV_RANGE)
    }

    fn stored_auto_max(&self) -> f32 {
        self.scope.float_in("exposure.auto_max_ev", 16.0, EV_RANGE)
    }

    /// A hand-edited file may invert the range; reads always order it.
    fn auto_range(&self) -> (f32, f32) {
        let min = self.stored_auto_min();
        let max = self.stored_auto_max();
        (min.min(max), min.max(max))
    }

    fn push_exposure(&self, changed: bool) {
        if changed {
            let exposure = self.exposure();
            self.pipeline.with(|p| p.set_exposure(&exposure));
        }
    }
}

impl DomainService for PostProcessSettingsService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}
