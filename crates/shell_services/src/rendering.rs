//! Renderer toggles exposed in the shell

use crate::{DomainService, SettingsScope};
use serde::{Deserialize, Serialize};
use shell_settings::{SettingsError, SettingsService};
use std::sync::Arc;

pub const MSAA_SAMPLE_COUNTS: [u32; 4] = [1, 2, 4, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Lit,
    Unlit,
    Wireframe,
    Normals,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderingSettings {
    pub view_mode: ViewMode,
    pub vsync: bool,
    pub msaa_samples: u32,
    pub gpu_debug_overlay: bool,
}

pub struct RenderingSettingsService {
    scope: SettingsScope,
}

impl RenderingSettingsService {
    pub const PREFIX: &'static str = "rendering";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.scope.get_or("view_mode", ViewMode::default())
    }

    pub fn set_view_mode(&self, mode: ViewMode) -> Result<bool, SettingsError> {
        self.scope.set("view_mode", &mode)
    }

    pub fn vsync(&self) -> bool {
        self.scope.bool_or("vsync", true)
    }

    pub fn set_vsync(&self, vsync: bool) -> Result<bool, SettingsError> {
        self.scope.set_bool("vsync", vsync)
    }

    pub fn msaa_samples(&self) -> u32 {
        snap_msaa(self.scope.get_or("msaa_samples", 4u32))
    }

    /// Unsupported counts snap down to the nearest supported one.
    pub fn set_msaa_samples(&self, samples: u32) -> Result<bool, SettingsError> {
        self.scope.set("msaa_samples", &snap_msaa(samples))
    }

    pub fn gpu_debug_overlay(&self) -> bool {
        self.scope.bool_or("gpu_debug_overlay", false)
    }

    pub fn set_gpu_debug_overlay(&self, enabled: bool) -> Result<bool, SettingsError> {
        self.scope.set_bool("gpu_debug_overlay", enabled)
    }

    pub fn snapshot(&self) -> RenderingSettings {
        RenderingSettings {
            view_mode: self.view_mode(),
            vsync: self.vsync(),
            msaa_samples: self.msaa_samples(),
            gpu_debug_overlay: self.gpu_debug_overlay(),
        }
    }
}

impl DomainService for RenderingSettingsService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

fn snap_msaa(samples: u32) -> u32 {
    MSAA_SAMPLE_COUNTS
        .iter()
        .rev()
        .copied()
        .find(|&count| count <= samples)
        .unwrap_or(1)
}
