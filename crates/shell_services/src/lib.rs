//! Shell Services Layer
//!
//! Domain settings for the demo shell's panels. Every service reads and
//! writes through one shared [`SettingsService`] under its own key prefix,
//! counts its effective changes in an epoch, and some push their values
//! into engine objects bound through [`Binding`].

pub mod binding;
pub mod camera;
pub mod content;
pub mod environment;
pub mod file_browser;
pub mod grid;
pub mod input;
pub mod post_process;
pub mod rendering;
pub mod scope;
pub mod skybox;
pub mod ui;

pub use binding::Binding;
pub use camera::{CameraMode, CameraPose, CameraRig, CameraSettingsService, ControllerTuning, Projection};
pub use content::ContentSettingsService;
pub use environment::{EnvironmentSettingsService, EnvironmentTarget, FogParams, SkyParams, SunParams};
pub use file_browser::{
    ActiveDialog, DialogKind, DialogOutcome, DialogTicket, FileBrowserError, FileBrowserService,
    FileDialogRequest, FileFilter,
};
pub use grid::{GridColors, GridSettingsService};
pub use input::InputSettingsService;
pub use post_process::{
    exposure_scale, ExposureMode, ExposureParams, ExposureTarget, PostProcessSettingsService,
    PostProcessVolume, Tonemapper,
};
pub use rendering::{RenderingSettingsService, ViewMode};
pub use scope::SettingsScope;
pub use skybox::{SkyTarget, SkyboxDescriptor, SkyboxError, SkyboxService};
pub use ui::UiSettingsService;

use shell_settings::{SettingsError, SettingsService};
use std::sync::Arc;

/// Common surface of the per-panel services.
pub trait DomainService {
    fn scope(&self) -> &SettingsScope;

    /// Current values as JSON, defaults filled in.
    fn snapshot_value(&self) -> serde_json::Value;

    fn name(&self) -> &'static str {
        self.scope().prefix()
    }

    fn epoch(&self) -> u64 {
        self.scope().epoch()
    }

    /// Drop every stored value so the defaults apply again.
    fn reset(&self) -> Result<bool, SettingsError> {
        self.scope().reset()
    }
}

/// Every domain service, built over one store.
pub struct ShellServices {
    settings: Arc<SettingsService>,
    pub camera: CameraSettingsService,
    pub input: InputSettingsService,
    pub environment: EnvironmentSettingsService,
    pub post_process: PostProcessSettingsService,
    pub ui: UiSettingsService,
    pub grid: GridSettingsService,
    pub rendering: RenderingSettingsService,
    pub content: ContentSettingsService,
    pub skybox: SkyboxService,
    pub file_browser: FileBrowserService,
}

impl ShellServices {
    pub fn new(settings: Arc<SettingsService>) -> Self {
        tracing::debug!("initialising shell services");
        Self {
            camera: CameraSettingsService::new(settings.clone()),
            input: InputSettingsService::new(settings.clone()),
            environment: EnvironmentSettingsService::new(settings.clone()),
            post_process: PostProcessSettingsService::new(settings.clone()),
            ui: UiSettingsService::new(settings.clone()),
            grid: GridSettingsService::new(settings.clone()),
            rendering: RenderingSettingsService::new(settings.clone()),
            content: ContentSettingsService::new(settings.clone()),
            skybox: SkyboxService::new(settings.clone()),
            file_browser: FileBrowserService::new(settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &Arc<SettingsService> {
        &self.settings
    }

    /// Sum of the service epochs; changes whenever any service changes.
    pub fn epoch(&self) -> u64 {
        self.services().iter().map(|service| service.epoch()).sum()
    }

    /// Persist the store if anything changed. Returns whether a write happened.
    pub fn save(&self) -> Result<bool, SettingsError> {
        self.settings.save_if_dirty()
    }

    pub fn services(&self) -> Vec<&dyn DomainService> {
        vec![
            &self.camera,
            &self.input,
            &self.environment,
            &self.post_process,
            &self.ui,
            &self.grid,
            &self.rendering,
            &self.content,
            &self.skybox,
            &self.file_browser,
        ]
    }

    pub fn find(&self, name: &str) -> Option<&dyn DomainService> {
        self.services().into_iter().find(|service| service.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_are_their_prefixes() {
        let shell = ShellServices::new(Arc::new(SettingsService::new()));
        let names: Vec<&str> = shell.services().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "camera",
                "input",
                "environment",
                "post_process",
                "ui",
                "grid",
                "rendering",
                "content",
                "skybox",
                "file_browser",
            ]
        );
        assert!(shell.find("grid").is_some());
        assert!(shell.find("audio").is_none());
    }

    #[test]
    fn epoch_tracks_every_service() {
        let shell = ShellServices::new(Arc::new(SettingsService::new()));
        assert_eq!(shell.epoch(), 0);
        shell.grid.set_enabled(false).unwrap();
        shell.ui.toggle_panel("console").unwrap();
        assert_eq!(shell.epoch(), 2);

        // Unchanged writes are free
        shell.grid.set_enabled(false).unwrap();
        assert_eq!(shell.epoch(), 2);
    }

    #[test]
    fn services_share_one_document() {
        let settings = Arc::new(SettingsService::new());
        let shell = ShellServices::new(settings.clone());
        shell.rendering.set_vsync(false).unwrap();
        shell.camera.set_mode(CameraMode::Fly).unwrap();

        let mut top = settings.keys("");
        top.sort();
        assert_eq!(top, ["camera", "rendering"]);
        assert_eq!(shell.camera.snapshot_value()["mode"], "fly");
    }

    #[test]
    fn reset_restores_defaults() {
        let shell = ShellServices::new(Arc::new(SettingsService::new()));
        shell.grid.set_enabled(false).unwrap();
        let grid = shell.find("grid").unwrap();
        assert!(grid.reset().unwrap());
        assert!(shell.grid.enabled());
        assert!(!grid.reset().unwrap());
    }

    #[test]
    fn save_without_changes_is_a_no_op() {
        let shell = ShellServices::new(Arc::new(SettingsService::new()));
        assert!(!shell.save().unwrap());

        shell.ui.set_scale(2.0).unwrap();
        assert!(matches!(shell.save(), Err(SettingsError::NoBackingFile)));
    }
}
