//! Skybox source settings and loading
//!
//! Loading hands the configured source to the engine's texture cooker and
//! packs the result into a [`SkyboxDescriptor`] for the scene.

use crate::{Binding, DomainService, SettingsScope};
use serde::Serialize;
use shell_asset::{
    mip_count, CookedTexture, CubeLayout, ImportError, ResourceKey, ResourceRegistry,
    TextureFormat, TextureImportRequest, TextureImporter, TextureShape,
};
use shell_core::math::wrap_degrees;
use shell_settings::{SettingsError, SettingsService};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["hdr", "exr", "png", "jpg", "jpeg", "ktx2", "dds"];
pub const FACE_SIZE_RANGE: RangeInclusive<u32> = 16..=8192;
pub const INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=100.0;
const CUBE_FACES: u32 = 6;

#[derive(Debug, Error)]
pub enum SkyboxError {
    #[error("no skybox source is configured")]
    NoSource,

    #[error("skybox source {0} does not exist")]
    MissingFile(PathBuf),

    #[error("skybox source {0} has an unsupported format")]
    UnsupportedFormat(PathBuf),

    #[error("texture import failed")]
    Import(#[from] ImportError),

    #[error("cooked skybox is invalid: {0}")]
    InvalidCookedTexture(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Everything the scene needs to bind a cooked skybox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkyboxDescriptor {
    pub key: ResourceKey,
    pub source: PathBuf,
    pub format: TextureFormat,
    pub face_size: u32,
    pub mip_levels: u32,
    pub intensity: f32,
    pub rotation_degrees: f32,
    pub byte_len: usize,
}

/// Scene sky that displays the loaded skybox.
pub trait SkyTarget: Send {
    fn set_skybox(&mut self, skybox: &SkyboxDescriptor, texture: &CookedTexture);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkyboxSettings {
    pub source: Option<PathBuf>,
    pub layout: CubeLayout,
    pub format: TextureFormat,
    pub face_size: u32,
    pub generate_mips: bool,
    pub intensity: f32,
    pub rotation_degrees: f32,
    pub loaded: Option<SkyboxDescriptor>,
}

pub struct SkyboxService {
    scope: SettingsScope,
    current: Mutex<Option<SkyboxDescriptor>>,
    sky: Binding<dyn SkyTarget>,
}

impl SkyboxService {
    pub const PREFIX: &'static str = "skybox";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
            current: Mutex::new(None),
            sky: Binding::new(),
        }
    }

    pub fn bind_sky(&self, sky: &Arc<Mutex<dyn SkyTarget>>) {
        self.sky.bind(sky);
    }

    pub fn unbind_sky(&self) {
        self.sky.unbind();
    }

    // -- settings ------------------------------------------------------------

    pub fn source(&self) -> Option<PathBuf> {
        self.scope
            .string("source")
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
    }

    pub fn set_source(&self, source: Option<&Path>) -> Result<bool, SettingsError> {
        match source {
            Some(path) => self
                .scope
                .set_string("source", path.to_string_lossy().into_owned()),
            None => self.scope.remove("source"),
        }
    }

    pub fn layout(&self) -> CubeLayout {
        self.scope.get_or("layout", CubeLayout::default())
    }

    pub fn set_layout(&self, layout: CubeLayout) -> Result<bool, SettingsError> {
        self.scope.set("layout", &layout)
    }

    pub fn format(&self) -> TextureFormat {
        self.scope.get_or("format", TextureFormat::default())
    }

    pub fn set_format(&self, format: TextureFormat) -> Result<bool, SettingsError> {
        self.scope.set("format", &format)
    }

    pub fn face_size(&self) -> u32 {
        normalize_face_size(self.scope.get_or("face_size", 1024u32))
    }

    /// Rounded up to a power of two within [`FACE_SIZE_RANGE`].
    pub fn set_face_size(&self, size: u32) -> Result<bool, SettingsError> {
        self.scope.set("face_size", &normalize_face_size(size))
    }

    pub fn generate_mips(&self) -> bool {
        self.scope.bool_or("generate_mips", true)
    }

    pub fn set_generate_mips(&self, enabled: bool) -> Result<bool, SettingsError> {
        self.scope.set_bool("generate_mips", enabled)
    }

    pub fn intensity(&self) -> f32 {
        self.scope.float_in("intensity", 1.0, INTENSITY_RANGE)
    }

    pub fn set_intensity(&self, intensity: f32) -> Result<bool, SettingsError> {
        self.scope.set_float_in("intensity", intensity, INTENSITY_RANGE)
    }

    pub fn rotation_degrees(&self) -> f32 {
        wrap_degrees(self.scope.float_or("rotation_degrees", 0.0))
    }

    pub fn set_rotation_degrees(&self, rotation: f32) -> Result<bool, SettingsError> {
        let rotation = self.scope.finite("rotation_degrees", rotation)?;
        self.scope.set_float("rotation_degrees", wrap_degrees(rotation))
    }

    // -- loading -------------------------------------------------------------

    /// The most recently loaded skybox.
    pub fn current(&self) -> Option<SkyboxDescriptor> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cook the configured source and make it the current skybox.
    pub fn load(
        &self,
        importer: &dyn TextureImporter,
        registry: &ResourceRegistry,
    ) -> Result<SkyboxDescriptor, SkyboxError> {
        let source = self.source().ok_or(SkyboxError::NoSource)?;
        if !source.is_file() {
            return Err(SkyboxError::MissingFile(source));
        }
        if !is_supported(&source) {
            return Err(SkyboxError::UnsupportedFormat(source));
        }

        let request = TextureImportRequest {
            source: source.clone(),
            shape: TextureShape::CubeMap,
            layout: self.layout(),
            format: self.format(),
            face_size: self.face_size(),
            generate_mips: self.generate_mips(),
        };
        tracing::info!(
            source = %source.display(),
            face_size = request.face_size,
            "cooking skybox"
        );

        let cooked = importer.import(&request)?;
        validate(&request, &cooked)?;

        let descriptor = SkyboxDescriptor {
            key: registry.key_for(&source),
            source,
            format: cooked.format,
            face_size: cooked.width,
            mip_levels: cooked.mip_levels,
            intensity: self.intensity(),
            rotation_degrees: self.rotation_degrees(),
            byte_len: cooked.data.len(),
        };

        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(descriptor.clone());
        self.scope.touch();
        self.sky.with(|sky| sky.set_skybox(&descriptor, &cooked));
        tracing::info!(key = %descriptor.key, bytes = descriptor.byte_len, "skybox loaded");
        Ok(descriptor)
    }

    /// Point the settings at `source` and load it.
    pub fn load_from(
        &self,
        source: &Path,
        importer: &dyn TextureImporter,
        registry: &ResourceRegistry,
    ) -> Result<SkyboxDescriptor, SkyboxError> {
        self.set_source(Some(source))?;
        self.load(importer, registry)
    }

    pub fn snapshot(&self) -> SkyboxSettings {
        SkyboxSettings {
            source: self.source(),
            layout: self.layout(),
            format: self.format(),
            face_size: self.face_size(),
            generate_mips: self.generate_mips(),
            intensity: self.intensity(),
            rotation_degrees: self.rotation_degrees(),
            loaded: self.current(),
        }
    }
}

impl DomainService for SkyboxService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

fn normalize_face_size(size: u32) -> u32 {
    size.clamp(*FACE_SIZE_RANGE.start(), *FACE_SIZE_RANGE.end())
        .next_power_of_two()
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn validate(request: &TextureImportRequest, cooked: &CookedTexture) -> Result<(), SkyboxError> {
    let invalid = |reason: String| Err(SkyboxError::InvalidCookedTexture(reason));

    if cooked.array_layers != CUBE_FACES {
        return invalid(format!("expected {CUBE_FACES} faces, got {}", cooked.array_layers));
    }
    if cooked.width != cooked.height {
        return invalid(format!("faces are {}x{}, not square", cooked.width, cooked.height));
    }
    if cooked.width != request.face_size {
        return invalid(format!(
            "face size {} does not match requested {}",
            cooked.width, request.face_size
        ));
    }
    if cooked.format != request.format {
        return invalid(format!(
            "format {:?} does not match requested {:?}",
            cooked.format, request.format
        ));
    }

    let max_mips = mip_count(cooked.width);
    let mips_ok = if request.generate_mips {
        cooked.mip_levels == max_mips
    } else {
        cooked.mip_levels == 1
    };
    if !mips_ok {
        return invalid(format!("unexpected mip count {}", cooked.mip_levels));
    }

    if cooked.data.len() != cooked.expected_len() {
        return invalid(format!(
            "payload is {} bytes, expected {}",
            cooked.data.len(),
            cooked.expected_len()
        ));
    }
    Ok(())
}
