//! Texture import contract
//!
//! The cooking pipeline lives in the engine; the shell only describes what
//! it wants cooked and checks what comes back.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureShape {
    Texture2D,
    CubeMap,
}

/// How the faces of a cube map are arranged in the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeLayout {
    #[default]
    Equirectangular,
    HorizontalCross,
    VerticalCross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Rgba8Srgb,
    #[default]
    Rgba16Float,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8Srgb => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }
}

/// Length of the full mip chain for a square texture of `size` texels.
pub fn mip_count(size: u32) -> u32 {
    if size == 0 {
        0
    } else {
        u32::BITS - size.leading_zeros()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureImportRequest {
    pub source: PathBuf,
    pub shape: TextureShape,
    pub layout: CubeLayout,
    pub format: TextureFormat,
    /// Edge length of the cooked texture (per face for cube maps).
    pub face_size: u32,
    pub generate_mips: bool,
}

/// Output of the cooking pipeline.
///
/// `data` holds every layer's full mip chain, layer-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CookedTexture {
    pub width: u32,
    pub height: u32,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl CookedTexture {
    /// Bytes a texture with this shape should carry.
    pub fn expected_len(&self) -> usize {
        let bpp = self.format.bytes_per_pixel();
        let per_layer: usize = (0..self.mip_levels)
            .map(|level| {
                let w = (self.width >> level).max(1) as usize;
                let h = (self.height >> level).max(1) as usize;
                w * h * bpp
            })
            .sum();
        per_layer * self.array_layers as usize
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read texture source {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("texture source {path} could not be decoded: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("texture cooker does not support {0}")]
    Unsupported(String),
}

/// Implemented by the engine's texture cooking pipeline.
pub trait TextureImporter: Send + Sync {
    fn import(&self, request: &TextureImportRequest) -> Result<CookedTexture, ImportError>;
}
