//! Error taxonomy of the pipelines.

use duo_core::{LoadError, SaveError};
use thiserror::Error;

/// A pipeline was asked to draw or trace before it was fully configured.
///
/// Always raised before any pixel is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing mandatory {0} shader stage")]
    MissingStage(&'static str),

    #[error("Viewport has zero size ({width}x{height})")]
    ZeroViewport { width: u32, height: u32 },

    #[error("No render target set")]
    MissingRenderTarget,

    #[error("Render target is {target_width}x{target_height} but the viewport is {width}x{height}")]
    TargetSizeMismatch {
        target_width: u32,
        target_height: u32,
        width: u32,
        height: u32,
    },

    #[error("No vertex buffer set")]
    MissingVertexBuffer,

    #[error("Vertex range {offset}..{end} exceeds the {len} vertices in the buffer")]
    VertexRangeOutOfBounds { offset: usize, end: usize, len: usize },

    #[error("Closest-hit stage casts shadow rays but no shadow tracer is attached")]
    MissingShadowTracer,

    #[error("Acceleration structure has not been built")]
    MissingAccelerationStructure,
}

/// The acceleration structure could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("No triangles to build an acceleration structure from")]
    NoGeometry,
}

/// Anything that can abort a render call.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Acceleration structure build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Failed to load model: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to save image: {0}")]
    Save(#[from] SaveError),

    #[error("Renderer used before init()")]
    NotInitialized,
}
