//! Duo Renderer - two CPU pipelines over one scene.
//!
//! - A rasterizer: vertex stage, scan conversion, depth test, pixel stage.
//! - A ray tracer: primary rays through a BVH, closest-hit / miss / any-hit
//!   stages, and shadow rays traced by a second tracer instance that shares
//!   the first one's acceleration structure.
//!
//! Shader stages are plain data (see [`shader`]), so a pipeline's behaviour
//! is fully described by the values it was configured with.

mod bucket;
mod bvh;
mod error;
mod frame;
mod payload;
mod rasterizer;
mod raytracer;
pub mod shader;
mod triangle;

pub use bucket::{generate_buckets, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{AccelerationStructure, Intersection};
pub use error::{BuildError, ConfigurationError, RenderError};
pub use frame::{
    RasterizationRenderer, RayTracingRenderer, RenderMode, Renderer, UnknownRenderMode,
};
pub use payload::{Hit, Payload};
pub use rasterizer::{RasterStats, Rasterizer};
pub use raytracer::RayTracer;
pub use shader::{
    AnyHitShader, ClosestHitShader, MissShader, PixelShader, RasterShaders, RayShaders,
    VertexShader,
};
pub use triangle::Triangle;

/// Re-export the shared scene and math types.
pub use duo_core::{Color, Light, Resource, UnsignedColor, Vertex};
pub use duo_math::{Interval, Ray, Vec3};
