// Re-export glam for convenience
pub use glam::*;

// Duo math types
mod aabb;
mod camera;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use camera::{Camera, PinholeBasis};
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;

/// Cubic Hermite step between `edge0` and `edge1`: `x²(3 − 2x)` on the
/// clamped, rescaled input.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let x = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}
