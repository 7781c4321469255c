//! Per-vertex attribute record shared by both pipelines.

use duo_math::{Vec2, Vec3};

use crate::Color;

/// A mesh vertex with its shading attributes.
///
/// The rasterizer interpolates whole vertices across a triangle and the ray
/// tracer reads them back at hit points, so every attribute lives here rather
/// than in a separate material table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Loaded and interpolated for user texture stages; the built-in
    /// stages do not sample it.
    pub uv: Vec2,
    pub ambient: Color,
    pub diffuse: Color,
    pub emissive: Color,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            uv: Vec2::ZERO,
            ambient: Color::ZERO,
            diffuse: Color::splat(0.5), // Grey default
            emissive: Color::ZERO,
        }
    }
}

impl Vertex {
    /// Vertex with a position and normal and the default grey material.
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            ..Default::default()
        }
    }

    /// Replace the material colors.
    pub fn with_material(mut self, ambient: Color, diffuse: Color, emissive: Color) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.emissive = emissive;
        self
    }

    /// Weighted blend of three vertices.
    ///
    /// `weights` are barycentric (one per vertex, in order). The blended
    /// normal is not renormalized.
    pub fn blend(a: &Vertex, b: &Vertex, c: &Vertex, weights: Vec3) -> Vertex {
        let mix3 = |pa: Vec3, pb: Vec3, pc: Vec3| weights.x * pa + weights.y * pb + weights.z * pc;
        Vertex {
            position: mix3(a.position, b.position, c.position),
            normal: mix3(a.normal, b.normal, c.normal),
            uv: weights.x * a.uv + weights.y * b.uv + weights.z * c.uv,
            ambient: mix3(a.ambient, b.ambient, c.ambient),
            diffuse: mix3(a.diffuse, b.diffuse, c.diffuse),
            emissive: mix3(a.emissive, b.emissive, c.emissive),
        }
    }
}
