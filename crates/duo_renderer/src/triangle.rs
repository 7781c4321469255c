//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use duo_core::{Color, Vertex};
use duo_math::{Aabb, Interval, Ray, Vec3};

/// A triangle as seen by the ray tracer's shading stages.
///
/// Positions and per-vertex normals are kept for interpolation; the material
/// colors come from the first vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    /// Edge `b - a`
    pub ba: Vec3,
    /// Edge `c - a`
    pub ca: Vec3,
    pub na: Vec3,
    pub nb: Vec3,
    pub nc: Vec3,
    pub ambient: Color,
    pub diffuse: Color,
    pub emissive: Color,
}

impl Triangle {
    pub fn new(va: &Vertex, vb: &Vertex, vc: &Vertex) -> Self {
        Self {
            a: va.position,
            b: vb.position,
            c: vc.position,
            ba: vb.position - va.position,
            ca: vc.position - va.position,
            na: va.normal,
            nb: vb.normal,
            nc: vc.normal,
            ambient: va.ambient,
            diffuse: va.diffuse,
            emissive: va.emissive,
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_triangle(self.a, self.b, self.c)
    }

    /// Unit normal of the triangle's plane following the a -> b -> c winding.
    /// Zero for degenerate triangles.
    pub fn geometric_normal(&self) -> Vec3 {
        self.ba.cross(self.ca).normalize_or_zero()
    }

    /// Point with the given barycentric weights (for a, b, c).
    pub fn point(&self, bary: Vec3) -> Vec3 {
        bary.x * self.a + bary.y * self.b + bary.z * self.c
    }

    /// Weighted sum of the vertex normals. Not renormalized.
    pub fn interpolate_normal(&self, bary: Vec3) -> Vec3 {
        bary.x * self.na + bary.y * self.nb + bary.z * self.nc
    }

    /// Möller-Trumbore intersection.
    ///
    /// Returns the ray parameter and the barycentric weights
    /// `(1 - u - v, u, v)` when the hit lies inside `ray_t`. Both faces count.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<(f32, Vec3)> {
        let h = ray.direction.cross(self.ca);
        let det = self.ba.dot(h);

        // Ray is parallel to the triangle, or the triangle is degenerate.
        // det scales with |direction| |ba| |ca|, so the cutoff does too.
        let scale = ray.direction.length() * self.ba.length() * self.ca.length();
        if det.abs() <= 1e-7 * scale {
            return None;
        }

        let f = 1.0 / det;
        let s = ray.origin - self.a;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.ba);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.ca.dot(q);
        if !ray_t.contains(t) {
            return None;
        }

        Some((t, Vec3::new(1.0 - u - v, u, v)))
    }
}
