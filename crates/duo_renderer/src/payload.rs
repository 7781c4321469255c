//! Per-ray result record.

use duo_core::Color;
use duo_math::Vec3;

use crate::Intersection;

/// Where and what a ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Ray parameter of the hit, in the ray's own (possibly unnormalized) scale
    pub t: f32,
    /// Barycentric weights for the triangle's a, b, c
    pub bary: Vec3,
    /// Index of the triangle in the acceleration structure
    pub triangle: usize,
}

impl From<Intersection> for Hit {
    fn from(i: Intersection) -> Self {
        Self {
            t: i.t,
            bary: i.bary,
            triangle: i.triangle,
        }
    }
}

/// Result of tracing one ray.
///
/// `hit` is the only record of whether anything was intersected: a hit at
/// `t == 0` is still a hit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Payload {
    pub hit: Option<Hit>,
    pub color: Color,
}

impl Payload {
    /// No intersection, with a background color.
    pub fn miss(color: Color) -> Self {
        Self { hit: None, color }
    }

    /// Intersection awaiting shading.
    pub fn from_hit(hit: Hit) -> Self {
        Self {
            hit: Some(hit),
            color: Color::ZERO,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// Hit distance, if any.
    pub fn t(&self) -> Option<f32> {
        self.hit.map(|hit| hit.t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_at_zero_is_not_a_miss() {
        let payload = Payload::from_hit(Hit {
            t: 0.0,
            bary: Vec3::X,
            triangle: 0,
        });
        assert!(payload.is_hit());
        assert_eq!(payload.t(), Some(0.0));
    }

    #[test]
    fn test_miss_has_no_distance() {
        let payload = Payload::miss(Color::ONE);
        assert!(!payload.is_hit());
        assert_eq!(payload.t(), None);
        assert_eq!(payload.color, Color::ONE);
        assert_eq!(Payload::default().t(), None);
    }
}
