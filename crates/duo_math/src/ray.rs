use crate::Vec3;

/// A ray in 3D space with an origin and a direction.
///
/// The direction is not required to be unit length. Its magnitude sets the
/// scale of the ray parameter: `at(1.0)` is always `origin + direction`, so a
/// ray built with [`Ray::between`] reaches its target exactly at `t = 1`.
/// Parametric bounds are not stored on the ray; queries take them as an
/// [`Interval`](crate::Interval).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Ray from `from` towards `to` with the unnormalized separation as its
    /// direction.
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self::new(from, to - from)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Same ray with a unit-length direction.
    pub fn normalized(&self) -> Self {
        Self::new(self.origin, self.direction.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_between_reaches_target_at_one() {
        let from = Vec3::new(1.0, 2.0, 3.0);
        let to = Vec3::new(-4.0, 6.0, 0.5);
        let ray = Ray::between(from, to);

        assert_eq!(ray.at(0.0), from);
        assert!((ray.at(1.0) - to).length() < 1e-6);
        assert!((ray.direction().length() - (to - from).length()).abs() < 1e-6);
    }

    #[test]
    fn test_ray_normalized_keeps_origin() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -4.0));
        let unit = ray.normalized();

        assert_eq!(unit.origin(), ray.origin());
        assert!((unit.direction().length() - 1.0).abs() < 1e-6);
        assert_eq!(unit.at(4.0), ray.at(1.0));
    }
}
