use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box used by the BVH.
///
/// Stored as one [`Interval`] per axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Thinnest extent allowed on any axis; flatter boxes are padded so the
    /// slab test keeps a non-empty range for axis-aligned triangles.
    const MIN_EXTENT: f32 = 0.0001;

    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        };
        aabb.pad_to_minimums();
        aabb
    }

    /// Bounding box of a triangle's three corners.
    pub fn from_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_points(a.min(b).min(c), a.max(b).max(c))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Slab test against the ray parameter range `ray_t`.
    ///
    /// Returns the parameter at which the ray enters the box (clamped to
    /// `ray_t.min`), or `None` if the ray misses it inside the range. The
    /// parameter is in the ray's own, possibly unnormalized, scale.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<f32> {
        let mut range = ray_t;
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let inv_d = 1.0 / ray.direction[axis];
            let mut t0 = (slab.min - ray.origin[axis]) * inv_d;
            let mut t1 = (slab.max - ray.origin[axis]) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            range.min = t0.max(range.min);
            range.max = t1.min(range.max);
            // Inclusive: a zero-length range at the boundary still counts
            if range.max < range.min {
                return None;
            }
        }
        Some(range.min)
    }

    fn pad_to_minimums(&mut self) {
        for slab in [&mut self.x, &mut self.y, &mut self.z] {
            if slab.size() < Self::MIN_EXTENT {
                *slab = slab.expand(Self::MIN_EXTENT);
            }
        }
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(
            (self.x.min + self.x.max) * 0.5,
            (self.y.min + self.y.max) * 0.5,
            (self.z.min + self.z.max) * 0.5,
        )
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_triangle_bounds_all_corners() {
        let aabb = Aabb::from_triangle(
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, -2.0, 2.0),
            Vec3::new(0.0, 4.0, 1.0),
        );

        assert_eq!(aabb.x, Interval::new(-1.0, 3.0));
        assert_eq!(aabb.y, Interval::new(-2.0, 4.0));
        assert_eq!(aabb.z, Interval::new(1.0, 2.0));
    }

    #[test]
    fn test_flat_triangle_is_padded() {
        let aabb = Aabb::from_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!(aabb.z.size() > 0.0);
        assert!(aabb.z.contains(0.0));
    }

    #[test]
    fn test_hit_returns_entry_parameter() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));

        let entry = aabb.hit(&ray, Interval::new(0.0, 100.0)).unwrap();
        assert!((entry - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_hit_respects_unnormalized_scale() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        // Direction of length 10: the box starts at t = 0.4 and ends at 0.6
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 10.0));

        assert!(aabb.hit(&ray, Interval::new(0.0, 1.0)).is_some());
        assert!(aabb.hit(&ray, Interval::new(0.0, 0.3)).is_none());
        assert!(aabb.hit(&ray, Interval::new(0.7, 1.0)).is_none());
    }

    #[test]
    fn test_hit_misses() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));

        // Pointing away
        let away = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(aabb.hit(&away, Interval::new(0.0, 100.0)).is_none());

        // Passing beside
        let beside = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.hit(&beside, Interval::new(0.0, 100.0)).is_none());
    }

    #[test]
    fn test_surrounding_and_centroid() {
        let a = Aabb::from_points(Vec3::ZERO, Vec3::splat(2.0));
        let b = Aabb::from_points(Vec3::splat(4.0), Vec3::splat(6.0));
        let both = Aabb::surrounding(&a, &b);

        assert_eq!(both.centroid(), Vec3::splat(3.0));
        assert_eq!(Aabb::surrounding(&Aabb::EMPTY, &a), a);
    }

    #[test]
    fn test_longest_axis() {
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }
}
