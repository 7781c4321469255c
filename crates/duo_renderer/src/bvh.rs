//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Binary tree over triangle indices. Built once per frame, then only read,
//! so one instance can serve the primary and the shadow tracer at the same
//! time behind an `Arc`.

use std::time::Instant;

use crate::{BuildError, Triangle};
use duo_math::{Aabb, Interval, Ray, Vec3};

/// Maximum triangles per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// A ray-triangle intersection found by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Index into [`AccelerationStructure::triangles`]
    pub triangle: usize,
    pub t: f32,
    pub bary: Vec3,
}

/// BVH node - either a branch with two children or a leaf with triangles.
enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        triangles: Vec<usize>,
        bbox: Aabb,
    },
}

impl BvhNode {
    /// Recursive construction.
    ///
    /// Simple median split: sort by centroid on the longest axis of the
    /// centroid bounds, split in half, recurse.
    fn build(triangles: &[Triangle], mut indices: Vec<usize>) -> Self {
        let bbox = indices.iter().fold(Aabb::EMPTY, |acc, &i| {
            Aabb::surrounding(&acc, &triangles[i].bounding_box())
        });

        if indices.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles: indices,
                bbox,
            };
        }

        let centroid = |i: usize| triangles[i].bounding_box().centroid();
        let centroid_bounds = indices.iter().fold(Aabb::EMPTY, |acc, &i| {
            let c = centroid(i);
            Aabb::surrounding(&acc, &Aabb::from_points(c, c))
        });
        let axis = centroid_bounds.longest_axis();

        indices.sort_unstable_by(|&a, &b| {
            centroid(a)[axis]
                .partial_cmp(&centroid(b)[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_indices = indices.split_off(indices.len() / 2);
        BvhNode::Branch {
            left: Box::new(Self::build(triangles, indices)),
            right: Box::new(Self::build(triangles, right_indices)),
            bbox,
        }
    }

    fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    /// Visit leaves along the ray in near-to-far child order, shrinking the
    /// search range to the closest accepted hit.
    ///
    /// Returns `true` when `first_only` is set and a hit was accepted, which
    /// stops the traversal.
    fn traverse(
        &self,
        triangles: &[Triangle],
        ray: &Ray,
        ray_t: &mut Interval,
        first_only: bool,
        accept: &mut dyn FnMut(&Intersection) -> bool,
        closest: &mut Option<Intersection>,
    ) -> bool {
        match self {
            BvhNode::Leaf { triangles: leaf, .. } => {
                for &index in leaf {
                    let Some((t, bary)) = triangles[index].intersect(ray, *ray_t) else {
                        continue;
                    };
                    let candidate = Intersection {
                        triangle: index,
                        t,
                        bary,
                    };
                    if !accept(&candidate) {
                        continue;
                    }
                    *closest = Some(candidate);
                    if first_only {
                        return true;
                    }
                    *ray_t = ray_t.with_max(t);
                }
                false
            }

            BvhNode::Branch { left, right, .. } => {
                let left_entry = left.bbox().hit(ray, *ray_t);
                let right_entry = right.bbox().hit(ray, *ray_t);

                let mut order = [(left_entry, left), (right_entry, right)];
                if let (Some(l), Some(r)) = (left_entry, right_entry) {
                    if r < l {
                        order.swap(0, 1);
                    }
                }

                for (entry, child) in order {
                    // Range may have shrunk since the entry was computed
                    let Some(entry) = entry else { continue };
                    if entry > ray_t.max {
                        continue;
                    }
                    if child.traverse(triangles, ray, ray_t, first_only, accept, closest) {
                        return true;
                    }
                }
                false
            }
        }
    }
}

/// Triangle set plus its BVH.
pub struct AccelerationStructure {
    triangles: Vec<Triangle>,
    root: BvhNode,
}

impl AccelerationStructure {
    /// Build a BVH over `triangles`.
    pub fn build(triangles: Vec<Triangle>) -> Result<Self, BuildError> {
        if triangles.is_empty() {
            return Err(BuildError::NoGeometry);
        }

        let start = Instant::now();
        let root = BvhNode::build(&triangles, (0..triangles.len()).collect());
        log::info!(
            "Built BVH over {} triangles in {:?}",
            triangles.len(),
            start.elapsed()
        );

        Ok(Self { triangles, root })
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn bounding_box(&self) -> Aabb {
        *self.root.bbox()
    }

    /// Nearest intersection inside `ray_t`.
    pub fn query_nearest(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection> {
        self.query_nearest_filtered(ray, ray_t, &mut |_| true)
    }

    /// Nearest intersection inside `ray_t` among the candidates `accept`
    /// lets through.
    pub fn query_nearest_filtered(
        &self,
        ray: &Ray,
        ray_t: Interval,
        accept: &mut dyn FnMut(&Intersection) -> bool,
    ) -> Option<Intersection> {
        self.query(ray, ray_t, false, accept)
    }

    /// First intersection inside `ray_t` that `accept` lets through.
    ///
    /// Not necessarily the nearest one; traversal stops at the first accepted
    /// candidate.
    pub fn query_any(
        &self,
        ray: &Ray,
        ray_t: Interval,
        accept: &mut dyn FnMut(&Intersection) -> bool,
    ) -> Option<Intersection> {
        self.query(ray, ray_t, true, accept)
    }

    /// True if any triangle intersects the ray inside `ray_t`.
    pub fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.query_any(ray, ray_t, &mut |_| true).is_some()
    }

    fn query(
        &self,
        ray: &Ray,
        ray_t: Interval,
        first_only: bool,
        accept: &mut dyn FnMut(&Intersection) -> bool,
    ) -> Option<Intersection> {
        let mut range = ray_t;
        if range.is_empty() || self.root.bbox().hit(ray, range).is_none() {
            return None;
        }
        let mut closest = None;
        self.root
            .traverse(&self.triangles, ray, &mut range, first_only, accept, &mut closest);
        closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_core::Vertex;

    /// Axis-aligned triangle in the plane z = `z`, centred on (x, y).
    fn quad_triangle(x: f32, y: f32, z: f32) -> Triangle {
        Triangle::new(
            &Vertex::new(Vec3::new(x - 0.5, y - 0.5, z), Vec3::Z),
            &Vertex::new(Vec3::new(x + 0.5, y - 0.5, z), Vec3::Z),
            &Vertex::new(Vec3::new(x, y + 0.5, z), Vec3::Z),
        )
    }

    fn brute_force_nearest(triangles: &[Triangle], ray: &Ray, ray_t: Interval) -> Option<f32> {
        triangles
            .iter()
            .filter_map(|tri| tri.intersect(ray, ray_t).map(|(t, _)| t))
            .min_by(|a, b| a.partial_cmp(b).unwrap())
    }

    #[test]
    fn test_empty_geometry_fails() {
        assert_eq!(
            AccelerationStructure::build(Vec::new()).err(),
            Some(BuildError::NoGeometry)
        );
    }

    #[test]
    fn test_nearest_picks_closest_of_stack() {
        // Ten triangles stacked along -Z, inserted far to near
        let triangles: Vec<Triangle> = (0..10)
            .rev()
            .map(|i| quad_triangle(0.0, 0.0, -(i as f32) - 1.0))
            .collect();
        let bvh = AccelerationStructure::build(triangles).unwrap();

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = bvh.query_nearest(&ray, Interval::new(0.0, 100.0)).unwrap();

        assert!((hit.t - 1.0).abs() < 1e-5);
        assert_eq!(bvh.triangle(hit.triangle).a.z, -1.0);
    }

    #[test]
    fn test_nearest_matches_brute_force_on_grid() {
        let mut triangles = Vec::new();
        for ix in 0..8 {
            for iy in 0..8 {
                let depth = -2.0 - ((ix * 7 + iy * 3) % 5) as f32;
                triangles.push(quad_triangle(ix as f32, iy as f32, depth));
            }
        }
        let bvh = AccelerationStructure::build(triangles.clone()).unwrap();

        for ix in 0..8 {
            for iy in 0..8 {
                let origin = Vec3::new(ix as f32 + 0.1, iy as f32 - 0.1, 5.0);
                let ray = Ray::new(origin, Vec3::new(0.02, 0.01, -1.0));
                let range = Interval::new(0.0, 100.0);

                let expected = brute_force_nearest(&triangles, &ray, range);
                let found = bvh.query_nearest(&ray, range).map(|hit| hit.t);
                assert_eq!(found, expected, "ray through cell ({}, {})", ix, iy);
            }
        }
    }

    #[test]
    fn test_any_stops_at_first_accepted() {
        let triangles: Vec<Triangle> = (0..6)
            .map(|i| quad_triangle(0.0, 0.0, -(i as f32) - 1.0))
            .collect();
        let bvh = AccelerationStructure::build(triangles).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        let mut candidates = 0;
        let hit = bvh.query_any(&ray, Interval::new(0.0, 100.0), &mut |_| {
            candidates += 1;
            true
        });

        assert!(hit.is_some());
        assert_eq!(candidates, 1);
    }

    #[test]
    fn test_filter_skips_rejected_candidates() {
        let triangles: Vec<Triangle> = (0..6)
            .map(|i| quad_triangle(0.0, 0.0, -(i as f32) - 1.0))
            .collect();
        let bvh = AccelerationStructure::build(triangles).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        // Reject the two nearest layers
        let hit = bvh
            .query_nearest_filtered(&ray, Interval::new(0.0, 100.0), &mut |c| c.t > 2.5)
            .unwrap();
        assert!((hit.t - 3.0).abs() < 1e-5);

        let none = bvh.query_any(&ray, Interval::new(0.0, 100.0), &mut |_| false);
        assert!(none.is_none());
    }

    #[test]
    fn test_occluded_respects_bounds() {
        let bvh = AccelerationStructure::build(vec![quad_triangle(0.0, 0.0, -2.0)]).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert!(bvh.occluded(&ray, Interval::new(0.0, 3.0)));
        assert!(!bvh.occluded(&ray, Interval::new(0.0, 1.5)));
        assert!(!bvh.occluded(&ray, Interval::new(2.5, 3.0)));
        assert!(!bvh.occluded(&ray, Interval::EMPTY));
    }
}
