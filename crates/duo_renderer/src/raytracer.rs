//! Ray tracing pipeline.
//!
//! A `RayTracer` owns its shader stages, optionally a render target, and a
//! shared handle to an acceleration structure. Two instances make a frame:
//! the primary tracer runs ray generation and shades hits, the shadow tracer
//! has no closest-hit stage and only answers occlusion queries. Both read
//! the same `Arc<AccelerationStructure>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use duo_core::{Color, Resource, Shape, UnsignedColor};
use duo_math::{Interval, PinholeBasis, Ray};

use crate::bucket::{generate_buckets, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::{
    AccelerationStructure, BuildError, ConfigurationError, Intersection, Payload, RayShaders,
    Triangle,
};

pub struct RayTracer {
    render_target: Option<Resource<UnsignedColor>>,
    width: u32,
    height: u32,
    shapes: Vec<Shape>,
    shaders: RayShaders,
    acceleration: Option<Arc<AccelerationStructure>>,
    secondary: Option<Arc<RayTracer>>,
    bucket_size: u32,
    warned_unshadowed: AtomicBool,
}

impl RayTracer {
    pub fn new() -> Self {
        Self {
            render_target: None,
            width: 0,
            height: 0,
            shapes: Vec::new(),
            shaders: RayShaders::default(),
            acceleration: None,
            secondary: None,
            bucket_size: DEFAULT_BUCKET_SIZE,
            warned_unshadowed: AtomicBool::new(false),
        }
    }

    pub fn set_render_target(&mut self, target: Resource<UnsignedColor>) {
        self.render_target = Some(target);
    }

    pub fn render_target(&self) -> Option<&Resource<UnsignedColor>> {
        self.render_target.as_ref()
    }

    pub fn take_render_target(&mut self) -> Option<Resource<UnsignedColor>> {
        self.render_target.take()
    }

    pub fn clear_render_target(&mut self, color: UnsignedColor) {
        if let Some(target) = self.render_target.as_mut() {
            target.fill(color);
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Geometry for the next acceleration structure build. Each shape is a
    /// flat triangle list.
    pub fn set_per_shape_vertex_buffer(&mut self, shapes: Vec<Shape>) {
        self.shapes = shapes;
    }

    pub fn set_shaders(&mut self, shaders: RayShaders) {
        self.shaders = shaders;
    }

    pub fn shaders(&self) -> &RayShaders {
        &self.shaders
    }

    pub fn set_bucket_size(&mut self, bucket_size: u32) {
        self.bucket_size = bucket_size;
    }

    /// Build a BVH over the triangles of all shapes.
    ///
    /// On failure the tracer is left without an acceleration structure.
    pub fn build_acceleration_structure(&mut self) -> Result<(), BuildError> {
        self.acceleration = None;

        let mut triangles = Vec::new();
        for shape in &self.shapes {
            let corners = shape.vertices.chunks_exact(3);
            if !corners.remainder().is_empty() {
                log::warn!(
                    "Shape '{}': ignoring {} trailing vertices",
                    shape.name,
                    corners.remainder().len()
                );
            }
            triangles.extend(corners.map(|v| Triangle::new(&v[0], &v[1], &v[2])));
        }

        self.acceleration = Some(Arc::new(AccelerationStructure::build(triangles)?));
        Ok(())
    }

    pub fn acceleration_structure(&self) -> Option<Arc<AccelerationStructure>> {
        self.acceleration.clone()
    }

    /// Reuse a structure built by another tracer.
    pub fn set_acceleration_structure(&mut self, acceleration: Arc<AccelerationStructure>) {
        self.acceleration = Some(acceleration);
    }

    /// Tracer handed to the closest-hit stage for shadow queries.
    pub fn set_secondary_tracer(&mut self, tracer: Arc<RayTracer>) {
        self.secondary = Some(tracer);
        self.warned_unshadowed.store(false, Ordering::Relaxed);
    }

    /// Trace one ray within `[min_t, max_t]`, in units of the ray's own
    /// direction vector.
    ///
    /// With a closest-hit stage the nearest accepted hit is shaded; without
    /// one the first accepted hit is returned unshaded. Rays that hit
    /// nothing (or a tracer with no geometry) go to the miss stage.
    pub fn trace_ray(&self, ray: &Ray, min_t: f32, max_t: f32) -> Payload {
        let Some(acceleration) = self.acceleration.as_deref() else {
            return self.miss(ray);
        };
        let bounds = Interval::new(min_t, max_t);
        let mut accept = |candidate: &Intersection| self.accepts(ray, acceleration, candidate);

        match &self.shaders.closest_hit {
            Some(closest_hit) => match acceleration.query_nearest_filtered(ray, bounds, &mut accept)
            {
                Some(found) => {
                    if self.secondary.is_none() && closest_hit.casts_shadow_rays() {
                        self.warn_unshadowed();
                    }
                    let mut payload = Payload::from_hit(found.into());
                    closest_hit.run(
                        ray,
                        &mut payload,
                        acceleration.triangle(found.triangle),
                        self.secondary.as_deref(),
                    );
                    payload
                }
                None => self.miss(ray),
            },
            None => match acceleration.query_any(ray, bounds, &mut accept) {
                Some(found) => Payload::from_hit(found.into()),
                None => self.miss(ray),
            },
        }
    }

    fn accepts(
        &self,
        ray: &Ray,
        acceleration: &AccelerationStructure,
        candidate: &Intersection,
    ) -> bool {
        match &self.shaders.any_hit {
            Some(any_hit) => any_hit.accepts(
                ray,
                &Payload::from_hit((*candidate).into()),
                acceleration.triangle(candidate.triangle),
            ),
            None => true,
        }
    }

    /// Shading without a shadow tracer treats every light as visible.
    fn warn_unshadowed(&self) {
        if !self.warned_unshadowed.swap(true, Ordering::Relaxed) {
            log::warn!("No shadow tracer set; lights will not cast shadows");
        }
    }

    fn miss(&self, ray: &Ray) -> Payload {
        match &self.shaders.miss {
            Some(miss) => miss.run(ray),
            None => Payload::miss(Color::ZERO),
        }
    }

    /// Check that ray generation can run, including the shadow tracer when
    /// the closest-hit stage needs one.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigurationError::ZeroViewport {
                width: self.width,
                height: self.height,
            });
        }
        let target = self
            .render_target
            .as_ref()
            .ok_or(ConfigurationError::MissingRenderTarget)?;
        if target.width() != self.width || target.height() != self.height {
            return Err(ConfigurationError::TargetSizeMismatch {
                target_width: target.width(),
                target_height: target.height(),
                width: self.width,
                height: self.height,
            });
        }

        self.validate_queries()?;
        let closest_hit = self
            .shaders
            .closest_hit
            .as_ref()
            .ok_or(ConfigurationError::MissingStage("closest-hit"))?;

        if closest_hit.casts_shadow_rays() {
            self.secondary
                .as_ref()
                .ok_or(ConfigurationError::MissingShadowTracer)?
                .validate_queries()?;
        }
        Ok(())
    }

    /// What any tracer needs before `trace_ray` means anything.
    fn validate_queries(&self) -> Result<(), ConfigurationError> {
        if self.shaders.miss.is_none() {
            return Err(ConfigurationError::MissingStage("miss"));
        }
        if self.acceleration.is_none() {
            return Err(ConfigurationError::MissingAccelerationStructure);
        }
        Ok(())
    }

    /// Trace one primary ray through the centre of every pixel and write the
    /// results to the render target.
    ///
    /// Rays are bounded by the basis depth range. Nothing is written when
    /// the configuration is incomplete.
    pub fn ray_generation(&mut self, basis: &PinholeBasis) -> Result<(), ConfigurationError> {
        self.validate()?;

        let start = Instant::now();
        let (width, height) = (self.width, self.height);
        let buckets = generate_buckets(width, height, self.bucket_size);
        let depth = basis.depth_range;

        let tracer = &*self;
        let results: Vec<BucketResult> = buckets
            .par_iter()
            .map(|bucket| {
                bucket.render(|x, y| {
                    let ray = basis.ray(x, y, width, height);
                    UnsignedColor::from(tracer.trace_ray(&ray, depth.min, depth.max).color)
                })
            })
            .collect();

        let target = self
            .render_target
            .as_mut()
            .ok_or(ConfigurationError::MissingRenderTarget)?;
        for result in &results {
            result.write_into(target);
        }

        log::debug!(
            "Traced {}x{} pixels in {} buckets ({:?})",
            width,
            height,
            results.len(),
            start.elapsed()
        );
        Ok(())
    }
}

impl Default for RayTracer {
    fn default() -> Self {
        Self::new()
    }
}
