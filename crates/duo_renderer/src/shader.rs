//! Shader stages.
//!
//! Each stage is a small enum of strategies carrying all the data it needs
//! (matrices, lights, colors). Stages are pure functions of their inputs and
//! of that data; none of them captures camera or scene state by reference.
//! A pipeline is configured by moving stage values into it, and the stage
//! sets are rebuilt on every render call.
//!
//! All stages are serde-serializable with an internal `kind` tag:
//!
//! ```json
//! { "kind": "sky_gradient", "ground": [0.8, 0.8, 0.8], "sky": [0.2, 0.6, 1.0],
//!   "edge0": 0.0, "edge1": 0.5 }
//! ```

use serde::{Deserialize, Serialize};

use duo_core::{Color, Light, SkySettings, Vertex};
use duo_math::{smoothstep, Camera, Mat4, Mat4Ext, Ray, Vec3, Vec4};

use crate::{ConfigurationError, Payload, RayTracer, Triangle};

// =============================================================================
// Rasterization stages
// =============================================================================

/// Per-vertex stage of the rasterizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VertexShader {
    /// Object space to clip space. The forwarded vertex carries its
    /// world-space position and normal for the pixel stage.
    Transform { world: Mat4, view_projection: Mat4 },
}

impl VertexShader {
    pub fn from_camera(world: Mat4, camera: &Camera) -> Self {
        VertexShader::Transform {
            world,
            view_projection: camera.view_projection_matrix(),
        }
    }

    pub fn run(&self, position: Vec4, vertex: &Vertex) -> (Vec4, Vertex) {
        match self {
            VertexShader::Transform {
                world,
                view_projection,
            } => {
                let world_position = *world * position;
                let mut forwarded = *vertex;
                forwarded.position = world_position.truncate();
                forwarded.normal = world.transform_normal(vertex.normal);
                (*view_projection * world_position, forwarded)
            }
        }
    }
}

/// Per-fragment stage of the rasterizer. Output channels are clamped to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PixelShader {
    /// Diffuse lighting from point lights plus a scaled ambient term.
    Lambert {
        lights: Vec<Light>,
        ambient_scale: f32,
    },
    /// Diffuse lighting from one directional light plus a scaled ambient term.
    Directional {
        /// Direction the light travels in
        direction: Vec3,
        color: Color,
        ambient_scale: f32,
    },
    /// Normal mapped from [-1, 1] to [0, 1].
    Normals,
    /// `1 - depth` in grey.
    Depth,
    /// Diffuse color only.
    Unlit,
}

impl PixelShader {
    pub fn run(&self, vertex: &Vertex, depth: f32) -> Color {
        let normal = vertex.normal.normalize_or_zero();
        let color = match self {
            PixelShader::Lambert {
                lights,
                ambient_scale,
            } => {
                let diffuse: Color = lights
                    .iter()
                    .map(|light| {
                        let to_light = (light.position - vertex.position).normalize_or_zero();
                        vertex.diffuse * light.color * normal.dot(to_light).max(0.0)
                    })
                    .sum();
                diffuse + vertex.ambient * *ambient_scale
            }
            PixelShader::Directional {
                direction,
                color,
                ambient_scale,
            } => {
                let towards_light = -direction.normalize_or_zero();
                let lambert = normal.dot(towards_light).clamp(0.0, 1.0);
                vertex.diffuse * *color * lambert + vertex.ambient * *ambient_scale
            }
            PixelShader::Normals => normal * 0.5 + 0.5,
            PixelShader::Depth => Color::splat(1.0 - depth),
            PixelShader::Unlit => vertex.diffuse,
        };
        color.clamp(Color::ZERO, Color::ONE)
    }
}

/// Stages of one rasterizer. Both are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterShaders {
    pub vertex: Option<VertexShader>,
    pub pixel: Option<PixelShader>,
}

impl RasterShaders {
    pub fn new(vertex: VertexShader, pixel: PixelShader) -> Self {
        Self {
            vertex: Some(vertex),
            pixel: Some(pixel),
        }
    }

    pub(crate) fn stages(&self) -> Result<(&VertexShader, &PixelShader), ConfigurationError> {
        let vertex = self
            .vertex
            .as_ref()
            .ok_or(ConfigurationError::MissingStage("vertex"))?;
        let pixel = self
            .pixel
            .as_ref()
            .ok_or(ConfigurationError::MissingStage("pixel"))?;
        Ok((vertex, pixel))
    }
}

// =============================================================================
// Ray tracing stages
// =============================================================================

/// Stage run when a ray leaves the scene. Never records a hit, and the color
/// depends on the ray direction only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissShader {
    /// Blend from `ground` to `sky` by `smoothstep(edge0, edge1, dir.y + 0.5)`
    /// of the unit direction.
    SkyGradient {
        ground: Color,
        sky: Color,
        edge0: f32,
        edge1: f32,
    },
    Solid { color: Color },
    /// Black. Used by occlusion tracers, which only look at the hit.
    Empty,
}

impl MissShader {
    pub fn run(&self, ray: &Ray) -> Payload {
        match self {
            MissShader::SkyGradient {
                ground,
                sky,
                edge0,
                edge1,
            } => {
                let up = ray.direction.normalize_or_zero().y;
                let blend = smoothstep(*edge0, *edge1, up + 0.5);
                Payload::miss(*ground * (1.0 - blend) + *sky * blend)
            }
            MissShader::Solid { color } => Payload::miss(*color),
            MissShader::Empty => Payload::miss(Color::ZERO),
        }
    }
}

impl From<&SkySettings> for MissShader {
    fn from(sky: &SkySettings) -> Self {
        MissShader::SkyGradient {
            ground: sky.ground,
            sky: sky.sky,
            edge0: sky.edge0,
            edge1: sky.edge1,
        }
    }
}

/// Stage run for the nearest accepted hit.
///
/// Receives the payload with `hit` filled in and writes `color`. The hit
/// position is `ray.at(t)` and the shading normal is the barycentric blend
/// of the vertex normals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClosestHitShader {
    /// Emissive color plus the diffuse term of every light the shadow tracer
    /// can see from the hit point.
    ShadowedLambert {
        lights: Vec<Light>,
        /// World-space distance skipped at the start of each shadow ray
        shadow_bias: f32,
    },
    /// Unit normal mapped from [-1, 1] to [0, 1].
    Normals,
    Emissive,
}

impl ClosestHitShader {
    /// True if this stage needs a shadow tracer to run.
    pub fn casts_shadow_rays(&self) -> bool {
        matches!(self, ClosestHitShader::ShadowedLambert { lights, .. } if !lights.is_empty())
    }

    pub fn run(
        &self,
        ray: &Ray,
        payload: &mut Payload,
        triangle: &Triangle,
        shadow_tracer: Option<&RayTracer>,
    ) {
        let Some(hit) = payload.hit else {
            return;
        };
        let position = ray.at(hit.t);
        let normal = triangle.interpolate_normal(hit.bary);

        payload.color = match self {
            ClosestHitShader::ShadowedLambert {
                lights,
                shadow_bias,
            } => lights.iter().fold(triangle.emissive, |color, light| {
                color
                    + shadowed_diffuse(
                        light,
                        position,
                        normal,
                        triangle.diffuse,
                        *shadow_bias,
                        shadow_tracer,
                    )
            }),
            ClosestHitShader::Normals => normal.normalize_or_zero() * 0.5 + 0.5,
            ClosestHitShader::Emissive => triangle.emissive,
        };
    }
}

/// Diffuse contribution of `light` at `position`, or zero when the shadow
/// tracer finds geometry between the two.
///
/// The shadow ray runs from the surface to the light with the unnormalized
/// separation as its direction, so the light sits at `t = 1` and the query
/// range is `[bias / separation, 1]`. Geometry behind the light is never
/// considered.
fn shadowed_diffuse(
    light: &Light,
    position: Vec3,
    normal: Vec3,
    diffuse: Color,
    shadow_bias: f32,
    shadow_tracer: Option<&RayTracer>,
) -> Color {
    let to_light = Ray::between(position, light.position);
    let separation = to_light.direction.length();
    if separation <= 0.0 {
        return Color::ZERO;
    }

    if let Some(tracer) = shadow_tracer {
        if tracer
            .trace_ray(&to_light, shadow_bias / separation, 1.0)
            .is_hit()
        {
            return Color::ZERO;
        }
    }

    diffuse * light.color * normal.dot(to_light.direction / separation).max(0.0)
}

/// Stage deciding whether a candidate hit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyHitShader {
    #[default]
    AcceptAll,
    /// Ignore triangles seen from behind (relative to their a -> b -> c winding).
    CullBackFaces,
}

impl AnyHitShader {
    pub fn accepts(&self, ray: &Ray, _candidate: &Payload, triangle: &Triangle) -> bool {
        match self {
            AnyHitShader::AcceptAll => true,
            AnyHitShader::CullBackFaces => triangle.geometric_normal().dot(ray.direction) < 0.0,
        }
    }
}

/// Stages of one ray tracer.
///
/// `miss` is mandatory. Without `closest_hit` the tracer answers occlusion
/// queries only (first hit accepted by `any_hit`). A missing `any_hit`
/// accepts every candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayShaders {
    pub miss: Option<MissShader>,
    pub closest_hit: Option<ClosestHitShader>,
    pub any_hit: Option<AnyHitShader>,
}

impl RayShaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages of a shadow tracer: black miss, every candidate accepted.
    pub fn shadow() -> Self {
        Self::new()
            .with_miss(MissShader::Empty)
            .with_any_hit(AnyHitShader::AcceptAll)
    }

    pub fn with_miss(mut self, miss: MissShader) -> Self {
        self.miss = Some(miss);
        self
    }

    pub fn with_closest_hit(mut self, closest_hit: ClosestHitShader) -> Self {
        self.closest_hit = Some(closest_hit);
        self
    }

    pub fn with_any_hit(mut self, any_hit: AnyHitShader) -> Self {
        self.any_hit = Some(any_hit);
        self
    }
}
