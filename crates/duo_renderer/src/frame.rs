//! Frame orchestration.
//!
//! A [`Renderer`] owns one pipeline plus the scene state that feeds it
//! (settings, model, camera, lights) and wires fresh shader stages into the
//! pipeline on every render call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use duo_core::{save_resource, Light, Model, Resource, Settings, Shape, UnsignedColor};
use duo_math::{Camera, Mat4, Mat4Ext};

use crate::{
    ClosestHitShader, MissShader, PixelShader, RasterShaders, RasterStats, Rasterizer, RayShaders,
    RayTracer, RenderError, VertexShader,
};

/// Lifecycle shared by both pipelines: `init` once, then any number of
/// `update`/`render` calls, then `destroy`.
pub trait Renderer {
    /// Load the model (unless one was supplied) and configure the pipeline.
    fn init(&mut self) -> Result<(), RenderError>;

    /// Per-frame scene changes. Nothing moves by default.
    fn update(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Render one frame and save it to the settings' result path.
    fn render(&mut self) -> Result<(), RenderError>;

    fn destroy(&mut self) {}

    /// The last rendered image, once initialized.
    fn render_target(&self) -> Option<&Resource<UnsignedColor>>;
}

/// Which pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Rasterizer,
    RayTracer,
}

impl RenderMode {
    /// Renderer for this mode that loads its model from the settings.
    pub fn renderer(self, settings: Settings) -> Box<dyn Renderer> {
        match self {
            RenderMode::Rasterizer => Box::new(RasterizationRenderer::new(settings)),
            RenderMode::RayTracer => Box::new(RayTracingRenderer::new(settings)),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Rasterizer => write!(f, "raster"),
            RenderMode::RayTracer => write!(f, "raytrace"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown render mode '{0}' (expected 'raster' or 'raytrace')")]
pub struct UnknownRenderMode(pub String);

impl FromStr for RenderMode {
    type Err = UnknownRenderMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raster" | "rasterizer" | "rasterization" => Ok(RenderMode::Rasterizer),
            "raytrace" | "raytracer" | "ray_tracing" | "raytracing" => Ok(RenderMode::RayTracer),
            _ => Err(UnknownRenderMode(s.to_string())),
        }
    }
}

/// Scene state common to both renderers.
struct Scene {
    settings: Settings,
    model: Option<Model>,
    camera: Camera,
    lights: Vec<Light>,
}

impl Scene {
    fn new(settings: Settings, model: Option<Model>) -> Self {
        Self {
            camera: settings.camera(),
            lights: settings.lights.clone(),
            settings,
            model,
        }
    }

    fn load_model(&mut self) -> Result<&Model, RenderError> {
        let model = match self.model.take() {
            Some(model) => model,
            None => Model::load_obj(&self.settings.model_path)?,
        };
        Ok(self.model.insert(model))
    }
}

// =============================================================================
// Rasterization
// =============================================================================

pub struct RasterizationRenderer {
    scene: Scene,
    rasterizer: Option<Rasterizer>,
    vertex_count: usize,
}

impl RasterizationRenderer {
    pub fn new(settings: Settings) -> Self {
        Self {
            scene: Scene::new(settings, None),
            rasterizer: None,
            vertex_count: 0,
        }
    }

    /// Renderer for a model built in code; `init` will not touch the disk.
    pub fn with_model(settings: Settings, model: Model) -> Self {
        Self {
            scene: Scene::new(settings, Some(model)),
            rasterizer: None,
            vertex_count: 0,
        }
    }

    pub fn add_light(&mut self, light: Light) {
        self.scene.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.scene.lights
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.scene.camera
    }

    /// Point lights when there are any, otherwise the directional key light.
    fn pixel_shader(&self) -> PixelShader {
        let settings = &self.scene.settings;
        if self.scene.lights.is_empty() {
            PixelShader::Directional {
                direction: settings.key_light.direction,
                color: settings.key_light.color,
                ambient_scale: settings.ambient_scale,
            }
        } else {
            PixelShader::Lambert {
                lights: self.scene.lights.clone(),
                ambient_scale: settings.ambient_scale,
            }
        }
    }

    /// Render into the target without saving it.
    pub fn render_frame(&mut self) -> Result<RasterStats, RenderError> {
        let start = Instant::now();
        let world = self
            .scene
            .model
            .as_ref()
            .map(Model::world_transform)
            .ok_or(RenderError::NotInitialized)?;
        let shaders = RasterShaders::new(
            VertexShader::from_camera(world, &self.scene.camera),
            self.pixel_shader(),
        );

        let rasterizer = self
            .rasterizer
            .as_mut()
            .ok_or(RenderError::NotInitialized)?;
        rasterizer.set_shaders(shaders);
        rasterizer.validate(self.vertex_count, 0)?;
        rasterizer.clear_render_target(self.scene.settings.raster_clear_color);
        let stats = rasterizer.draw(self.vertex_count, 0)?;

        log::info!("Rasterized frame in {:?}", start.elapsed());
        Ok(stats)
    }
}

impl Renderer for RasterizationRenderer {
    fn init(&mut self) -> Result<(), RenderError> {
        let (width, height) = (self.scene.settings.width, self.scene.settings.height);
        let smooth_shading = self.scene.settings.smooth_shading;
        let vertices = self.scene.load_model()?.vertex_buffer();

        let mut rasterizer = Rasterizer::new();
        rasterizer.set_render_target(Resource::new(width, height), Resource::new(width, height));
        rasterizer.set_viewport(width, height);
        rasterizer.set_smooth_shading(smooth_shading);
        self.vertex_count = vertices.len();
        rasterizer.set_vertex_buffer(vertices);

        self.rasterizer = Some(rasterizer);
        log::info!("Rasterizer ready: {}x{}, {} vertices", width, height, self.vertex_count);
        Ok(())
    }

    fn render(&mut self) -> Result<(), RenderError> {
        self.render_frame()?;
        let target = self
            .render_target()
            .ok_or(RenderError::NotInitialized)?;
        save_resource(target, &self.scene.settings.result_path)?;
        Ok(())
    }

    fn destroy(&mut self) {
        self.rasterizer = None;
    }

    fn render_target(&self) -> Option<&Resource<UnsignedColor>> {
        self.rasterizer.as_ref().and_then(Rasterizer::render_target)
    }
}

// =============================================================================
// Ray tracing
// =============================================================================

pub struct RayTracingRenderer {
    scene: Scene,
    raytracer: Option<RayTracer>,
}

impl RayTracingRenderer {
    pub fn new(settings: Settings) -> Self {
        Self {
            scene: Scene::new(settings, None),
            raytracer: None,
        }
    }

    /// Renderer for a model built in code; `init` will not touch the disk.
    pub fn with_model(settings: Settings, model: Model) -> Self {
        Self {
            scene: Scene::new(settings, Some(model)),
            raytracer: None,
        }
    }

    pub fn add_light(&mut self, light: Light) {
        self.scene.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.scene.lights
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.scene.camera
    }

    /// Render into the target without saving it.
    ///
    /// Builds the acceleration structure, hands it to a fresh shadow tracer
    /// and runs ray generation. Nothing is written if the build fails.
    pub fn render_frame(&mut self) -> Result<(), RenderError> {
        let settings = &self.scene.settings;
        let tracer = self
            .raytracer
            .as_mut()
            .ok_or(RenderError::NotInitialized)?;

        tracer.set_shaders(
            RayShaders::new()
                .with_miss(MissShader::from(&settings.sky))
                .with_closest_hit(ClosestHitShader::ShadowedLambert {
                    lights: self.scene.lights.clone(),
                    shadow_bias: settings.shadow_bias,
                }),
        );

        let start = Instant::now();
        tracer.build_acceleration_structure()?;

        let mut shadow = RayTracer::new();
        shadow.set_shaders(RayShaders::shadow());
        if let Some(acceleration) = tracer.acceleration_structure() {
            shadow.set_acceleration_structure(acceleration);
        }
        tracer.set_secondary_tracer(Arc::new(shadow));

        tracer.validate()?;
        tracer.clear_render_target(UnsignedColor::BLACK);
        tracer.ray_generation(&self.scene.camera.pinhole_basis())?;

        log::info!("Ray traced frame in {:?}", start.elapsed());
        Ok(())
    }
}

/// Shapes with the world transform applied to positions and normals.
fn world_space_shapes(model: &Model) -> Vec<Shape> {
    let world = model.world_transform();
    let shapes = model.per_shape_vertex_buffers().to_vec();
    if world == Mat4::IDENTITY {
        return shapes;
    }

    shapes
        .into_iter()
        .map(|mut shape| {
            for vertex in &mut shape.vertices {
                vertex.position = world.transform_point3(vertex.position);
                vertex.normal = world.transform_normal(vertex.normal);
            }
            shape
        })
        .collect()
}

impl Renderer for RayTracingRenderer {
    fn init(&mut self) -> Result<(), RenderError> {
        let (width, height) = (self.scene.settings.width, self.scene.settings.height);
        let bucket_size = self.scene.settings.bucket_size;
        let shapes = world_space_shapes(self.scene.load_model()?);

        let mut tracer = RayTracer::new();
        tracer.set_render_target(Resource::new(width, height));
        tracer.set_viewport(width, height);
        tracer.set_bucket_size(bucket_size);
        tracer.set_per_shape_vertex_buffer(shapes);

        self.raytracer = Some(tracer);
        log::info!("Ray tracer ready: {}x{}", width, height);
        Ok(())
    }

    fn render(&mut self) -> Result<(), RenderError> {
        self.render_frame()?;
        let target = self
            .render_target()
            .ok_or(RenderError::NotInitialized)?;
        save_resource(target, &self.scene.settings.result_path)?;
        Ok(())
    }

    fn destroy(&mut self) {
        self.raytracer = None;
    }

    fn render_target(&self) -> Option<&Resource<UnsignedColor>> {
        self.raytracer.as_ref().and_then(RayTracer::render_target)
    }
}
