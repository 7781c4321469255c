//! Shadow example.
//!
//! A floor, a small triangle floating above it and a point light over both.
//! Renders the scene with both pipelines; only the ray traced image shows
//! the shadow.

use duo_core::{Model, Settings, Shape};
use duo_renderer::{
    Color, Light, RasterizationRenderer, RayTracingRenderer, Renderer, Vec3, Vertex,
};

fn triangle(points: [Vec3; 3], diffuse: Color) -> Vec<Vertex> {
    points
        .into_iter()
        .map(|p| Vertex::new(p, Vec3::Y).with_material(diffuse * 0.2, diffuse, Color::ZERO))
        .collect()
}

fn build_scene() -> Model {
    let floor = [
        triangle(
            [
                Vec3::new(-3.0, 0.0, 3.0),
                Vec3::new(3.0, 0.0, 3.0),
                Vec3::new(3.0, 0.0, -3.0),
            ],
            Color::splat(0.8),
        ),
        triangle(
            [
                Vec3::new(-3.0, 0.0, 3.0),
                Vec3::new(3.0, 0.0, -3.0),
                Vec3::new(-3.0, 0.0, -3.0),
            ],
            Color::splat(0.8),
        ),
    ]
    .concat();

    let blocker = triangle(
        [
            Vec3::new(-0.6, 0.8, 0.5),
            Vec3::new(0.6, 0.8, 0.5),
            Vec3::new(0.0, 0.8, -0.6),
        ],
        Color::new(0.9, 0.3, 0.2),
    );

    Model::from_shapes(vec![Shape::new("floor", floor), Shape::new("blocker", blocker)])
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut settings = Settings::default();
    settings.width = 400;
    settings.height = 300;
    settings.camera.position = Vec3::new(0.0, 2.5, 4.5);
    settings.camera.phi = -30.0;
    settings.lights = vec![Light::new(Vec3::new(0.3, 2.5, 0.2), Color::splat(0.9))];

    let start = std::time::Instant::now();
    let model = build_scene();

    settings.result_path = "shadowed_triangle_raster.png".into();
    let mut raster = RasterizationRenderer::with_model(settings.clone(), model.clone());
    raster.init()?;
    raster.render()?;

    settings.result_path = "shadowed_triangle_raytraced.png".into();
    let mut tracer = RayTracingRenderer::with_model(settings, model);
    tracer.init()?;
    tracer.render()?;

    log::info!("Rendered both images in {:?}", start.elapsed());
    Ok(())
}
