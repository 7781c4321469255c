// Render a scene described by a settings file.
// Run with: cargo run --release --bin duo -- <settings.json> [raster|raytrace]

use std::env;
use std::time::Instant;

use anyhow::{Context, Result};

use duo_core::Settings;
use duo_renderer::RenderMode;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <settings.json> [raster|raytrace]", args[0]);
        std::process::exit(1);
    }

    let settings = Settings::load(&args[1])
        .with_context(|| format!("Failed to load settings from {}", args[1]))?;
    let mode = match args.get(2) {
        Some(mode) => mode.parse::<RenderMode>()?,
        None => RenderMode::RayTracer,
    };
    let result_path = settings.result_path.clone();

    log::info!(
        "Rendering {} at {}x{} with the {} pipeline",
        settings.model_path.display(),
        settings.width,
        settings.height,
        mode
    );

    let start = Instant::now();
    let mut renderer = mode.renderer(settings);
    renderer.init().context("Failed to initialize renderer")?;
    renderer.update()?;
    renderer.render().context("Render failed")?;
    renderer.destroy();

    log::info!(
        "Wrote {} in {:?}",
        result_path.display(),
        start.elapsed()
    );
    Ok(())
}
