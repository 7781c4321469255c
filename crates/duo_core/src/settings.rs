//! Render settings loaded from JSON.
//!
//! Every field has a default, so a settings file only needs the values it
//! changes:
//!
//! ```json
//! {
//!     "width": 800,
//!     "height": 600,
//!     "model_path": "models/cornell_box.obj",
//!     "result_path": "out/cornell.png",
//!     "camera": { "position": [0.0, 1.0, 3.9], "phi": 0.0 },
//!     "lights": [{ "position": [0.0, 1.58, -0.03], "color": [0.78, 0.78, 0.78] }]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use duo_math::{Camera, Vec3};

use crate::{Color, Light, UnsignedColor};

/// Errors that can occur while reading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Camera placement. Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: Vec3,
    pub theta: f32,
    pub phi: f32,
    pub angle_of_view: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            theta: 0.0,
            phi: 0.0,
            angle_of_view: 60.0,
            z_near: 0.001,
            z_far: 100.0,
        }
    }
}

/// Background gradient for rays that leave the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkySettings {
    pub ground: Color,
    pub sky: Color,
    pub edge0: f32,
    pub edge1: f32,
}

impl Default for SkySettings {
    fn default() -> Self {
        Self {
            ground: Color::splat(0.8),
            sky: Color::new(50.0 / 255.0, 150.0 / 255.0, 250.0 / 255.0),
            edge0: 0.0,
            edge1: 0.5,
        }
    }
}

/// Directional light used by the rasterizer when no point lights are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyLight {
    /// Direction the light travels in (from the light towards the scene).
    pub direction: Vec3,
    pub color: Color,
}

impl Default for KeyLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.5),
            color: Color::ONE,
        }
    }
}

/// Complete configuration of one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub model_path: PathBuf,
    pub result_path: PathBuf,
    pub camera: CameraSettings,
    /// Point lights. Omitting the key gives one dim light above the origin;
    /// an explicit empty list means no point lights.
    pub lights: Vec<Light>,
    pub sky: SkySettings,
    pub key_light: KeyLight,
    /// World-space distance skipped at the start of each shadow ray.
    pub shadow_bias: f32,
    /// Weight of the ambient color in rasterized shading.
    pub ambient_scale: f32,
    /// Interpolate vertex attributes across triangles (otherwise flat).
    pub smooth_shading: bool,
    /// Edge length in pixels of the ray tracer's parallel work tiles.
    pub bucket_size: u32,
    pub raster_clear_color: UnsignedColor,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            model_path: PathBuf::from("models/cube.obj"),
            result_path: PathBuf::from("result.png"),
            camera: CameraSettings::default(),
            lights: vec![Light::new(Vec3::new(0.0, 2.0, -0.1), Color::splat(0.5))],
            sky: SkySettings::default(),
            key_light: KeyLight::default(),
            shadow_bias: 0.001,
            ambient_scale: 0.1,
            smooth_shading: true,
            bucket_size: 64,
            raster_clear_color: UnsignedColor::new(25, 75, 100),
        }
    }
}

impl Settings {
    /// Read and validate a settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        log::info!("Loading settings from: {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate settings from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field, reason: &str| {
            Err(SettingsError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };

        if self.width == 0 || self.height == 0 {
            return invalid("width/height", "image size must be non-zero");
        }
        if self.bucket_size == 0 {
            return invalid("bucket_size", "must be non-zero");
        }
        if !(self.camera.z_near > 0.0 && self.camera.z_near < self.camera.z_far) {
            return invalid("camera.z_near/z_far", "need 0 < z_near < z_far");
        }
        if !(self.camera.angle_of_view > 0.0 && self.camera.angle_of_view < 180.0) {
            return invalid("camera.angle_of_view", "must be in (0, 180) degrees");
        }
        if self.sky.edge0 == self.sky.edge1 {
            return invalid("sky.edge0/edge1", "gradient edges must differ");
        }
        if self.shadow_bias < 0.0 {
            return invalid("shadow_bias", "must not be negative");
        }
        Ok(())
    }

    /// Camera configured from these settings.
    pub fn camera(&self) -> Camera {
        let mut camera = Camera::new();
        camera.set_width(self.width as f32);
        camera.set_height(self.height as f32);
        camera.set_position(self.camera.position);
        camera.set_theta(self.camera.theta);
        camera.set_phi(self.camera.phi);
        camera.set_angle_of_view(self.camera.angle_of_view);
        camera.set_z_near(self.camera.z_near);
        camera.set_z_far(self.camera.z_far);
        camera
    }
}
