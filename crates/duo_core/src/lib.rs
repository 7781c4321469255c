//! Duo Core - scene data and render resources shared by both pipelines.
//!
//! This crate provides:
//!
//! - **Geometry**: `Vertex`, `Shape` and `Model` (OBJ/MTL loading)
//! - **Lighting**: point `Light`s
//! - **Resources**: `Resource<T>` grids used as render targets and depth buffers
//! - **Settings**: JSON render configuration
//! - **Output**: saving a render target to an image file
//!
//! # Example
//!
//! ```ignore
//! use duo_core::{Model, Settings};
//!
//! let settings = Settings::load("scene.json")?;
//! let model = Model::load_obj(&settings.model_path)?;
//! println!("Loaded {} shapes, {} triangles",
//!     model.per_shape_vertex_buffers().len(),
//!     model.triangle_count());
//! ```

pub mod light;
pub mod model;
pub mod output;
pub mod resource;
pub mod settings;
pub mod vertex;

// Re-export commonly used types
pub use light::Light;
pub use model::{LoadError, LoadResult, Model, Shape};
pub use output::{save_resource, SaveError};
pub use resource::{Color, Resource, UnsignedColor};
pub use settings::{CameraSettings, KeyLight, Settings, SettingsError, SkySettings};
pub use vertex::Vertex;
