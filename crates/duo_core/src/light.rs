//! Point lights.

use serde::{Deserialize, Serialize};

use crate::Color;
use duo_math::Vec3;

/// A point light with a position and a linear RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub color: Color,
}

impl Light {
    pub fn new(position: Vec3, color: Color) -> Self {
        Self { position, color }
    }
}
