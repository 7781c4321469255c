//! Render resources: colors and 2D grids.
//!
//! A `Resource<T>` is a row-major width x height grid. The pipelines use
//! `Resource<UnsignedColor>` as the render target and `Resource<f32>` as the
//! depth buffer.

use serde::{Deserialize, Serialize};

use duo_math::Vec3;

/// Linear RGB color, channels nominally in [0, 1].
pub type Color = Vec3;

/// 8-bit RGB color as stored in the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct UnsignedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl UnsignedColor {
    pub const BLACK: UnsignedColor = UnsignedColor { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert a linear color, clamping each channel to [0, 1] first.
    ///
    /// Values are truncated, so 1.0 maps to 255 and 0.999 to 254.
    pub fn from_color(color: Color) -> Self {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        Self {
            r: quantize(color.x),
            g: quantize(color.y),
            b: quantize(color.z),
        }
    }

    /// Back to a linear color in [0, 1].
    pub fn to_color(self) -> Color {
        Color::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }
}

impl From<Color> for UnsignedColor {
    fn from(color: Color) -> Self {
        Self::from_color(color)
    }
}

/// Fixed-size 2D grid addressed by (x, y).
#[derive(Debug, Clone, PartialEq)]
pub struct Resource<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

impl<T: Copy + Default> Resource<T> {
    /// Create a grid filled with `T::default()`.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, T::default())
    }
}

impl<T: Copy> Resource<T> {
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "({}, {}) out of bounds", x, y);
        y as usize * self.width as usize + x as usize
    }

    /// Get the item at (x, y).
    #[inline]
    pub fn item(&self, x: u32, y: u32) -> T {
        self.data[self.index(x, y)]
    }

    /// Set the item at (x, y).
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// Overwrite every item.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Items in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_color_clamps() {
        let c = UnsignedColor::from_color(Color::new(-0.5, 0.5, 3.0));
        assert_eq!(c, UnsignedColor::new(0, 127, 255));
    }

    #[test]
    fn test_from_color_truncates() {
        assert_eq!(UnsignedColor::from_color(Color::ONE), UnsignedColor::new(255, 255, 255));
        assert_eq!(UnsignedColor::from_color(Color::splat(0.999)).r, 254);
    }

    #[test]
    fn test_resource_row_major_addressing() {
        let mut grid: Resource<u32> = Resource::new(4, 3);
        grid.set(3, 0, 7);
        grid.set(0, 2, 9);

        assert_eq!(grid.item(3, 0), 7);
        assert_eq!(grid.as_slice()[3], 7);
        assert_eq!(grid.as_slice()[8], 9);
        assert_eq!(grid.len(), 12);
    }

    #[test]
    fn test_resource_fill() {
        let mut depth = Resource::filled(2, 2, 0.5_f32);
        depth.fill(f32::INFINITY);
        assert!(depth.as_slice().iter().all(|d| d.is_infinite()));
    }
}
