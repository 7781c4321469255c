// Normal transforms for Mat4
//
// glam::Mat4 already provides transform_point3() and transform_vector3();
// normals need the inverse transpose instead.

use glam::{Mat3, Mat4, Vec3};

/// Extension trait for Mat4 covering surface normals.
pub trait Mat4Ext {
    /// Inverse transpose of the upper 3x3 block.
    fn normal_matrix(&self) -> Mat3;

    /// Transform a surface normal and renormalize it.
    ///
    /// Returns the input unchanged if it has zero length.
    fn transform_normal(&self, normal: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(*self).inverse().transpose()
    }

    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        (self.normal_matrix() * normal).try_normalize().unwrap_or(normal)
    }
}
