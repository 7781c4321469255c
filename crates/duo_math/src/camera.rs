use glam::{Mat4, Vec3};

use crate::{Interval, Ray};

/// Camera described by a position and spherical view angles.
///
/// `theta` turns the view around the world Y axis, `phi` tilts it up or
/// down. Both are stored in radians; the setters take degrees like the
/// settings file does.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    position: Vec3,
    theta: f32,
    phi: f32,
    width: f32,
    height: f32,
    angle_of_view: f32,
    z_near: f32,
    z_far: f32,
}

impl Camera {
    /// Camera at the origin looking down -Z.
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            theta: 0.0,
            phi: 0.0,
            width: 1920.0,
            height: 1080.0,
            angle_of_view: 60.0_f32.to_radians(),
            z_near: 0.001,
            z_far: 100.0,
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_theta(&mut self, degrees: f32) {
        self.theta = degrees.to_radians();
    }

    pub fn set_phi(&mut self, degrees: f32) {
        self.phi = degrees.to_radians();
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    /// Vertical field of view in degrees.
    pub fn set_angle_of_view(&mut self, degrees: f32) {
        self.angle_of_view = degrees.to_radians();
    }

    pub fn set_z_near(&mut self, z_near: f32) {
        self.z_near = z_near;
    }

    pub fn set_z_far(&mut self, z_far: f32) {
        self.z_far = z_far;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Unit view direction.
    pub fn direction(&self) -> Vec3 {
        Vec3::new(
            self.theta.sin() * self.phi.cos(),
            self.phi.sin(),
            -self.theta.cos() * self.phi.cos(),
        )
    }

    /// Unit right vector. Looking straight up or down falls back to +X.
    pub fn right(&self) -> Vec3 {
        self.direction().cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X)
    }

    /// Unit up vector, orthogonal to direction and right.
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.direction()).normalize()
    }

    /// World to camera space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction(), self.up())
    }

    /// Camera to clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.angle_of_view, self.aspect(), self.z_near, self.z_far)
    }

    /// Combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Basis for generating primary rays that match `projection_matrix`.
    pub fn pinhole_basis(&self) -> PinholeBasis {
        let half_height = (self.angle_of_view * 0.5).tan();
        let half_width = half_height * self.aspect();
        PinholeBasis {
            origin: self.position,
            forward: self.direction(),
            right: self.right() * half_width,
            up: self.up() * half_height,
            depth_range: Interval::new(self.z_near, self.z_far),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// Pinhole projection frame.
///
/// `right` and `up` are scaled to the half extents of the image plane at unit
/// distance along `forward`. Since `forward` has unit length, the parameter
/// of a generated ray equals its view-space depth, so `depth_range` can be
/// used directly as the ray bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeBasis {
    pub origin: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub depth_range: Interval,
}

impl PinholeBasis {
    /// Primary ray through the centre of pixel (x, y) of a width x height
    /// image. Row 0 is the top of the image.
    pub fn ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let u = 2.0 * (x as f32 + 0.5) / width as f32 - 1.0;
        let v = 1.0 - 2.0 * (y as f32 + 0.5) / height as f32;
        Ray::new(self.origin, self.forward + u * self.right + v * self.up)
    }
}
