use glam::{Mat4, Vec3};

use crate::math;
use crate::surface::{FIXED_SIZE, SurfaceSize};

/// Fixed viewpoint and lens the triangle is rendered with.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    /// Vertical field of view.
    pub fovy_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// The standard camera with its aspect taken from `size`.
    pub fn for_surface(size: SurfaceSize) -> Self {
        Self {
            eye: Vec3::new(0.0, 1.0, 3.0),
            center: Vec3::ZERO,
            up: Vec3::Y,
            fovy_degrees: 90.0,
            aspect: size.aspect(),
            near: 0.1,
            far: 100.0,
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        math::look_at(self.eye, self.center, self.up)
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        math::perspective(self.fovy_degrees, self.aspect, self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::for_surface(FIXED_SIZE)
    }
}
