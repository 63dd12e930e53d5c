//! 4x4 matrix helpers.
//!
//! Conventions:
//! - right-handed world space, camera looks down -Z
//! - clip-space depth in `[0, 1]` (WebGPU)
//! - matrices are column-major; `multiply(a, b)` applies `b` first

pub use glam::{Mat4, Vec3};

#[inline]
pub fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// View matrix for a camera at `eye` looking at `center`.
#[inline]
pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(eye, center, up)
}

/// Perspective projection. `fovy_degrees` is the vertical field of view.
#[inline]
pub fn perspective(fovy_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fovy_degrees.to_radians(), aspect, near, far)
}

/// Returns `a × b`.
#[inline]
pub fn multiply(a: Mat4, b: Mat4) -> Mat4 {
    a * b
}
