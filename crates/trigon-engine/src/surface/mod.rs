//! Drawable surfaces and the per-pass controller.

mod controller;

pub use controller::{PASS_CLEAR_COLOR, PASS_CLEAR_DEPTH, render, try_render};

use anyhow::Result;

use crate::device::GpuContext;

/// Size every pass normalizes its surface to, in physical pixels.
pub const FIXED_SIZE: SurfaceSize = SurfaceSize::new(1024, 768);

/// Surface extent in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height. Empty sizes report `1.0`.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// A drawable target owned by the host.
///
/// A surface hands out one [`GpuContext`] per pass and takes it back when the
/// pass is over, so it can present whatever was drawn.
pub trait Surface {
    type Context: GpuContext;

    fn size(&self) -> SurfaceSize;

    /// Changes the drawable extent. Later contexts render at the new size.
    fn resize(&mut self, size: SurfaceSize);

    /// Produces a context bound to this surface, or explains why none is available.
    fn acquire_context(&mut self) -> Result<Self::Context>;

    /// Ends the pass started by `acquire_context`.
    fn present(&mut self, ctx: Self::Context);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_aspect_is_four_thirds() {
        assert!((FIXED_SIZE.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_size_has_unit_aspect() {
        assert!(SurfaceSize::new(0, 768).is_empty());
        assert_eq!(SurfaceSize::new(1024, 0).aspect(), 1.0);
    }
}
