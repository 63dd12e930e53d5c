//! Camera, MVP computation and the draw call.

mod camera;
mod draw;

pub use camera::Camera;
pub use draw::{TransformSet, compute_and_draw};
