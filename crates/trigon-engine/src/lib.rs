//! Trigon engine crate.
//!
//! Renders one colored triangle into a host-owned surface. A pass is a fixed
//! sequence of stages, each talking to the GPU through [`device::GpuContext`]:
//!
//! ```text
//!   surface::render
//!     ├─ resize surface to 1024x768, acquire context, clear
//!     ├─ shader::build_program      -> ActiveProgram
//!     ├─ geometry::upload_and_bind  -> BoundGeometry
//!     └─ transform::compute_and_draw (MVP uniform, draw, flush)
//! ```

pub mod device;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod math;
pub mod shader;
pub mod surface;
pub mod transform;

pub use error::{RenderError, RenderWarning};
pub use surface::{FIXED_SIZE, Surface, SurfaceSize, render, try_render};
