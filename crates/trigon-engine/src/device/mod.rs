//! GPU access.
//!
//! This module is responsible for:
//! - the [`GpuContext`] command surface used by every pipeline stage
//! - the wgpu implementation of it, rendering into a window or an offscreen texture
//! - a recording implementation for tests and dry runs

mod api;
mod init;
mod offscreen;
pub mod recording;
mod reflect;
mod wgpu_ctx;
mod window;

pub use api::{
    AttribSlot, BufferId, ClearColor, GpuContext, Primitive, ProgramId, ShaderId, ShaderStage,
    UniformSlot,
};
pub use init::GpuInit;
pub use offscreen::{OFFSCREEN_FORMAT, OffscreenSurface};
pub use recording::{FaultPlan, GpuCall, RecordingContext, RecordingSurface};
pub use wgpu_ctx::{DEPTH_FORMAT, WgpuContext};
pub use window::{SurfaceErrorAction, WindowSurface};
