use std::fmt;

use crate::error::DrawRejected;

/// Pipeline stage a shader source is compiled for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Handle to a compiled (not yet linked) shader stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderId(pub u32);

/// Handle to a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u32);

/// Handle to a GPU vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u32);

/// Vertex input slot of the active program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AttribSlot(pub u32);

/// Uniform slot of the active program.
///
/// Slots are only meaningful for the program they were resolved from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformSlot(pub u32);

/// Primitive assembly mode for a draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
    Lines,
    Points,
}

/// Opaque RGBA clear color in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const OPAQUE_BLACK: ClearColor = ClearColor { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
}

/// Immediate-mode command surface every pipeline stage talks to.
///
/// The model is a single current program, a single bound vertex buffer and a
/// table of attribute slots that remember which buffer they read from when
/// their layout was declared. Implementations:
/// - [`WgpuContext`](crate::device::WgpuContext) executes on a real device
/// - [`RecordingContext`](crate::device::RecordingContext) records every call
pub trait GpuContext {
    /// Clears the color and depth targets.
    fn clear(&mut self, color: ClearColor, depth: f32);

    /// Compiles one stage. On failure the compiler diagnostic is returned.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;

    /// Links a vertex and a fragment stage. On failure the link log is returned.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;

    /// Makes `program` the current program.
    fn use_program(&mut self, program: ProgramId);

    /// Resolves a vertex input by name. `None` if the program does not declare it.
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribSlot>;

    /// Allocates a buffer handle. `None` if the backend is out of handles or memory.
    fn create_buffer(&mut self) -> Option<BufferId>;

    /// Binds `buffer` as the current vertex buffer, or unbinds with `None`.
    fn bind_buffer(&mut self, buffer: Option<BufferId>);

    /// Uploads `data` into the bound buffer. The contents are write-once.
    fn buffer_data(&mut self, data: &[f32]);

    fn enable_attrib(&mut self, slot: AttribSlot);

    /// Declares `slot` as `components` tightly packed `f32`s per vertex read
    /// from the currently bound buffer.
    fn attrib_pointer(&mut self, slot: AttribSlot, components: u32);

    /// Resolves a uniform by name. `None` if the program does not declare it.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot>;

    /// Uploads a 4x4 matrix given in column-major order.
    fn uniform_matrix4(&mut self, slot: UniformSlot, transpose: bool, value: &[f32; 16]);

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32)
        -> Result<(), DrawRejected>;

    /// Submits all queued work and waits for it to complete.
    fn flush(&mut self);
}
