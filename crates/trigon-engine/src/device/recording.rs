//! Call-recording backend.
//!
//! [`RecordingContext`] implements [`GpuContext`] on the CPU: shaders are
//! compiled and linked with the same `naga` front end as the wgpu backend, but
//! buffers, uniforms and draws are only recorded. It backs the test suite and
//! the studio's dry-run mode.

use anyhow::Result;

use crate::error::DrawRejected;
use crate::surface::{Surface, SurfaceSize};

use super::api::{
    AttribSlot, BufferId, ClearColor, GpuContext, Primitive, ProgramId, ShaderId, ShaderStage,
    UniformSlot,
};
use super::reflect::{self, ProgramLayout, StageReflection};

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    Clear { color: ClearColor, depth: f32 },
    CompileShader { stage: ShaderStage, ok: bool },
    LinkProgram { ok: bool },
    UseProgram(ProgramId),
    CreateBuffer(BufferId),
    BindBuffer(Option<BufferId>),
    BufferData { buffer: BufferId, data: Vec<f32> },
    EnableAttrib(AttribSlot),
    AttribPointer { slot: AttribSlot, components: u32, buffer: BufferId },
    UniformMatrix4 { name: String, transpose: bool, value: [f32; 16] },
    DrawArrays { primitive: Primitive, first: u32, count: u32 },
    Flush,
}

/// Failures a [`RecordingContext`] injects on purpose.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Fail compilation of this stage with a canned diagnostic.
    pub compile: Option<ShaderStage>,
    /// Fail every link.
    pub link: bool,
    /// Refuse every buffer allocation.
    pub buffers: bool,
}

#[derive(Debug, Default, Copy, Clone)]
struct AttribState {
    enabled: bool,
    source: Option<(BufferId, u32)>,
}

/// [`GpuContext`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingContext {
    faults: FaultPlan,
    calls: Vec<GpuCall>,

    shaders: Vec<StageReflection>,
    programs: Vec<ProgramLayout>,
    current: Option<ProgramId>,

    buffer_lens: Vec<usize>,
    bound: Option<BufferId>,
    attribs: std::collections::BTreeMap<AttribSlot, AttribState>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<GpuCall> {
        self.calls
    }

    fn check_inputs(&self, layout: &ProgramLayout, end: u32) -> Result<(), DrawRejected> {
        for input in &layout.inputs {
            let label = input.name.as_deref().unwrap_or("<unnamed>");
            let state = self
                .attribs
                .get(&AttribSlot(input.location))
                .copied()
                .unwrap_or_default();

            let Some((buffer, components)) = state.source.filter(|_| state.enabled) else {
                return Err(DrawRejected::new(format!("vertex input `{label}` is not enabled")));
            };
            if components != input.components {
                return Err(DrawRejected::new(format!(
                    "vertex input `{label}` declares {components} components but the shader reads {}",
                    input.components
                )));
            }
            let floats = self.buffer_lens.get(buffer.0 as usize).copied().unwrap_or(0);
            if floats / (components as usize) < end as usize {
                return Err(DrawRejected::new(format!(
                    "vertex input `{label}` holds too few vertices for the draw"
                )));
            }
        }
        Ok(())
    }
}

impl GpuContext for RecordingContext {
    fn clear(&mut self, color: ClearColor, depth: f32) {
        self.calls.push(GpuCall::Clear { color, depth });
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let result = if self.faults.compile == Some(stage) {
            Err(format!("injected {stage} compile failure"))
        } else {
            reflect::compile_stage(stage, source)
        };

        self.calls.push(GpuCall::CompileShader {
            stage,
            ok: result.is_ok(),
        });

        let reflection = result?;
        self.shaders.push(reflection);
        Ok(ShaderId(self.shaders.len() as u32 - 1))
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let result = if self.faults.link {
            Err("injected link failure".to_string())
        } else {
            match (
                self.shaders.get(vertex.0 as usize),
                self.shaders.get(fragment.0 as usize),
            ) {
                (Some(vs), Some(fs)) => reflect::link(vs, fs),
                _ => Err("unknown shader handle".to_string()),
            }
        };

        self.calls.push(GpuCall::LinkProgram { ok: result.is_ok() });

        self.programs.push(result?);
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(GpuCall::UseProgram(program));
        self.current = Some(program);
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribSlot> {
        let layout = self.programs.get(program.0 as usize)?;
        layout.input(name).map(|v| AttribSlot(v.location))
    }

    fn create_buffer(&mut self) -> Option<BufferId> {
        if self.faults.buffers {
            return None;
        }
        let id = BufferId(self.buffer_lens.len() as u32);
        self.buffer_lens.push(0);
        self.calls.push(GpuCall::CreateBuffer(id));
        Some(id)
    }

    fn bind_buffer(&mut self, buffer: Option<BufferId>) {
        self.calls.push(GpuCall::BindBuffer(buffer));
        self.bound = buffer;
    }

    fn buffer_data(&mut self, data: &[f32]) {
        let Some(buffer) = self.bound else { return };
        if let Some(len) = self.buffer_lens.get_mut(buffer.0 as usize) {
            *len = data.len();
        }
        self.calls.push(GpuCall::BufferData {
            buffer,
            data: data.to_vec(),
        });
    }

    fn enable_attrib(&mut self, slot: AttribSlot) {
        self.calls.push(GpuCall::EnableAttrib(slot));
        self.attribs.entry(slot).or_default().enabled = true;
    }

    fn attrib_pointer(&mut self, slot: AttribSlot, components: u32) {
        let Some(buffer) = self.bound else { return };
        self.calls.push(GpuCall::AttribPointer {
            slot,
            components,
            buffer,
        });
        self.attribs.entry(slot).or_default().source = Some((buffer, components));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot> {
        let layout = self.programs.get(program.0 as usize)?;
        layout.uniform_index(name).map(|i| UniformSlot(i as u32))
    }

    fn uniform_matrix4(&mut self, slot: UniformSlot, transpose: bool, value: &[f32; 16]) {
        let name = self
            .current
            .and_then(|p| self.programs.get(p.0 as usize))
            .and_then(|layout| layout.uniforms.get(slot.0 as usize))
            .map(|u| u.name.clone())
            .unwrap_or_default();

        self.calls.push(GpuCall::UniformMatrix4 {
            name,
            transpose,
            value: *value,
        });
    }

    fn draw_arrays(
        &mut self,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) -> Result<(), DrawRejected> {
        let layout = self
            .current
            .and_then(|p| self.programs.get(p.0 as usize))
            .ok_or_else(|| DrawRejected::new("no program in use"))?;
        self.check_inputs(layout, first + count)?;

        self.calls.push(GpuCall::DrawArrays {
            primitive,
            first,
            count,
        });
        Ok(())
    }

    fn flush(&mut self) {
        self.calls.push(GpuCall::Flush);
    }
}

/// [`Surface`] producing [`RecordingContext`]s and keeping each finished pass.
#[derive(Debug)]
pub struct RecordingSurface {
    size: SurfaceSize,
    /// When false, `acquire_context` fails as a surface without a GPU would.
    pub available: bool,
    pub faults: FaultPlan,
    passes: Vec<Vec<GpuCall>>,
}

impl RecordingSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            available: true,
            faults: FaultPlan::default(),
            passes: Vec::new(),
        }
    }

    /// Call traces of every pass that reached presentation, oldest first.
    pub fn passes(&self) -> &[Vec<GpuCall>] {
        &self.passes
    }
}

impl Surface for RecordingSurface {
    type Context = RecordingContext;

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn acquire_context(&mut self) -> Result<RecordingContext> {
        anyhow::ensure!(self.available, "recording surface is marked unavailable");
        Ok(RecordingContext::with_faults(self.faults.clone()))
    }

    fn present(&mut self, ctx: RecordingContext) {
        self.passes.push(ctx.into_calls());
    }
}
