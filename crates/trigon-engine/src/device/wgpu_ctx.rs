use std::collections::BTreeMap;

use wgpu::util::DeviceExt;

use crate::error::DrawRejected;
use crate::surface::SurfaceSize;

use super::api::{
    AttribSlot, BufferId, ClearColor, GpuContext, Primitive, ProgramId, ShaderId, ShaderStage,
    UniformSlot,
};
use super::reflect::{self, ProgramLayout, StageReflection};

/// Depth target format used by every pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

struct CompiledShader {
    reflection: StageReflection,
    module: wgpu::ShaderModule,
}

struct LinkedProgram {
    layout: ProgramLayout,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    /// Raw bytes per entry of `layout.uniforms`; `None` until uploaded.
    uniform_values: Vec<Option<Vec<u8>>>,
}

/// Per-slot vertex input state.
#[derive(Debug, Default, Copy, Clone)]
struct AttribState {
    enabled: bool,
    /// Buffer and component count captured by the last `attrib_pointer`.
    source: Option<(BufferId, u32)>,
}

/// [`GpuContext`] backed by a wgpu device, rendering into one color target.
///
/// Commands are recorded into a single encoder and submitted on [`flush`].
/// Clears are deferred and folded into the load ops of the next render pass.
///
/// [`flush`]: GpuContext::flush
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,

    format: wgpu::TextureFormat,
    target: wgpu::TextureView,
    depth: wgpu::TextureView,

    /// Swapchain image backing `target`, handed back for presentation.
    frame: Option<wgpu::SurfaceTexture>,

    encoder: Option<wgpu::CommandEncoder>,
    pending_clear: Option<(ClearColor, f32)>,

    shaders: Vec<CompiledShader>,
    programs: Vec<LinkedProgram>,
    current: Option<ProgramId>,

    /// Buffers are sized on first upload, so a handle may not have storage yet.
    buffers: Vec<Option<wgpu::Buffer>>,
    bound: Option<BufferId>,
    attribs: BTreeMap<AttribSlot, AttribState>,
}

impl WgpuContext {
    /// Creates a context rendering into `target`.
    ///
    /// A depth target of matching `size` is allocated for the lifetime of the context.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: wgpu::TextureView,
        format: wgpu::TextureFormat,
        size: SurfaceSize,
        frame: Option<wgpu::SurfaceTexture>,
    ) -> Self {
        let depth = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("trigon depth"),
                size: wgpu::Extent3d {
                    width: size.width.max(1),
                    height: size.height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            device,
            queue,
            format,
            target,
            depth,
            frame,
            encoder: None,
            pending_clear: None,
            shaders: Vec::new(),
            programs: Vec::new(),
            current: None,
            buffers: Vec::new(),
            bound: None,
            attribs: BTreeMap::new(),
        }
    }

    /// Consumes the context, returning the swapchain image it rendered into.
    pub fn into_frame(self) -> Option<wgpu::SurfaceTexture> {
        self.frame
    }

    fn ensure_encoder(&mut self) {
        if self.encoder.is_none() {
            self.encoder = Some(self.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor {
                    label: Some("trigon pass encoder"),
                },
            ));
        }
    }

    fn load_ops(&mut self) -> (wgpu::LoadOp<wgpu::Color>, wgpu::LoadOp<f32>) {
        match self.pending_clear.take() {
            Some((c, depth)) => (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: c.r as f64,
                    g: c.g as f64,
                    b: c.b as f64,
                    a: c.a as f64,
                }),
                wgpu::LoadOp::Clear(depth),
            ),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        }
    }

    fn begin_pass<'e>(
        encoder: &'e mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        load: (wgpu::LoadOp<wgpu::Color>, wgpu::LoadOp<f32>),
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("trigon pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load.0,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: load.1,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }

    /// Encodes an empty pass so a pending clear reaches the targets.
    fn apply_pending_clear(&mut self) {
        if self.pending_clear.is_none() {
            return;
        }
        let load = self.load_ops();
        self.ensure_encoder();
        let Some(encoder) = self.encoder.as_mut() else { return };
        let _rpass = Self::begin_pass(encoder, &self.target, &self.depth, load);
    }

    /// Collects one vertex buffer per program input, validating each against
    /// the declared attribute state.
    fn vertex_sources(
        &self,
        layout: &ProgramLayout,
        first: u32,
        count: u32,
    ) -> Result<Vec<(wgpu::Buffer, wgpu::VertexAttribute, u64)>, DrawRejected> {
        let mut sources = Vec::with_capacity(layout.inputs.len());

        for input in &layout.inputs {
            let label = input.name.as_deref().unwrap_or("<unnamed>");
            let slot = AttribSlot(input.location);

            let state = self.attribs.get(&slot).copied().unwrap_or_default();
            if !state.enabled {
                return Err(DrawRejected::new(format!(
                    "vertex input `{label}` at location {} is not enabled",
                    input.location
                )));
            }
            let Some((buffer_id, components)) = state.source else {
                return Err(DrawRejected::new(format!("vertex input `{label}` has no layout")));
            };
            if components != input.components {
                return Err(DrawRejected::new(format!(
                    "vertex input `{label}` declares {} components but the shader reads {}",
                    components, input.components
                )));
            }
            let Some(buffer) = self
                .buffers
                .get(buffer_id.0 as usize)
                .and_then(Option::as_ref)
            else {
                return Err(DrawRejected::new(format!("vertex input `{label}` reads an empty buffer")));
            };

            let stride = u64::from(components) * std::mem::size_of::<f32>() as u64;
            let available = buffer.size() / stride;
            if u64::from(first) + u64::from(count) > available {
                return Err(DrawRejected::new(format!(
                    "vertex input `{label}` holds {available} vertices, draw needs {}",
                    u64::from(first) + u64::from(count)
                )));
            }

            let attribute = wgpu::VertexAttribute {
                format: float_format(components)?,
                offset: 0,
                shader_location: input.location,
            };
            sources.push((buffer.clone(), attribute, stride));
        }

        Ok(sources)
    }
}

fn float_format(components: u32) -> Result<wgpu::VertexFormat, DrawRejected> {
    match components {
        1 => Ok(wgpu::VertexFormat::Float32),
        2 => Ok(wgpu::VertexFormat::Float32x2),
        3 => Ok(wgpu::VertexFormat::Float32x3),
        4 => Ok(wgpu::VertexFormat::Float32x4),
        n => Err(DrawRejected::new(format!("unsupported component count {n}"))),
    }
}

fn topology(primitive: Primitive) -> wgpu::PrimitiveTopology {
    match primitive {
        Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Primitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        Primitive::Lines => wgpu::PrimitiveTopology::LineList,
        Primitive::Points => wgpu::PrimitiveTopology::PointList,
    }
}

impl GpuContext for WgpuContext {
    fn clear(&mut self, color: ClearColor, depth: f32) {
        self.pending_clear = Some((color, depth));
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let reflection = reflect::compile_stage(stage, source)?;
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "trigon vertex shader",
                ShaderStage::Fragment => "trigon fragment shader",
            }),
            source: wgpu::ShaderSource::Wgsl(source.to_owned().into()),
        });

        let id = ShaderId(self.shaders.len() as u32);
        self.shaders.push(CompiledShader { reflection, module });
        Ok(id)
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let (Some(vs), Some(fs)) = (
            self.shaders.get(vertex.0 as usize),
            self.shaders.get(fragment.0 as usize),
        ) else {
            return Err("unknown shader handle".to_string());
        };

        let layout = reflect::link(&vs.reflection, &fs.reflection)?;
        let program = LinkedProgram {
            uniform_values: vec![None; layout.uniforms.len()],
            layout,
            vertex: vs.module.clone(),
            fragment: fs.module.clone(),
        };

        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(program);
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        if (program.0 as usize) < self.programs.len() {
            self.current = Some(program);
        } else {
            log::warn!("use_program: unknown program {program:?}");
        }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribSlot> {
        let program = self.programs.get(program.0 as usize)?;
        program.layout.input(name).map(|v| AttribSlot(v.location))
    }

    fn create_buffer(&mut self) -> Option<BufferId> {
        let id = BufferId(u32::try_from(self.buffers.len()).ok()?);
        self.buffers.push(None);
        Some(id)
    }

    fn bind_buffer(&mut self, buffer: Option<BufferId>) {
        self.bound = buffer;
    }

    fn buffer_data(&mut self, data: &[f32]) {
        let Some(id) = self.bound else {
            log::warn!("buffer_data: no buffer bound");
            return;
        };
        let Some(slot) = self.buffers.get_mut(id.0 as usize) else {
            log::warn!("buffer_data: unknown buffer {id:?}");
            return;
        };
        *slot = Some(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("trigon vertex buffer"),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX,
        }));
    }

    fn enable_attrib(&mut self, slot: AttribSlot) {
        self.attribs.entry(slot).or_default().enabled = true;
    }

    fn attrib_pointer(&mut self, slot: AttribSlot, components: u32) {
        let Some(buffer) = self.bound else {
            log::warn!("attrib_pointer: no buffer bound for {slot:?}");
            return;
        };
        self.attribs.entry(slot).or_default().source = Some((buffer, components));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot> {
        let program = self.programs.get(program.0 as usize)?;
        program.layout.uniform_index(name).map(|i| UniformSlot(i as u32))
    }

    fn uniform_matrix4(&mut self, slot: UniformSlot, transpose: bool, value: &[f32; 16]) {
        let Some(program) = self.current.and_then(|p| self.programs.get_mut(p.0 as usize)) else {
            log::warn!("uniform_matrix4: no program in use");
            return;
        };
        let Some(decl) = program.layout.uniforms.get(slot.0 as usize) else {
            log::warn!("uniform_matrix4: unknown slot {slot:?}");
            return;
        };
        if decl.size != std::mem::size_of::<[f32; 16]>() as u64 {
            log::warn!("uniform_matrix4: `{}` is {} bytes, not a 4x4 matrix", decl.name, decl.size);
            return;
        }

        let columns = if transpose {
            glam::Mat4::from_cols_array(value).transpose().to_cols_array()
        } else {
            *value
        };
        program.uniform_values[slot.0 as usize] = Some(bytemuck::cast_slice(&columns).to_vec());
    }

    fn draw_arrays(
        &mut self,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) -> Result<(), DrawRejected> {
        let Some(program_id) = self.current else {
            return Err(DrawRejected::new("no program in use"));
        };
        let Some(program) = self.programs.get(program_id.0 as usize) else {
            return Err(DrawRejected::new("current program no longer exists"));
        };

        let sources = self.vertex_sources(&program.layout, first, count)?;
        let attributes: Vec<[wgpu::VertexAttribute; 1]> =
            sources.iter().map(|(_, attr, _)| [*attr]).collect();
        let buffer_layouts: Vec<wgpu::VertexBufferLayout<'_>> = sources
            .iter()
            .zip(&attributes)
            .map(|((_, _, stride), attrs)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("trigon pipeline"),
            // Derived from the shader interface.
            layout: None,

            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some(&program.layout.vertex_entry),
                compilation_options: Default::default(),
                buffers: &buffer_layouts,
            },

            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some(&program.layout.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: topology(primitive),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            // Depth test off: the target is cleared but never compared against.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        // Uniforms that were never uploaded read as zero.
        let mut bind_groups = Vec::new();
        for group in program.layout.max_group().map_or(0..0, |max| 0..max + 1) {
            let buffers: Vec<(u32, wgpu::Buffer)> = program
                .layout
                .uniforms
                .iter()
                .zip(&program.uniform_values)
                .filter(|(decl, _)| decl.group == group)
                .map(|(decl, value)| {
                    let contents = value
                        .clone()
                        .unwrap_or_else(|| vec![0u8; decl.size as usize]);
                    let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("trigon uniform buffer"),
                        contents: &contents,
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                    (decl.binding, buffer)
                })
                .collect();

            let entries: Vec<wgpu::BindGroupEntry<'_>> = buffers
                .iter()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: buffer.as_entire_binding(),
                })
                .collect();

            bind_groups.push(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("trigon uniforms"),
                layout: &pipeline.get_bind_group_layout(group),
                entries: &entries,
            }));
        }

        log::trace!(
            "draw {primitive:?} {first}..{} with {} inputs, {} bind groups",
            first + count,
            sources.len(),
            bind_groups.len()
        );

        let load = self.load_ops();
        self.ensure_encoder();
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(DrawRejected::new("no command encoder"));
        };
        let mut rpass = Self::begin_pass(encoder, &self.target, &self.depth, load);

        rpass.set_pipeline(&pipeline);
        for (index, group) in bind_groups.iter().enumerate() {
            rpass.set_bind_group(index as u32, group, &[]);
        }
        for (index, (buffer, _, _)) in sources.iter().enumerate() {
            rpass.set_vertex_buffer(index as u32, buffer.slice(..));
        }
        rpass.draw(first..first + count, 0..1);

        Ok(())
    }

    fn flush(&mut self) {
        self.apply_pending_clear();
        let Some(encoder) = self.encoder.take() else { return };
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Err(err) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("device poll after flush failed: {err}");
        }
    }
}
