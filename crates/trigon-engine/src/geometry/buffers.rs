use crate::device::{BufferId, GpuContext};
use crate::error::{RenderError, RenderWarning};
use crate::shader::ActiveProgram;

use super::attribute::{AttributeSpec, BoundAttribute, validate};

/// Attributes bound for the next draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundGeometry {
    pub attributes: Vec<BoundAttribute>,
    pub vertex_count: usize,
}

/// Uploads every spec into its own static buffer and points the program's
/// attribute slots at them.
///
/// All specs are validated before the first GPU call. Uploads happen first,
/// each followed by an unbind; then every buffer is re-bound and its slot is
/// enabled and described right after its own bind. Attributes the program
/// does not declare are uploaded but left unbound.
pub fn upload_and_bind<C>(
    ctx: &mut C,
    program: &ActiveProgram,
    specs: &[AttributeSpec],
) -> Result<BoundGeometry, RenderError>
where
    C: GpuContext + ?Sized,
{
    let vertex_count = validate(specs)?;

    let mut attributes = Vec::with_capacity(specs.len());
    for spec in specs {
        let slot = ctx.attrib_location(program.id(), &spec.name);
        if slot.is_none() {
            RenderWarning::AttributeUnresolved {
                name: spec.name.clone(),
            }
            .report();
        }

        let buffer = upload(ctx, spec)?;
        attributes.push(BoundAttribute {
            slot,
            components: spec.components,
            buffer,
        });
    }

    for attribute in &attributes {
        ctx.bind_buffer(Some(attribute.buffer));
        if let Some(slot) = attribute.slot {
            ctx.enable_attrib(slot);
            ctx.attrib_pointer(slot, attribute.components);
        }
    }

    log::debug!(
        "bound {} attributes over {vertex_count} vertices",
        attributes.len()
    );

    Ok(BoundGeometry {
        attributes,
        vertex_count,
    })
}

fn upload<C>(ctx: &mut C, spec: &AttributeSpec) -> Result<BufferId, RenderError>
where
    C: GpuContext + ?Sized,
{
    let buffer = ctx
        .create_buffer()
        .ok_or_else(|| RenderError::BufferAllocation {
            name: spec.name.clone(),
        })?;

    ctx.bind_buffer(Some(buffer));
    ctx.buffer_data(&spec.data);
    ctx.bind_buffer(None);

    log::trace!("uploaded `{}` ({} floats) into {buffer:?}", spec.name, spec.data.len());
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AttribSlot, FaultPlan, GpuCall, RecordingContext};
    use crate::geometry::triangle_attributes;
    use crate::shader::{ShaderSources, build_program};

    fn ready(faults: FaultPlan) -> (RecordingContext, ActiveProgram) {
        let mut ctx = RecordingContext::with_faults(faults);
        let program = build_program(&mut ctx, ShaderSources::TRIANGLE).unwrap();
        (ctx, program)
    }

    /// Calls issued after the program build.
    fn geometry_calls(ctx: &RecordingContext) -> &[GpuCall] {
        &ctx.calls()[4..]
    }

    #[test]
    fn uploads_then_binds_in_order() {
        let (mut ctx, program) = ready(FaultPlan::default());
        let geometry = upload_and_bind(&mut ctx, &program, &triangle_attributes()).unwrap();

        assert_eq!(geometry.vertex_count, 3);
        let [position, color] = triangle_attributes();
        let (p, c) = (geometry.attributes[0].buffer, geometry.attributes[1].buffer);
        let (ps, cs) = (AttribSlot(0), AttribSlot(1));

        assert_eq!(
            geometry_calls(&ctx),
            &[
                GpuCall::CreateBuffer(p),
                GpuCall::BindBuffer(Some(p)),
                GpuCall::BufferData { buffer: p, data: position.data },
                GpuCall::BindBuffer(None),
                GpuCall::CreateBuffer(c),
                GpuCall::BindBuffer(Some(c)),
                GpuCall::BufferData { buffer: c, data: color.data },
                GpuCall::BindBuffer(None),
                GpuCall::BindBuffer(Some(p)),
                GpuCall::EnableAttrib(ps),
                GpuCall::AttribPointer { slot: ps, components: 3, buffer: p },
                GpuCall::BindBuffer(Some(c)),
                GpuCall::EnableAttrib(cs),
                GpuCall::AttribPointer { slot: cs, components: 4, buffer: c },
            ]
        );
    }

    #[test]
    fn every_pointer_reads_its_own_buffer() {
        let (mut ctx, program) = ready(FaultPlan::default());
        let geometry = upload_and_bind(&mut ctx, &program, &triangle_attributes()).unwrap();

        for attribute in &geometry.attributes {
            let pointer = ctx.calls().iter().find_map(|call| match call {
                GpuCall::AttribPointer { slot, buffer, .. } if Some(*slot) == attribute.slot => {
                    Some(*buffer)
                }
                _ => None,
            });
            assert_eq!(pointer, Some(attribute.buffer));
        }
    }

    #[test]
    fn unresolved_attribute_is_uploaded_but_not_enabled() {
        let (mut ctx, program) = ready(FaultPlan::default());
        let mut specs = triangle_attributes().to_vec();
        specs.push(AttributeSpec::new("normal", 3, vec![0.0, 0.0, 1.0].repeat(3)));

        let geometry = upload_and_bind(&mut ctx, &program, &specs).unwrap();

        assert_eq!(geometry.attributes[2].slot, None);
        let enables = ctx
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::EnableAttrib(_)))
            .count();
        assert_eq!(enables, 2);
    }

    #[test]
    fn malformed_data_is_rejected_before_any_upload() {
        let (mut ctx, program) = ready(FaultPlan::default());
        let specs = [AttributeSpec::new("position", 3, vec![0.0; 7])];

        let err = upload_and_bind(&mut ctx, &program, &specs).unwrap_err();
        assert!(matches!(err, RenderError::MalformedAttribute { .. }));
        assert!(geometry_calls(&ctx).is_empty());
    }

    #[test]
    fn allocation_failure_is_fatal() {
        let (mut ctx, program) = ready(FaultPlan {
            buffers: true,
            ..FaultPlan::default()
        });

        let err = upload_and_bind(&mut ctx, &program, &triangle_attributes()).unwrap_err();
        assert_eq!(err, RenderError::BufferAllocation { name: "position".into() });
    }
}
