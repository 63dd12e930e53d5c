use crate::device::{GpuContext, ProgramId, ShaderId, ShaderStage};
use crate::error::{BuildStep, RenderError};

use super::source::ShaderSources;

/// A program that compiled, linked and is current on the context that built it.
///
/// Only [`build_program`] creates one, so holding it proves the later pipeline
/// stages have a usable program to resolve names against.
#[derive(Debug)]
pub struct ActiveProgram {
    id: ProgramId,
}

impl ActiveProgram {
    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }
}

/// Compiles both stages, links them and makes the result current.
///
/// Stops at the first failing step; the returned error carries the compiler
/// or linker diagnostic.
pub fn build_program<C>(ctx: &mut C, sources: ShaderSources) -> Result<ActiveProgram, RenderError>
where
    C: GpuContext + ?Sized,
{
    let vertex = compile(ctx, ShaderStage::Vertex, sources.vertex)?;
    let fragment = compile(ctx, ShaderStage::Fragment, sources.fragment)?;

    let id = ctx
        .link_program(vertex, fragment)
        .map_err(|diagnostic| RenderError::ShaderBuildFailed {
            step: BuildStep::Link,
            diagnostic,
        })?;

    ctx.use_program(id);
    log::debug!("program {id:?} linked and in use");

    Ok(ActiveProgram { id })
}

fn compile<C>(ctx: &mut C, stage: ShaderStage, source: &str) -> Result<ShaderId, RenderError>
where
    C: GpuContext + ?Sized,
{
    ctx.compile_shader(stage, source)
        .map_err(|diagnostic| RenderError::ShaderBuildFailed {
            step: BuildStep::Compile(stage),
            diagnostic,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FaultPlan, GpuCall, RecordingContext};

    #[test]
    fn builds_and_activates_the_triangle_program() {
        let mut ctx = RecordingContext::new();
        let program = build_program(&mut ctx, ShaderSources::TRIANGLE).unwrap();

        assert_eq!(
            ctx.calls(),
            &[
                GpuCall::CompileShader { stage: ShaderStage::Vertex, ok: true },
                GpuCall::CompileShader { stage: ShaderStage::Fragment, ok: true },
                GpuCall::LinkProgram { ok: true },
                GpuCall::UseProgram(program.id()),
            ]
        );
    }

    #[test]
    fn vertex_failure_skips_fragment_and_link() {
        let mut ctx = RecordingContext::with_faults(FaultPlan {
            compile: Some(ShaderStage::Vertex),
            ..FaultPlan::default()
        });

        let err = build_program(&mut ctx, ShaderSources::TRIANGLE).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ShaderBuildFailed { step: BuildStep::Compile(ShaderStage::Vertex), .. }
        ));
        assert_eq!(ctx.calls().len(), 1);
    }

    #[test]
    fn broken_fragment_source_reports_fragment_stage() {
        let mut ctx = RecordingContext::new();
        let sources = ShaderSources {
            vertex: ShaderSources::TRIANGLE.vertex,
            fragment: "@fragment fn fs_main() -> @location(0) vec4<f32> { return undefined_name; }",
        };

        match build_program(&mut ctx, sources) {
            Err(RenderError::ShaderBuildFailed { step, diagnostic }) => {
                assert_eq!(step, BuildStep::Compile(ShaderStage::Fragment));
                assert!(diagnostic.contains("undefined_name"), "{diagnostic}");
            }
            other => panic!("expected a fragment compile failure, got {other:?}"),
        }
    }

    #[test]
    fn link_failure_never_activates_a_program() {
        let mut ctx = RecordingContext::with_faults(FaultPlan {
            link: true,
            ..FaultPlan::default()
        });

        let err = build_program(&mut ctx, ShaderSources::TRIANGLE).unwrap_err();
        assert!(matches!(err, RenderError::ShaderBuildFailed { step: BuildStep::Link, .. }));
        assert!(!ctx.calls().iter().any(|c| matches!(c, GpuCall::UseProgram(_))));
    }
}
