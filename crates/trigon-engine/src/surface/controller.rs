use crate::device::{ClearColor, GpuContext};
use crate::error::RenderError;
use crate::geometry::{triangle_attributes, upload_and_bind};
use crate::shader::{ShaderSources, build_program};
use crate::transform::{Camera, compute_and_draw};

use super::{FIXED_SIZE, Surface};

pub const PASS_CLEAR_COLOR: ClearColor = ClearColor::OPAQUE_BLACK;

/// Farthest depth value.
pub const PASS_CLEAR_DEPTH: f32 = 1.0;

/// Renders one pass into `surface`, logging instead of returning failures.
///
/// A failed pass leaves nothing drawn beyond the clear.
pub fn render<S: Surface>(surface: &mut S) {
    if let Err(err) = try_render(surface) {
        log::error!("render pass aborted: {err}");
    }
}

/// Renders one pass into `surface`.
///
/// Sequence: normalize the surface size, acquire a context, clear, build the
/// program, upload geometry, then transform and draw. The first failing step
/// ends the pass. Once a context was acquired it is always flushed and handed
/// back to the surface, so whatever the pass got to is presented.
pub fn try_render<S: Surface>(surface: &mut S) -> Result<(), RenderError> {
    surface.resize(FIXED_SIZE);

    let mut ctx = surface
        .acquire_context()
        .map_err(|err| RenderError::ContextUnavailable {
            reason: format!("{err:#}"),
        })?;

    let camera = Camera::for_surface(surface.size());
    let result = draw_triangle(&mut ctx, &camera);
    if result.is_err() {
        // Lands the clear; nothing else is queued.
        ctx.flush();
    }

    surface.present(ctx);
    result
}

fn draw_triangle<C>(ctx: &mut C, camera: &Camera) -> Result<(), RenderError>
where
    C: GpuContext + ?Sized,
{
    ctx.clear(PASS_CLEAR_COLOR, PASS_CLEAR_DEPTH);

    let program = build_program(ctx, ShaderSources::TRIANGLE)?;
    let geometry = upload_and_bind(ctx, &program, &triangle_attributes())?;
    compute_and_draw(ctx, &program, camera, geometry.vertex_count)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FaultPlan, GpuCall, RecordingSurface, ShaderStage};
    use crate::error::BuildStep;
    use crate::surface::SurfaceSize;

    #[test]
    fn normalizes_any_input_size() {
        for size in [
            SurfaceSize::new(1000, 800),
            SurfaceSize::new(1, 1),
            SurfaceSize::new(0, 0),
            SurfaceSize::new(4096, 2160),
        ] {
            let mut surface = RecordingSurface::new(size);
            render(&mut surface);
            assert_eq!(surface.size(), FIXED_SIZE);
        }
    }

    #[test]
    fn unavailable_context_aborts_without_calls() {
        let mut surface = RecordingSurface::new(SurfaceSize::new(300, 150));
        surface.available = false;

        let err = try_render(&mut surface).unwrap_err();
        assert!(matches!(err, RenderError::ContextUnavailable { .. }));
        assert!(surface.passes().is_empty());
        assert_eq!(surface.size(), FIXED_SIZE);
    }

    #[test]
    fn pass_starts_with_opaque_black_clear() {
        let mut surface = RecordingSurface::new(FIXED_SIZE);
        try_render(&mut surface).unwrap();

        assert_eq!(
            surface.passes()[0][0],
            GpuCall::Clear { color: ClearColor::OPAQUE_BLACK, depth: 1.0 }
        );
    }

    #[test]
    fn shader_failure_clears_flushes_and_never_draws() {
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let mut surface = RecordingSurface::new(FIXED_SIZE);
            surface.faults = FaultPlan {
                compile: Some(stage),
                ..FaultPlan::default()
            };

            let err = try_render(&mut surface).unwrap_err();
            assert!(matches!(
                err,
                RenderError::ShaderBuildFailed { step: BuildStep::Compile(s), .. } if s == stage
            ));

            let calls = &surface.passes()[0];
            assert!(matches!(calls.first(), Some(GpuCall::Clear { .. })));
            assert_eq!(calls.last(), Some(&GpuCall::Flush));
            assert!(!calls.iter().any(|c| matches!(c, GpuCall::DrawArrays { .. })));
        }
    }
}
