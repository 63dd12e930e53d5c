use glam::Mat4;

use crate::device::{GpuContext, Primitive};
use crate::error::{DrawRejected, RenderError, RenderWarning};
use crate::math;
use crate::shader::{ActiveProgram, MVP_UNIFORM};

use super::camera::Camera;

/// Matrices used for one pass.
///
/// Invariant: `mvp == projection * view * model`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformSet {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub mvp: Mat4,
}

impl TransformSet {
    pub fn identity() -> Self {
        Self {
            model: math::identity(),
            view: math::identity(),
            projection: math::identity(),
            mvp: math::identity(),
        }
    }

    /// Populates view and projection from `camera`; the model stays identity.
    pub fn compute(camera: &Camera) -> Self {
        let mut set = Self::identity();
        set.view = camera.view();
        set.projection = camera.projection();

        set.mvp = math::multiply(set.projection, set.view);
        set.mvp = math::multiply(set.mvp, set.model);
        set
    }
}

/// Uploads the MVP for `camera`, draws `vertex_count` vertices as triangles
/// and waits for the GPU to finish.
///
/// A program without the MVP uniform still draws, untransformed.
pub fn compute_and_draw<C>(
    ctx: &mut C,
    program: &ActiveProgram,
    camera: &Camera,
    vertex_count: usize,
) -> Result<TransformSet, RenderError>
where
    C: GpuContext + ?Sized,
{
    let transforms = TransformSet::compute(camera);

    match ctx.uniform_location(program.id(), MVP_UNIFORM) {
        Some(slot) => ctx.uniform_matrix4(slot, false, &transforms.mvp.to_cols_array()),
        None => RenderWarning::UniformUnresolved {
            name: MVP_UNIFORM.to_string(),
        }
        .report(),
    }

    let count = u32::try_from(vertex_count)
        .map_err(|_| DrawRejected::new(format!("{vertex_count} vertices exceed the draw range")))?;
    ctx.draw_arrays(Primitive::Triangles, 0, count)?;
    ctx.flush();

    log::debug!("drew {count} vertices");
    Ok(transforms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GpuCall, RecordingContext};
    use crate::geometry::{triangle_attributes, upload_and_bind};
    use crate::shader::{ShaderSources, build_program};

    fn assert_close(actual: Mat4, expected: Mat4) {
        let (a, e) = (actual.to_cols_array(), expected.to_cols_array());
        for (i, (a, e)) in a.iter().zip(e.iter()).enumerate() {
            assert!((a - e).abs() < 1e-5, "element {i}: {a} != {e}\n{actual}\n{expected}");
        }
    }

    /// MVP for the standard camera at 1024x768, precomputed.
    fn expected_mvp() -> Mat4 {
        Mat4::from_cols_array_2d(&[
            [0.75, 0.0, 0.0, 0.0],
            [0.0, 0.948_683_3, -0.316_544_3, -0.316_227_77],
            [0.0, -0.316_227_77, -0.949_632_9, -0.948_683_3],
            [0.0, 0.0, 3.065_343, 3.162_277_7],
        ])
    }

    #[test]
    fn all_matrices_start_as_identity() {
        let set = TransformSet::identity();
        assert_eq!(set.model, Mat4::IDENTITY);
        assert_eq!(set.view, Mat4::IDENTITY);
        assert_eq!(set.projection, Mat4::IDENTITY);
        assert_eq!(set.mvp, Mat4::IDENTITY);
    }

    #[test]
    fn mvp_matches_precomputed_matrix() {
        let set = TransformSet::compute(&Camera::default());
        assert_close(set.mvp, expected_mvp());
        assert_close(set.mvp, set.projection * set.view * set.model);
    }

    #[test]
    fn triangle_lands_inside_clip_volume() {
        let set = TransformSet::compute(&Camera::default());
        let [position, _] = triangle_attributes();
        for v in position.data.chunks(3) {
            let clip = set.mvp * glam::Vec4::new(v[0], v[1], v[2], 1.0);
            let ndc = clip / clip.w;
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{ndc}");
            assert!((0.0..=1.0).contains(&ndc.z), "{ndc}");
        }
    }

    #[test]
    fn uploads_mvp_then_draws_and_flushes() {
        let mut ctx = RecordingContext::new();
        let program = build_program(&mut ctx, ShaderSources::TRIANGLE).unwrap();
        let geometry = upload_and_bind(&mut ctx, &program, &triangle_attributes()).unwrap();
        let before = ctx.calls().len();

        compute_and_draw(&mut ctx, &program, &Camera::default(), geometry.vertex_count).unwrap();

        let tail = &ctx.calls()[before..];
        assert_eq!(tail.len(), 3);
        match &tail[0] {
            GpuCall::UniformMatrix4 { name, transpose, value } => {
                assert_eq!(name, MVP_UNIFORM);
                assert!(!transpose);
                assert_close(Mat4::from_cols_array(value), expected_mvp());
            }
            other => panic!("expected the MVP upload first, got {other:?}"),
        }
        assert_eq!(
            tail[1],
            GpuCall::DrawArrays { primitive: Primitive::Triangles, first: 0, count: 3 }
        );
        assert_eq!(tail[2], GpuCall::Flush);
    }

    #[test]
    fn missing_uniform_still_draws() {
        let mut ctx = RecordingContext::new();
        let sources = ShaderSources {
            vertex: "@vertex fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {\n    return vec4<f32>(position, 1.0);\n}\n",
            fragment: "@fragment fn fs_main() -> @location(0) vec4<f32> {\n    return vec4<f32>(1.0);\n}\n",
        };
        let program = build_program(&mut ctx, sources).unwrap();
        let [position, _] = triangle_attributes();
        let geometry = upload_and_bind(&mut ctx, &program, &[position]).unwrap();

        compute_and_draw(&mut ctx, &program, &Camera::default(), geometry.vertex_count).unwrap();

        assert!(!ctx.calls().iter().any(|c| matches!(c, GpuCall::UniformMatrix4 { .. })));
        assert!(ctx.calls().iter().any(|c| matches!(c, GpuCall::DrawArrays { count: 3, .. })));
    }

    #[test]
    fn rejected_draw_skips_flush() {
        let mut ctx = RecordingContext::new();
        let program = build_program(&mut ctx, ShaderSources::TRIANGLE).unwrap();

        let err = compute_and_draw(&mut ctx, &program, &Camera::default(), 3).unwrap_err();
        assert!(matches!(err, RenderError::DrawRejected(_)));
        assert_ne!(ctx.calls().last(), Some(&GpuCall::Flush));
    }
}
