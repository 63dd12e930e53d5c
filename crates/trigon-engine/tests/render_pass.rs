use trigon_engine::device::{GpuCall, Primitive, RecordingSurface};
use trigon_engine::shader::MVP_UNIFORM;
use trigon_engine::{FIXED_SIZE, Surface, SurfaceSize, render, try_render};

fn one_pass() -> Vec<GpuCall> {
    let mut surface = RecordingSurface::new(SurfaceSize::new(1000, 800));
    try_render(&mut surface).expect("pass should succeed on the recording backend");
    assert_eq!(surface.passes().len(), 1);
    surface.passes()[0].clone()
}

fn count(calls: &[GpuCall], pred: impl Fn(&GpuCall) -> bool) -> usize {
    calls.iter().filter(|c| pred(c)).count()
}

#[test]
fn full_pass_issues_expected_calls() {
    let calls = one_pass();

    assert_eq!(count(&calls, |c| matches!(c, GpuCall::LinkProgram { ok: true })), 1);

    let uploads: Vec<usize> = calls
        .iter()
        .filter_map(|c| match c {
            GpuCall::BufferData { data, .. } => Some(data.len()),
            _ => None,
        })
        .collect();
    assert_eq!(uploads, vec![9, 12]);

    assert_eq!(
        count(&calls, |c| matches!(c, GpuCall::UniformMatrix4 { name, .. } if name == MVP_UNIFORM)),
        1
    );

    let draws: Vec<&GpuCall> = calls
        .iter()
        .filter(|c| matches!(c, GpuCall::DrawArrays { .. }))
        .collect();
    assert_eq!(
        draws,
        vec![&GpuCall::DrawArrays { primitive: Primitive::Triangles, first: 0, count: 3 }]
    );

    assert_eq!(calls.last(), Some(&GpuCall::Flush));
}

#[test]
fn pointer_follows_its_own_bind() {
    let calls = one_pass();

    for (i, call) in calls.iter().enumerate() {
        if let GpuCall::AttribPointer { slot, buffer, .. } = call {
            assert_eq!(calls[i - 1], GpuCall::EnableAttrib(*slot));
            assert_eq!(calls[i - 2], GpuCall::BindBuffer(Some(*buffer)));
        }
    }
}

#[test]
fn repeated_passes_are_identical() {
    let mut surface = RecordingSurface::new(SurfaceSize::new(640, 480));
    render(&mut surface);
    render(&mut surface);

    let passes = surface.passes();
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0], passes[1]);
    assert_eq!(surface.size(), FIXED_SIZE);
}
