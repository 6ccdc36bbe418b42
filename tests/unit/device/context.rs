use super::*;

#[test]
fn dispatch_groups_round_up_to_workgroups() {
    assert_eq!(dispatch_groups(1, 1), (1, 1));
    assert_eq!(dispatch_groups(32, 64), (1, 2));
    assert_eq!(dispatch_groups(33, 512), (2, 16));
}

#[test]
fn dropped_resources_are_released_on_next_access() {
    let ctx = DeviceContext::host();
    let buf = ctx.allocate(16, None).unwrap();
    let handle = buf.handle();
    drop(buf);
    assert_eq!(ctx.pending_releases(), 1);

    let err = ctx.with(|d| d.read_buffer(handle)).unwrap_err();
    assert!(err.to_string().contains("unknown buffer"));
    assert_eq!(ctx.pending_releases(), 0);
}

#[test]
fn compile_reports_missing_tokens() {
    let ctx = DeviceContext::host();
    let err = ctx
        .compile(&ProgramSource::new(ShaderTemplate::Math))
        .unwrap_err();
    assert!(matches!(err, TextureError::Configuration { .. }));
}

#[test]
fn gpu_backend_is_created_or_reported_unavailable() {
    let settings = DeviceSettings::default().with_backend(BackendKind::Gpu);
    match DeviceContext::create(&settings) {
        Ok(ctx) => assert_eq!(ctx.kind(), BackendKind::Gpu),
        Err(e) => assert!(matches!(e, TextureError::DeviceUnavailable(_)), "{e}"),
    }
}

#[test]
fn clones_share_one_device() {
    let a = DeviceContext::host();
    let b = a.clone();
    assert!(a.same_device(&b));
    assert!(!a.same_device(&DeviceContext::host()));
}
