use super::*;
use crate::device::DeviceContext;

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas::new(&DeviceContext::host(), w, h).unwrap()
}

fn planes(g: &GBuffer) -> [PixelBuffer; 4] {
    g.planes().map(|p| g.read(p).unwrap())
}

#[test]
fn unit_sphere_fills_the_centre_and_misses_the_corner() {
    let c = canvas(16, 16);
    let mut node = RaymarchNode::new();
    node.configure(&c, &DistanceField::unit_sphere(), None, None, 64)
        .unwrap();
    let g = node.execute().unwrap();
    let [depth, color, normal, shadow] = planes(&g);

    let centre = depth.texel(8, 8);
    assert_eq!(centre[3], 1.0);
    // Camera at z = -5 looking at a unit sphere: hit at t ~= 4.
    assert!((centre[0] * 100.0 - 4.0).abs() < 0.2, "{centre:?}");
    assert_eq!(color.texel(8, 8)[3], 1.0);
    assert!(normal.texel(8, 8)[2] < 0.5);

    assert_eq!(depth.texel(0, 0), [1.0, 1.0, 1.0, 0.0]);
    assert_eq!(color.texel(0, 0), [0.0; 4]);
    assert_eq!(shadow.texel(0, 0), [1.0, 1.0, 1.0, 0.0]);
}

/// Unit sphere whose host mirror records every `u_time` it is evaluated at.
fn timed_sphere() -> (DistanceField, Arc<std::sync::Mutex<Vec<f32>>>) {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let field = DistanceField::with_host("return sphere(p, 1.0 + 0.0 * uni.u_time);", move |p, t| {
        log.lock().unwrap().push(t);
        crate::scene::SceneSample::new(crate::scene::sdf::sphere(p, 1.0), Vec3::ONE)
    });
    (field, seen)
}

fn traced_times(seen: &std::sync::Mutex<Vec<f32>>) -> Vec<f32> {
    let mut times = std::mem::take(&mut *seen.lock().unwrap());
    times.dedup();
    times
}

#[test]
fn execute_advances_time_before_tracing() {
    let c = canvas(2, 2);
    let (field, seen) = timed_sphere();
    let mut node = RaymarchNode::new();
    node.configure(&c, &field, None, None, DEFAULT_MAX_STEPS).unwrap();
    assert_eq!(node.time(), 0.0);

    node.execute().unwrap();
    assert_eq!(traced_times(&seen), [TIME_STEP]);
    node.execute().unwrap();
    assert_eq!(traced_times(&seen), [2.0 * TIME_STEP]);
    assert!((node.time() - 2.0 * TIME_STEP).abs() < 1e-6);
}

#[test]
fn reconfigure_resets_time() {
    let c = canvas(2, 2);
    let (field, seen) = timed_sphere();
    let mut node = RaymarchNode::new();
    node.configure(&c, &field, None, None, DEFAULT_MAX_STEPS).unwrap();
    node.execute().unwrap();
    node.execute().unwrap();

    node.configure(&c, &field, None, None, DEFAULT_MAX_STEPS).unwrap();
    assert_eq!(node.time(), 0.0);
    seen.lock().unwrap().clear();
    node.execute().unwrap();
    assert_eq!(traced_times(&seen), [TIME_STEP]);
}

#[test]
fn failed_execute_leaves_time_alone() {
    let mut node = RaymarchNode::new();
    assert!(node.execute().is_err());
    assert_eq!(node.time(), 0.0);
}

#[test]
fn gbuffer_planes_are_reused_between_frames() {
    let c = canvas(4, 4);
    let mut node = RaymarchNode::new();
    node.configure(&c, &DistanceField::demo_scene(), None, None, DEFAULT_MAX_STEPS)
        .unwrap();
    let a = node.execute().unwrap();
    let b = node.execute().unwrap();
    assert!(Arc::ptr_eq(&a.depth, &b.depth));
    assert!(Arc::ptr_eq(&a.shadow, &b.shadow));
}

#[test]
fn camera_updates_change_the_image() {
    let c = canvas(8, 8);
    let mut node = RaymarchNode::new();
    node.configure(&c, &DistanceField::unit_sphere(), None, None, 64)
        .unwrap();
    let g = node.execute().unwrap();
    let before = g.read(&g.depth).unwrap();

    node.set_camera_info(Some(&CameraInfo {
        campos: Vec3::new(0.0, 0.0, -50.0),
        camtarget: Vec3::ZERO,
    }))
    .unwrap();
    let g = node.execute().unwrap();
    let after = g.read(&g.depth).unwrap();
    assert_ne!(before, after);
}

#[test]
fn deferred_light_shades_hits_and_paints_sky() {
    let c = canvas(16, 16);
    let mut march = RaymarchNode::new();
    march
        .configure(&c, &DistanceField::unit_sphere(), None, None, 64)
        .unwrap();
    let g = march.execute().unwrap();

    let mut light = DeferredLightNode::new();
    let out = light
        .configure(&march, &Bxdf::lambert(), &g, None, None)
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(out.shape(), (16, 16, 4));
    assert!(out.min_value() >= 0.0 && out.max_value() <= 1.0);
    assert!(out.data().chunks_exact(4).all(|t| t[3] == 1.0));

    // Sky gradient darkens from row 0 (bottom) upward.
    let bottom = out.texel(0, 0);
    let top = out.texel(0, 15);
    assert!(bottom[2] > top[2]);
    assert!((bottom[0] - (0.55 + (0.2 - 0.55) * (0.5 / 16.0))).abs() < 1e-5);
}

#[test]
fn full_shadow_intensity_darkens_shadowed_texels() {
    let c = canvas(8, 8);
    let mut march = RaymarchNode::new();
    march
        .configure(&c, &DistanceField::demo_scene(), None, None, DEFAULT_MAX_STEPS)
        .unwrap();
    let g = march.execute().unwrap();

    let none = LightInfo {
        shadow_intensity: 0.0,
        ..LightInfo::default()
    };
    let full = LightInfo {
        shadow_intensity: 1.0,
        ..LightInfo::default()
    };
    let mut node = DeferredLightNode::new();
    node.configure(&c, &Bxdf::lambert(), &g, Some(&none), None).unwrap();
    let lit = node.execute().unwrap();
    node.set_light_info(Some(&full)).unwrap();
    let shadowed = node.execute().unwrap();
    for (a, b) in lit.data().iter().zip(shadowed.data()) {
        assert!(b <= a);
    }
}

#[test]
fn gbuffer_must_match_the_canvas() {
    let ctx = DeviceContext::host();
    let small = Canvas::new(&ctx, 4, 4).unwrap();
    let large = Canvas::new(&ctx, 8, 8).unwrap();
    let mut march = RaymarchNode::new();
    march
        .configure(&small, &DistanceField::unit_sphere(), None, None, 8)
        .unwrap();
    let g = march.gbuffer().unwrap().clone();

    let err = DeferredLightNode::new()
        .configure(&large, &Bxdf::lambert(), &g, None, None)
        .unwrap_err();
    assert!(matches!(err, TextureError::Validation(_)), "{err}");

    let mut node = DeferredLightNode::new();
    node.configure(&small, &Bxdf::lambert(), &g, None, None).unwrap();
    let mut other = RaymarchNode::new();
    other
        .configure(&large, &DistanceField::unit_sphere(), None, None, 8)
        .unwrap();
    assert!(node.set_gbuffer(other.gbuffer().unwrap()).is_err());
}

#[test]
fn wgsl_only_scene_needs_a_gpu() {
    let c = canvas(2, 2);
    let field = DistanceField::new("return sphere(p, 1.0);");
    let err = RaymarchNode::new()
        .configure(&c, &field, None, None, 8)
        .unwrap_err();
    assert!(err.to_string().contains("host mirror"), "{err}");
}

#[test]
fn unconfigured_pipeline_nodes_fail() {
    let mut march = RaymarchNode::new();
    assert!(matches!(
        march.execute(),
        Err(TextureError::NotConfigured { node: "raymarch" })
    ));
    assert!(march.set_camera_info(None).is_err());
    assert!(march.gbuffer().is_err());
    assert!(matches!(
        DeferredLightNode::new().execute(),
        Err(TextureError::NotConfigured { node: "deferred_light" })
    ));
}
