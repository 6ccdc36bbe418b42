use super::*;

#[test]
fn demo_scene_has_surface_between_camera_and_origin() {
    let scene = DistanceField::demo_scene();
    let Some(HostMirror::Scene(f)) = scene.host_mirror() else {
        panic!("demo scene must carry a host mirror");
    };
    // Default camera sits outside every primitive; the origin lies inside the spheres.
    assert!(f(Vec3::new(0.0, 0.5, -5.0), 0.0).distance > 0.0);
    assert!(f(Vec3::ZERO, 0.0).distance < 0.0);
}

#[test]
fn demo_scene_colors_stay_in_unit_range() {
    let Some(HostMirror::Scene(f)) = DistanceField::demo_scene().host_mirror() else {
        panic!("missing host mirror");
    };
    for p in [Vec3::new(-2.0, 1.0, 0.0), Vec3::new(2.0, 0.0, 1.5), Vec3::new(0.0, 3.0, 0.0)] {
        let c = f(p, 0.0).color;
        assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0, "{c}");
    }
}

#[test]
fn raw_fragments_have_no_host_mirror() {
    assert!(DistanceField::new("return 1.0;").host_mirror().is_none());
    assert!(Bxdf::new("return albedo;").host_mirror().is_none());
}

#[test]
fn lambert_follows_cosine_law() {
    let Some(HostMirror::Bxdf(f)) = Bxdf::lambert().host_mirror() else {
        panic!("missing host mirror");
    };
    let input = BxdfInput {
        albedo: Vec3::ONE,
        normal: Vec3::Y,
        light: Vec3::new(0.0, 0.5f32.sqrt(), 0.5f32.sqrt()),
        view: Vec3::Y,
    };
    assert!((f(&input).x - 0.5f32.sqrt()).abs() < 1e-6);
    let behind = BxdfInput {
        light: -Vec3::Y,
        ..input
    };
    assert_eq!(f(&behind), Vec3::ZERO);
}
