use super::*;

#[test]
fn primitives_are_signed() {
    assert!((sphere(Vec3::new(2.0, 0.0, 0.0), 1.0) - 1.0).abs() < 1e-6);
    assert!(sphere(Vec3::ZERO, 1.0) < 0.0);
    assert!((cuboid(Vec3::new(3.0, 0.0, 0.0), Vec3::ONE) - 2.0).abs() < 1e-6);
    assert!((cuboid(Vec3::ZERO, Vec3::ONE) + 1.0).abs() < 1e-6);
}

#[test]
fn blend_never_exceeds_min() {
    for (a, b) in [(0.3, 0.8), (1.0, 1.0), (-0.2, 0.5)] {
        assert!(blend(a, b, 0.75) <= a.min(b) + 1e-6);
    }
    // Far apart inputs are unaffected.
    assert!((blend(0.0, 10.0, 0.5) - 0.0).abs() < 1e-6);
}

#[test]
fn rotations_preserve_length_and_axis() {
    let p = Vec3::new(1.0, 2.0, 3.0);
    assert!((rot_y(p, 0.7).length() - p.length()).abs() < 1e-5);
    assert_eq!(rot_y(p, 0.7).y, p.y);
    assert_eq!(rot_z(p, 0.7).z, p.z);
    let q = rot_z(Vec3::X, std::f32::consts::FRAC_PI_2);
    assert!((q - Vec3::Y).length() < 1e-6);
}
