//! Host counterparts of the distance helpers available to injected WGSL fragments (`sphere`,
//! `box`, `blend`, `rot_y`, `rot_z`). Host mirrors of a scene are written with these so both
//! devices trace the same surface.

use glam::Vec3;

pub fn sphere(p: Vec3, r: f32) -> f32 {
    p.length() - r
}

/// `box` in WGSL.
pub fn cuboid(p: Vec3, half_extent: Vec3) -> f32 {
    let q = p.abs() - half_extent;
    q.max(Vec3::ZERO).length() + q.x.max(q.y.max(q.z)).min(0.0)
}

/// Polynomial smooth minimum with blend radius `k`.
pub fn blend(a: f32, b: f32, k: f32) -> f32 {
    let h = (0.5 + 0.5 * (b - a) / k).clamp(0.0, 1.0);
    b + (a - b) * h - k * h * (1.0 - h)
}

pub fn rot_y(p: Vec3, a: f32) -> Vec3 {
    let (s, c) = a.sin_cos();
    Vec3::new(c * p.x + s * p.z, p.y, -s * p.x + c * p.z)
}

pub fn rot_z(p: Vec3, a: f32) -> Vec3 {
    let (s, c) = a.sin_cos();
    Vec3::new(c * p.x - s * p.y, s * p.x + c * p.y, p.z)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/sdf.rs"]
mod tests;
