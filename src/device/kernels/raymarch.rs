use glam::Vec3;

use crate::device::uniforms::UniformBlock;
use crate::scene::{BxdfFn, BxdfInput, FAR, SceneFn};

const HIT_EPSILON: f32 = 0.01;
const FOCAL: f32 = 1.5;
const SHADOW_STEPS: usize = 16;
const AMBIENT: f32 = 0.1;
const SKY_LOW: Vec3 = Vec3::new(0.55, 0.65, 0.8);
const SKY_HIGH: Vec3 = Vec3::new(0.2, 0.3, 0.5);

/// Marching limits injected through `%NEAR%` / `%SURFACE%`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MarchLimits {
    pub near: f32,
    pub surface: f32,
}

/// One texel of each G-buffer plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GTexel {
    pub depth: [f32; 4],
    pub color: [f32; 4],
    pub normal: [f32; 4],
    pub shadow: [f32; 4],
}

impl GTexel {
    const MISS: Self = Self {
        depth: [1.0, 1.0, 1.0, 0.0],
        color: [0.0; 4],
        normal: [0.0; 4],
        shadow: [1.0, 1.0, 1.0, 0.0],
    };
}

fn vec3(v: [f32; 4]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Primary ray direction through texel `(x, y)`; row 0 is the bottom of the image.
pub(crate) fn camera_ray(uni: &UniformBlock, x: u32, y: u32) -> Vec3 {
    let res_x = uni.u_width as f32;
    let res_y = uni.u_height as f32;
    let ux = ((x as f32 + 0.5) * 2.0 - res_x) / res_y;
    let uy = ((y as f32 + 0.5) * 2.0 - res_y) / res_y;

    let ro = vec3(uni.u_campos);
    let mut forward = vec3(uni.u_camtarget) - ro;
    if forward.length() < 1e-6 {
        forward = Vec3::Z;
    }
    let forward = forward.normalize();
    let mut right = Vec3::Y.cross(forward);
    if right.length() < 1e-6 {
        right = Vec3::X;
    }
    let right = right.normalize();
    let up = forward.cross(right);
    (forward * FOCAL + right * ux + up * uy).normalize()
}

fn surface_normal(scene: &SceneFn, p: Vec3, time: f32) -> Vec3 {
    let e = 0.001;
    let d = |q: Vec3| scene(q, time).distance;
    let n = Vec3::new(
        d(p + Vec3::X * e) - d(p - Vec3::X * e),
        d(p + Vec3::Y * e) - d(p - Vec3::Y * e),
        d(p + Vec3::Z * e) - d(p - Vec3::Z * e),
    );
    if n.length() < 1e-12 {
        Vec3::Y
    } else {
        n.normalize()
    }
}

fn soft_shadow(scene: &SceneFn, ro: Vec3, rd: Vec3, max_t: f32, time: f32) -> f32 {
    let mut res = 1.0f32;
    let mut t = 0.02f32;
    for _ in 0..SHADOW_STEPS {
        let h = scene(ro + rd * t, time).distance;
        res = res.min(8.0 * h / t);
        t += h.clamp(0.02, 0.5);
        if res < 0.001 || t > max_t {
            break;
        }
    }
    res.clamp(0.0, 1.0)
}

/// G-buffer texel for `(x, y)`.
pub(crate) fn march(
    scene: &SceneFn,
    limits: MarchLimits,
    uni: &UniformBlock,
    x: u32,
    y: u32,
) -> GTexel {
    let time = uni.u_time;
    let ro = vec3(uni.u_campos);
    let rd = camera_ray(uni, x, y);

    let mut t = limits.near;
    let mut d = FAR;
    for _ in 0..uni.u_maxsteps {
        d = scene(ro + rd * t, time).distance;
        if d < limits.surface {
            break;
        }
        t += d;
        if t > FAR {
            break;
        }
    }
    // NaN distances count as a miss.
    if !(t < FAR && d < HIT_EPSILON) {
        return GTexel::MISS;
    }

    let p = ro + rd * t;
    let n = surface_normal(scene, p, time);
    let albedo = scene(p, time).color.clamp(Vec3::ZERO, Vec3::ONE);
    let to_light = vec3(uni.u_lightpos) - p;
    let sh = soft_shadow(
        scene,
        p + n * 0.01,
        to_light.normalize_or_zero(),
        to_light.length(),
        time,
    );

    let z = t / FAR;
    let packed = n * 0.5 + Vec3::splat(0.5);
    GTexel {
        depth: [z, z, z, 1.0],
        color: [albedo.x, albedo.y, albedo.z, 1.0],
        normal: [packed.x, packed.y, packed.z, 1.0],
        shadow: [sh, sh, sh, 1.0],
    }
}

/// Final colour of `(x, y)` from its G-buffer texel.
pub(crate) fn shade(bxdf: &BxdfFn, uni: &UniformBlock, g: &GTexel, x: u32, y: u32) -> [f32; 4] {
    if g.color[3] <= 0.0 {
        let h = (y as f32 + 0.5) / uni.u_height as f32;
        let sky = SKY_LOW.lerp(SKY_HIGH, h);
        return [sky.x, sky.y, sky.z, 1.0];
    }

    let rd = camera_ray(uni, x, y);
    let p = vec3(uni.u_campos) + rd * g.depth[0] * FAR;
    let n = (vec3(g.normal) * 2.0 - Vec3::ONE).normalize_or_zero();
    let l = (vec3(uni.u_lightpos) - p).normalize_or_zero();
    let albedo = vec3(g.color);
    let lit = bxdf(&BxdfInput {
        albedo,
        normal: n,
        light: l,
        view: -rd,
    });
    let s = 1.0 + (g.shadow[0] - 1.0) * uni.u_shadow_intensity;
    let c = (albedo * AMBIENT + lit * s).clamp(Vec3::ZERO, Vec3::ONE);
    [c.x, c.y, c.z, 1.0]
}
