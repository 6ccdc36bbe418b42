//! User-supplied shader fragments.
//!
//! A scene is the body of a WGSL distance function and a shading model is the body of a WGSL
//! BxDF; both are injected verbatim into the raymarch templates. Each fragment may carry a host
//! mirror closure so the host device can evaluate the same scene without a GPU.

use std::sync::Arc;

use glam::Vec3;

use crate::device::program::HostMirror;

pub mod sdf;

/// Far plane of the raymarcher; distance fields start from this value.
pub const FAR: f32 = 100.0;

/// One evaluation of a distance field: signed distance plus surface albedo.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSample {
    pub distance: f32,
    pub color: Vec3,
}

impl SceneSample {
    pub fn new(distance: f32, color: Vec3) -> Self {
        Self { distance, color }
    }
}

/// Inputs of a BxDF evaluation. All direction vectors are normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BxdfInput {
    pub albedo: Vec3,
    pub normal: Vec3,
    /// Surface to light.
    pub light: Vec3,
    /// Surface to camera.
    pub view: Vec3,
}

/// Host distance function: point and `u_time` to a sample.
pub type SceneFn = Arc<dyn Fn(Vec3, f32) -> SceneSample + Send + Sync>;
/// Host BxDF: reflected radiance for a unit light.
pub type BxdfFn = Arc<dyn Fn(&BxdfInput) -> Vec3 + Send + Sync>;

/// Body of `fn dist_field(p: vec3<f32>) -> f32`.
///
/// The fragment returns the signed distance at `p` and may assign `w_color` when
/// `w_need_color` is set. `FAR`, `uni.u_time` and the helpers in [`sdf`] are in scope.
#[derive(Clone)]
pub struct DistanceField {
    source: String,
    host: Option<SceneFn>,
}

impl std::fmt::Debug for DistanceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceField")
            .field("source", &self.source)
            .field("host_mirror", &self.host.is_some())
            .finish()
    }
}

impl DistanceField {
    /// WGSL-only scene. Compiling it on the host device fails.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            host: None,
        }
    }

    pub fn with_host(
        source: impl Into<String>,
        host: impl Fn(Vec3, f32) -> SceneSample + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: source.into(),
            host: Some(Arc::new(host)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn host_mirror(&self) -> Option<HostMirror> {
        self.host.clone().map(HostMirror::Scene)
    }

    /// Two tilted boxes smooth-blended into three spheres, blue fading to red.
    pub fn demo_scene() -> Self {
        Self::with_host(DEMO_SCENE_WGSL, demo_scene_host)
    }

    /// Unit sphere at the origin, white.
    pub fn unit_sphere() -> Self {
        Self::with_host(
            "if (w_need_color) {\n    w_color = vec3<f32>(1.0);\n}\nreturn sphere(p, 1.0);",
            |p, _| SceneSample::new(sdf::sphere(p, 1.0), Vec3::ONE),
        )
    }
}

const DEMO_SCENE_WGSL: &str = r#"
var d = FAR;
var d1 = FAR;
var d2 = FAR;
var c1 = vec3<f32>(1.0);
var c2 = vec3<f32>(1.0);

// boxes
{
    let j1 = rot_y(rot_z(p - vec3<f32>(-2.0, 1.0, 0.0), 0.35), 0.35);
    let j2 = rot_z(p - vec3<f32>(2.0, 1.0, 0.0), -0.35);
    d1 = blend(box(j1, vec3<f32>(1.35)), box(j2, vec3<f32>(1.45)), 0.75);
    if (d1 < d) {
        c1 = vec3<f32>(0.2, 0.2, 1.0);
    }
    d = d1;
}

// spheres
{
    let s1 = sphere(p - vec3<f32>(-2.0, 0.0, 1.5), 2.25);
    let s2 = sphere(p - vec3<f32>(2.0, 0.0, 1.5), 2.25);
    let s3 = sphere(p - vec3<f32>(0.0, 0.0, -1.5), 2.25);
    d2 = min(s3, min(s1, s2));
    if (s1 < d || s2 < d || s3 < d) {
        c2 = vec3<f32>(1.0, 0.2, 0.2);
    }
    d = blend(d1, d2, 0.75);
}

d = blend(d1, d2, 0.85);
var cr = 0.0;
if (abs(d2 - d1) > 1e-6) {
    cr = clamp((d - d1) / (d2 - d1), 0.0, 1.0);
}
if (w_need_color) {
    w_color = mix(c1, c2, cr);
}
return d;
"#;

fn demo_scene_host(p: Vec3, _time: f32) -> SceneSample {
    use sdf::{blend, cuboid, rot_y, rot_z, sphere};

    let mut c1 = Vec3::ONE;
    let mut c2 = Vec3::ONE;

    let j1 = rot_y(rot_z(p - Vec3::new(-2.0, 1.0, 0.0), 0.35), 0.35);
    let j2 = rot_z(p - Vec3::new(2.0, 1.0, 0.0), -0.35);
    let d1 = blend(
        cuboid(j1, Vec3::splat(1.35)),
        cuboid(j2, Vec3::splat(1.45)),
        0.75,
    );
    if d1 < FAR {
        c1 = Vec3::new(0.2, 0.2, 1.0);
    }
    let d = d1;

    let s1 = sphere(p - Vec3::new(-2.0, 0.0, 1.5), 2.25);
    let s2 = sphere(p - Vec3::new(2.0, 0.0, 1.5), 2.25);
    let s3 = sphere(p - Vec3::new(0.0, 0.0, -1.5), 2.25);
    let d2 = s3.min(s1.min(s2));
    if s1 < d || s2 < d || s3 < d {
        c2 = Vec3::new(1.0, 0.2, 0.2);
    }

    let d = blend(d1, d2, 0.85);
    let cr = if (d2 - d1).abs() > 1e-6 {
        ((d - d1) / (d2 - d1)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    SceneSample::new(d, c1.lerp(c2, cr))
}

/// Body of `fn bxdf(albedo: vec3<f32>, n: vec3<f32>, l: vec3<f32>, v: vec3<f32>) -> vec3<f32>`.
#[derive(Clone)]
pub struct Bxdf {
    source: String,
    host: Option<BxdfFn>,
}

impl std::fmt::Debug for Bxdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bxdf")
            .field("source", &self.source)
            .field("host_mirror", &self.host.is_some())
            .finish()
    }
}

impl Bxdf {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            host: None,
        }
    }

    pub fn with_host(
        source: impl Into<String>,
        host: impl Fn(&BxdfInput) -> Vec3 + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: source.into(),
            host: Some(Arc::new(host)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn host_mirror(&self) -> Option<HostMirror> {
        self.host.clone().map(HostMirror::Bxdf)
    }

    /// Ideal diffuse reflection.
    pub fn lambert() -> Self {
        Self::with_host("return albedo * max(dot(n, l), 0.0);", |i| {
            i.albedo * i.normal.dot(i.light).max(0.0)
        })
    }
}

impl Default for Bxdf {
    fn default() -> Self {
        Self::lambert()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/scene.rs"]
mod tests;
