//! Per-frame raymarch → deferred-light animation driver.

use glam::Vec3;

use crate::encode::{FrameSink, RgbaFrame, SinkConfig, with_sink};
use crate::foundation::core::{Extent, PixelBuffer};
use crate::foundation::error::TextureResult;
use crate::node::raymarch::DEFAULT_MAX_STEPS;
use crate::node::{CameraInfo, DeferredLightNode, LightInfo, Node, RaymarchNode};
use crate::scene::{Bxdf, DistanceField};

/// Frame count of the demo orbit.
pub const DEMO_FRAMES: u64 = 120;
pub const DEMO_FPS: u32 = 30;

/// Camera of frame `idx` of the demo orbit: radius 7 at height 5 around `(0, 1, 0)`.
pub fn demo_orbit(idx: u64) -> CameraInfo {
    let t = idx as f32 * 0.052;
    CameraInfo {
        campos: Vec3::new(t.cos() * 7.0, 5.0, t.sin() * 7.0),
        camtarget: Vec3::new(0.0, 1.0, 0.0),
    }
}

/// Light of the demo orbit: low, in front of the scene, almost no shadow darkening.
pub fn demo_light() -> LightInfo {
    LightInfo {
        lightpos: Vec3::new(-2.0, 3.0, -5.0),
        shadow_intensity: 0.000001,
    }
}

/// A [`RaymarchNode`] feeding a [`DeferredLightNode`], configured once and executed per frame.
///
/// Camera and light changes go to both nodes so the lighting pass reconstructs positions with the
/// same camera that traced the G-buffer.
#[derive(Debug)]
pub struct RaymarchPipeline {
    raymarch: RaymarchNode,
    light: DeferredLightNode,
}

impl RaymarchPipeline {
    pub fn new(
        extent: &impl Extent,
        field: &DistanceField,
        bxdf: &Bxdf,
        light: Option<&LightInfo>,
        camera: Option<&CameraInfo>,
    ) -> TextureResult<Self> {
        Self::with_max_steps(extent, field, bxdf, light, camera, DEFAULT_MAX_STEPS)
    }

    pub fn with_max_steps(
        extent: &impl Extent,
        field: &DistanceField,
        bxdf: &Bxdf,
        light: Option<&LightInfo>,
        camera: Option<&CameraInfo>,
        max_steps: u32,
    ) -> TextureResult<Self> {
        let mut raymarch = RaymarchNode::new();
        raymarch.configure(extent, field, light, camera, max_steps)?;
        let mut deferred = DeferredLightNode::new();
        deferred.configure(&raymarch, bxdf, raymarch.gbuffer()?, light, camera)?;
        Ok(Self {
            raymarch,
            light: deferred,
        })
    }

    pub fn set_camera(&mut self, camera: &CameraInfo) -> TextureResult<()> {
        self.raymarch.set_camera_info(Some(camera))?;
        self.light.set_camera_info(Some(camera))
    }

    pub fn set_light(&mut self, light: &LightInfo) -> TextureResult<()> {
        self.raymarch.set_light_info(Some(light))?;
        self.light.set_light_info(Some(light))
    }

    pub fn raymarch(&self) -> &RaymarchNode {
        &self.raymarch
    }

    /// Trace and shade one frame.
    pub fn render_frame(&mut self) -> TextureResult<PixelBuffer> {
        let gbuffer = self.raymarch.execute()?;
        self.light.set_gbuffer(&gbuffer)?;
        self.light.execute()
    }

    /// Render `frames` frames into `sink`, calling `update` before each one.
    ///
    /// The sink is finalized even when a frame fails. Returns the number of frames pushed.
    #[tracing::instrument(level = "info", skip(self, sink, update))]
    pub fn render_to_sink<S>(
        &mut self,
        sink: &mut S,
        frames: u64,
        fps: u32,
        mut update: impl FnMut(u64, &mut Self) -> TextureResult<()>,
    ) -> TextureResult<u64>
    where
        S: FrameSink + ?Sized,
    {
        let (width, height) = self.raymarch.canvas()?.size();
        let cfg = SinkConfig {
            width,
            height,
            fps,
        };
        with_sink(sink, cfg, |sink| {
            for idx in 0..frames {
                update(idx, self)?;
                let pixels = self.render_frame()?;
                sink.push_frame(idx, &RgbaFrame::from_pixels(&pixels))?;
                tracing::debug!(frame = idx, "frame rendered");
            }
            Ok(frames)
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
