//! Raymarch → deferred-light pipeline.
//!
//! [`RaymarchNode`] traces a [`DistanceField`] into four persistent G-buffer planes. It is
//! configured once and executed every frame; camera and light changes are pushed into the
//! compiled program without recompiling or reallocating. [`DeferredLightNode`] reads the planes
//! by reference and shades them with a [`Bxdf`].

use std::sync::Arc;

use glam::Vec3;

use super::{Launch, Node, allocate_output, configured, set_declared, set_size_uniforms};
use crate::device::program::{TOKEN_BXDF, TOKEN_DIST_FIELD, TOKEN_NEAR, TOKEN_SURFACE};
use crate::device::{
    Device, DeviceBuffer, DeviceProgram, ProgramHandle, ProgramSource, ShaderTemplate,
    UniformValue,
};
use crate::foundation::core::{Canvas, Extent, PixelBuffer};
use crate::foundation::error::{TextureError, TextureResult};
use crate::scene::{Bxdf, DistanceField};

pub const DEFAULT_MAX_STEPS: u32 = 32;
/// Start distance of every primary ray.
pub const NEAR: &str = "0.001";
/// Distance under which a ray counts as converged.
pub const SURFACE: &str = "0.0001";
/// `u_time` advance per raymarch `execute()`.
pub const TIME_STEP: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraInfo {
    pub campos: Vec3,
    pub camtarget: Vec3,
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self {
            campos: Vec3::new(0.0, 0.5, -5.0),
            camtarget: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightInfo {
    pub lightpos: Vec3,
    /// How much the shadow plane darkens direct light, in `[0, 1]`.
    pub shadow_intensity: f32,
}

impl Default for LightInfo {
    fn default() -> Self {
        Self {
            lightpos: Vec3::new(2.0, 4.0, 3.0),
            shadow_intensity: 0.35,
        }
    }
}

fn push_camera(
    device: &mut dyn Device,
    program: ProgramHandle,
    camera: &CameraInfo,
) -> TextureResult<()> {
    let campos = UniformValue::Vec3(camera.campos.to_array());
    let camtarget = UniformValue::Vec3(camera.camtarget.to_array());
    set_declared(device, program, "u_campos", campos)?;
    set_declared(device, program, "u_camtarget", camtarget)
}

fn push_light(
    device: &mut dyn Device,
    program: ProgramHandle,
    light: &LightInfo,
) -> TextureResult<()> {
    let lightpos = UniformValue::Vec3(light.lightpos.to_array());
    set_declared(device, program, "u_lightpos", lightpos)?;
    set_declared(
        device,
        program,
        "u_shadow_intensity",
        UniformValue::F32(light.shadow_intensity),
    )
}

/// Depth, albedo, packed normal and shadow planes of one raymarch pass.
///
/// Cloning shares the planes. All four are allocated together with the producing node's size;
/// their contents change with every raymarch `execute()`.
#[derive(Clone, Debug)]
pub struct GBuffer {
    width: u32,
    height: u32,
    pub depth: Arc<DeviceBuffer>,
    pub color: Arc<DeviceBuffer>,
    pub normal: Arc<DeviceBuffer>,
    pub shadow: Arc<DeviceBuffer>,
}

impl GBuffer {
    fn allocate(canvas: &Canvas) -> TextureResult<Self> {
        Ok(Self {
            width: canvas.width(),
            height: canvas.height(),
            depth: Arc::new(allocate_output(canvas)?),
            color: Arc::new(allocate_output(canvas)?),
            normal: Arc::new(allocate_output(canvas)?),
            shadow: Arc::new(allocate_output(canvas)?),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Planes in depth, color, normal, shadow order.
    pub fn planes(&self) -> [&DeviceBuffer; 4] {
        [&*self.depth, &*self.color, &*self.normal, &*self.shadow]
    }

    /// Read one plane back to the host.
    pub fn read(&self, plane: &DeviceBuffer) -> TextureResult<PixelBuffer> {
        let bytes = plane.context().with(|d| d.read_buffer(plane.handle()))?;
        PixelBuffer::from_bytes(self.width, self.height, &bytes)
    }
}

#[derive(Debug)]
struct RaymarchState {
    canvas: Canvas,
    program: DeviceProgram,
    gbuffer: GBuffer,
}

/// Sphere tracer writing a [`GBuffer`].
#[derive(Debug, Default)]
pub struct RaymarchNode {
    time: f32,
    state: Option<RaymarchState>,
}

impl RaymarchNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the raymarch program around `field`, apply camera and light (defaults when
    /// `None`) and allocate the G-buffer.
    pub fn configure(
        &mut self,
        extent: &impl Extent,
        field: &DistanceField,
        light: Option<&LightInfo>,
        camera: Option<&CameraInfo>,
        max_steps: u32,
    ) -> TextureResult<&mut Self> {
        let canvas = extent.canvas()?.clone();
        let mut source = ProgramSource::new(ShaderTemplate::Raymarch)
            .inject(TOKEN_DIST_FIELD, field.source())
            .inject(TOKEN_NEAR, NEAR)
            .inject(TOKEN_SURFACE, SURFACE);
        if let Some(mirror) = field.host_mirror() {
            source = source.with_host_mirror(mirror);
        }

        let program = canvas.context().compile(&source)?;
        let gbuffer = GBuffer::allocate(&canvas)?;
        let camera = camera.copied().unwrap_or_default();
        let light = light.copied().unwrap_or_default();
        canvas.context().with(|device| {
            let h = program.handle();
            set_size_uniforms(device, h, &canvas)?;
            set_declared(device, h, "u_maxsteps", UniformValue::U32(max_steps))?;
            set_declared(device, h, "u_time", UniformValue::F32(0.0))?;
            push_camera(device, h, &camera)?;
            push_light(device, h, &light)
        })?;

        self.time = 0.0;
        self.state = Some(RaymarchState {
            canvas,
            program,
            gbuffer,
        });
        Ok(self)
    }

    fn state(&self) -> TextureResult<&RaymarchState> {
        self.state
            .as_ref()
            .ok_or_else(|| TextureError::not_configured("raymarch"))
    }

    /// Push camera uniforms into the compiled program; `None` restores the default camera.
    pub fn set_camera_info(&mut self, camera: Option<&CameraInfo>) -> TextureResult<()> {
        let state = self.state()?;
        let camera = camera.copied().unwrap_or_default();
        state
            .canvas
            .context()
            .with(|device| push_camera(device, state.program.handle(), &camera))
    }

    /// Push light uniforms into the compiled program; `None` restores the default light.
    pub fn set_light_info(&mut self, light: Option<&LightInfo>) -> TextureResult<()> {
        let state = self.state()?;
        let light = light.copied().unwrap_or_default();
        state
            .canvas
            .context()
            .with(|device| push_light(device, state.program.handle(), &light))
    }

    /// `u_time` of the last traced frame; `0` right after `configure`.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn gbuffer(&self) -> TextureResult<&GBuffer> {
        Ok(&self.state()?.gbuffer)
    }
}

impl Extent for RaymarchNode {
    fn canvas(&self) -> TextureResult<&Canvas> {
        configured(self.state.as_ref().map(|s| &s.canvas), "raymarch")
    }
}

impl Node for RaymarchNode {
    type Output = GBuffer;

    fn name(&self) -> &'static str {
        "raymarch"
    }

    /// Advance `u_time` by [`TIME_STEP`], then trace one frame at the new time.
    #[tracing::instrument(level = "debug", name = "raymarch", skip(self), fields(time = self.time))]
    fn execute(&mut self) -> TextureResult<GBuffer> {
        let time = self.time + TIME_STEP;
        let state = self.state()?;
        let g = &state.gbuffer;
        let launch = Launch {
            node: "raymarch",
            canvas: &state.canvas,
            program: &state.program,
            buffers: vec![(&*g.depth, 0), (&*g.color, 1), (&*g.normal, 2), (&*g.shadow, 3)],
            textures: Vec::new(),
        };
        state.canvas.context().with(|device| {
            set_declared(device, state.program.handle(), "u_time", UniformValue::F32(time))
        })?;
        launch.run()?;
        let gbuffer = g.clone();
        self.time = time;
        Ok(gbuffer)
    }
}

#[derive(Debug)]
struct DeferredState {
    canvas: Canvas,
    program: DeviceProgram,
    output: DeviceBuffer,
    gbuffer: GBuffer,
}

/// Lighting pass over a [`GBuffer`].
#[derive(Debug, Default)]
pub struct DeferredLightNode {
    state: Option<DeferredState>,
}

impl DeferredLightNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the lighting program around `bxdf` and reference `gbuffer`'s planes.
    pub fn configure(
        &mut self,
        extent: &impl Extent,
        bxdf: &Bxdf,
        gbuffer: &GBuffer,
        light: Option<&LightInfo>,
        camera: Option<&CameraInfo>,
    ) -> TextureResult<&mut Self> {
        let canvas = extent.canvas()?.clone();
        check_gbuffer(&canvas, gbuffer)?;

        let mut source =
            ProgramSource::new(ShaderTemplate::DeferredLight).inject(TOKEN_BXDF, bxdf.source());
        if let Some(mirror) = bxdf.host_mirror() {
            source = source.with_host_mirror(mirror);
        }
        let program = canvas.context().compile(&source)?;
        let output = allocate_output(&canvas)?;
        let camera = camera.copied().unwrap_or_default();
        let light = light.copied().unwrap_or_default();
        canvas.context().with(|device| {
            let h = program.handle();
            set_size_uniforms(device, h, &canvas)?;
            push_camera(device, h, &camera)?;
            push_light(device, h, &light)
        })?;

        self.state = Some(DeferredState {
            canvas,
            program,
            output,
            gbuffer: gbuffer.clone(),
        });
        Ok(self)
    }

    fn state(&self) -> TextureResult<&DeferredState> {
        self.state
            .as_ref()
            .ok_or_else(|| TextureError::not_configured("deferred_light"))
    }

    /// Rebind to a (new) G-buffer snapshot without reallocating.
    pub fn set_gbuffer(&mut self, gbuffer: &GBuffer) -> TextureResult<()> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| TextureError::not_configured("deferred_light"))?;
        check_gbuffer(&state.canvas, gbuffer)?;
        state.gbuffer = gbuffer.clone();
        Ok(())
    }

    pub fn set_camera_info(&mut self, camera: Option<&CameraInfo>) -> TextureResult<()> {
        let state = self.state()?;
        let camera = camera.copied().unwrap_or_default();
        state
            .canvas
            .context()
            .with(|device| push_camera(device, state.program.handle(), &camera))
    }

    pub fn set_light_info(&mut self, light: Option<&LightInfo>) -> TextureResult<()> {
        let state = self.state()?;
        let light = light.copied().unwrap_or_default();
        state
            .canvas
            .context()
            .with(|device| push_light(device, state.program.handle(), &light))
    }
}

fn check_gbuffer(canvas: &Canvas, gbuffer: &GBuffer) -> TextureResult<()> {
    if gbuffer.size() != canvas.size() {
        let (w, h) = gbuffer.size();
        return Err(TextureError::validation(format!(
            "deferred_light: gbuffer is {w}x{h}, canvas is {}x{}",
            canvas.width(),
            canvas.height()
        )));
    }
    if !gbuffer.depth.context().same_device(canvas.context()) {
        return Err(TextureError::validation(
            "deferred_light: gbuffer lives on a different device context",
        ));
    }
    Ok(())
}

impl Extent for DeferredLightNode {
    fn canvas(&self) -> TextureResult<&Canvas> {
        configured(self.state.as_ref().map(|s| &s.canvas), "deferred_light")
    }
}

impl Node for DeferredLightNode {
    type Output = PixelBuffer;

    fn name(&self) -> &'static str {
        "deferred_light"
    }

    #[tracing::instrument(level = "debug", name = "deferred_light", skip(self))]
    fn execute(&mut self) -> TextureResult<PixelBuffer> {
        let state = self.state()?;
        let g = &state.gbuffer;
        Launch {
            node: "deferred_light",
            canvas: &state.canvas,
            program: &state.program,
            buffers: vec![
                (&state.output, 0),
                (&*g.depth, 1),
                (&*g.color, 2),
                (&*g.normal, 3),
                (&*g.shadow, 4),
            ],
            textures: Vec::new(),
        }
        .run_and_read(&state.output)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/raymarch.rs"]
mod tests;
