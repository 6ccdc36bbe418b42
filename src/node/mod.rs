//! Nodes: configured units of device work producing one result per `execute()`.
//!
//! Every node follows the same two-step contract:
//!
//! - an inherent `configure(extent, ...)` copies the size of its predecessor (a [`Canvas`] or a
//!   configured node), compiles its program, coerces inputs and allocates device buffers. It
//!   returns `&mut Self` for chaining and may be called again; the previous allocations are
//!   released.
//! - [`Node::execute`] binds buffers to their fixed slots (output `0`, inputs `1..N`), dispatches
//!   `ceil(W / 32) × ceil(H / 32)` groups and reads the result back. Calling it before
//!   `configure` fails with `NotConfigured`.

use crate::device::{
    Device, DeviceBuffer, DeviceProgram, DeviceTexture, ProgramHandle, UniformValue,
    dispatch_groups,
};
use crate::foundation::core::{Canvas, PixelBuffer};
use crate::foundation::error::{TextureError, TextureResult};

pub mod constant;
pub mod noise;
pub mod op;
pub mod raymarch;
pub mod value;

pub use constant::Constant;
pub use noise::{CpuRandom, FbmNoise, Gradient, GradientKind, NoiseTexture};
pub use op::{Op, OpNode};
pub use raymarch::{CameraInfo, DeferredLightNode, GBuffer, LightInfo, RaymarchNode};
pub use value::{Value, coerce};

pub trait Node {
    type Output;

    /// Stable node name used in errors and logs.
    fn name(&self) -> &'static str;

    fn execute(&mut self) -> TextureResult<Self::Output>;
}

/// Set `name` only when the compiled program declares it.
pub(crate) fn set_declared(
    device: &mut dyn Device,
    program: ProgramHandle,
    name: &str,
    value: UniformValue,
) -> TextureResult<()> {
    if device.has_uniform(program, name) {
        device.set_uniform(program, name, value)?;
    }
    Ok(())
}

/// Set `u_width` / `u_height` from the canvas.
pub(crate) fn set_size_uniforms(
    device: &mut dyn Device,
    program: ProgramHandle,
    canvas: &Canvas,
) -> TextureResult<()> {
    set_declared(device, program, "u_width", UniformValue::U32(canvas.width()))?;
    set_declared(device, program, "u_height", UniformValue::U32(canvas.height()))
}

/// Buffers and textures bound for one dispatch.
pub(crate) struct Launch<'a> {
    pub node: &'static str,
    pub canvas: &'a Canvas,
    pub program: &'a DeviceProgram,
    pub buffers: Vec<(&'a DeviceBuffer, u32)>,
    pub textures: Vec<(&'a DeviceTexture, u32)>,
}

impl Launch<'_> {
    fn bind_and_dispatch(&self, device: &mut dyn Device) -> TextureResult<()> {
        for (buffer, slot) in &self.buffers {
            device.bind_buffer(buffer.handle(), *slot)?;
        }
        for (texture, unit) in &self.textures {
            device.bind_texture(texture.handle(), *unit)?;
        }
        let (gx, gy) = dispatch_groups(self.canvas.width(), self.canvas.height());
        tracing::debug!(node = self.node, gx, gy, "dispatch");
        device.dispatch(self.program.handle(), gx, gy)
    }

    /// Bind, dispatch and leave the results on the device.
    pub fn run(&self) -> TextureResult<()> {
        self.canvas
            .context()
            .with(|device| self.bind_and_dispatch(device))
    }

    /// Bind, dispatch and read `output` back, atomically with respect to other nodes.
    pub fn run_and_read(&self, output: &DeviceBuffer) -> TextureResult<PixelBuffer> {
        let bytes = self.canvas.context().with(|device| {
            self.bind_and_dispatch(device)?;
            device.read_buffer(output.handle())
        })?;
        PixelBuffer::from_bytes(self.canvas.width(), self.canvas.height(), &bytes)
    }
}

/// Upload `buf` into a new device buffer on the canvas's device.
pub(crate) fn upload(canvas: &Canvas, buf: &PixelBuffer) -> TextureResult<DeviceBuffer> {
    canvas
        .context()
        .allocate(canvas.buffer_byte_len(), Some(buf.as_bytes()))
}

/// Zero-initialized full-resolution buffer on the canvas's device.
pub(crate) fn allocate_output(canvas: &Canvas) -> TextureResult<DeviceBuffer> {
    canvas.context().allocate(canvas.buffer_byte_len(), None)
}

/// The canvas of a configured node, or `NotConfigured`.
pub(crate) fn configured<'a>(
    canvas: Option<&'a Canvas>,
    node: &'static str,
) -> TextureResult<&'a Canvas> {
    canvas.ok_or_else(|| TextureError::not_configured(node))
}
