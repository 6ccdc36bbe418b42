use std::sync::Arc;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Launch, Node, allocate_output, configured, set_declared, set_size_uniforms};
use crate::device::program::TOKEN_TYPE;
use crate::device::{
    DeviceBuffer, DeviceContext, DeviceProgram, DeviceTexture, ProgramSource, ShaderTemplate,
    TextureDesc, UniformValue,
};
use crate::foundation::core::{CHANNELS, Canvas, Extent, PixelBuffer, TextureData};
use crate::foundation::error::{TextureError, TextureResult};

/// Default octave count of [`FbmNoise`].
pub const DEFAULT_OCTAVES: u32 = 5;

/// `width × height × 4` samples of `U[min, max)`; `min == max` fills with `min`.
fn uniform_noise(rng: &mut impl Rng, width: u32, height: u32, min: f32, max: f32) -> Vec<f32> {
    let n = width as usize * height as usize * CHANNELS;
    if min >= max {
        return vec![min; n];
    }
    let dist = Uniform::new(min, max);
    dist.sample_iter(rng).take(n).collect()
}

/// Host-side uniform noise; no device dispatch.
#[derive(Debug)]
pub struct CpuRandom {
    min: f32,
    max: f32,
    seed: Option<u64>,
    rng: Option<StdRng>,
    canvas: Option<Canvas>,
}

impl Default for CpuRandom {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl CpuRandom {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            seed: None,
            rng: None,
            canvas: None,
        }
    }

    /// Deterministic sequence: the generator is reseeded on every `configure`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn configure(&mut self, extent: &impl Extent) -> TextureResult<&mut Self> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(TextureError::validation(format!(
                "cpu_random needs finite bounds with min <= max, got [{}, {})",
                self.min, self.max
            )));
        }
        if !(self.max - self.min).is_finite() {
            return Err(TextureError::validation(format!(
                "cpu_random range [{}, {}) is wider than f32 can represent",
                self.min, self.max
            )));
        }
        self.canvas = Some(extent.canvas()?.clone());
        self.rng = self.seed.map(StdRng::seed_from_u64);
        Ok(self)
    }
}

impl Extent for CpuRandom {
    fn canvas(&self) -> TextureResult<&Canvas> {
        configured(self.canvas.as_ref(), "cpu_random")
    }
}

impl Node for CpuRandom {
    type Output = PixelBuffer;

    fn name(&self) -> &'static str {
        "cpu_random"
    }

    fn execute(&mut self) -> TextureResult<PixelBuffer> {
        let (width, height) = self.canvas()?.size();
        let data = match self.rng.as_mut() {
            Some(rng) => uniform_noise(rng, width, height, self.min, self.max),
            None => uniform_noise(&mut rand::thread_rng(), width, height, self.min, self.max),
        };
        PixelBuffer::new(width, height, data)
    }
}

/// Seed texture accepted by [`FbmNoise`].
#[derive(Clone, Debug)]
pub enum NoiseTexture {
    /// Already uploaded to the same device.
    Device(Arc<DeviceTexture>),
    /// Host array with 1 to 4 channels, any size.
    Array(TextureData),
    /// Raw little-endian `f32` RGBA texels. The size is required.
    Bytes {
        data: Vec<u8>,
        size: Option<(u32, u32)>,
    },
}

impl NoiseTexture {
    fn upload(self, ctx: &DeviceContext) -> TextureResult<Arc<DeviceTexture>> {
        match self {
            NoiseTexture::Device(tex) => {
                if !tex.context().same_device(ctx) {
                    return Err(TextureError::unsupported_texture(
                        "noise texture belongs to a different device context",
                    ));
                }
                Ok(tex)
            }
            NoiseTexture::Array(data) => {
                let desc = TextureDesc {
                    width: data.width(),
                    height: data.height(),
                };
                Ok(Arc::new(ctx.upload_texture(desc, &data.to_rgba())?))
            }
            NoiseTexture::Bytes { data, size } => {
                let Some((width, height)) = size else {
                    return Err(TextureError::unsupported_texture(
                        "noise texture given as bytes without a size",
                    ));
                };
                if data.len() % std::mem::size_of::<f32>() != 0 {
                    return Err(TextureError::unsupported_texture(format!(
                        "{} bytes is not a whole number of f32 values",
                        data.len()
                    )));
                }
                let texels = TextureData::new(
                    width,
                    height,
                    CHANNELS as u32,
                    bytemuck::pod_collect_to_vec(&data),
                )?;
                let desc = TextureDesc { width, height };
                Ok(Arc::new(ctx.upload_texture(desc, texels.data())?))
            }
        }
    }
}

#[derive(Debug)]
struct FbmState {
    canvas: Canvas,
    program: DeviceProgram,
    output: DeviceBuffer,
}

/// Fractional Brownian motion accumulated from a seed texture over `octaves` octaves.
///
/// Without a seed texture the node synthesizes `U[0, 1)` noise of the canvas size.
#[derive(Debug)]
pub struct FbmNoise {
    octaves: u32,
    seed: Option<u64>,
    texture: Option<Arc<DeviceTexture>>,
    state: Option<FbmState>,
}

impl Default for FbmNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl FbmNoise {
    pub fn new() -> Self {
        Self {
            octaves: DEFAULT_OCTAVES,
            seed: None,
            texture: None,
            state: None,
        }
    }

    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves;
        self
    }

    /// Seed for the synthesized fallback texture.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    /// Replace the cached seed texture.
    pub fn set_noise_texture(
        &mut self,
        ctx: &DeviceContext,
        texture: NoiseTexture,
    ) -> TextureResult<()> {
        self.texture = Some(texture.upload(ctx)?);
        Ok(())
    }

    pub fn configure(
        &mut self,
        extent: &impl Extent,
        texture: Option<NoiseTexture>,
    ) -> TextureResult<&mut Self> {
        let canvas = extent.canvas()?.clone();
        let ctx = canvas.context();

        if let Some(tex) = texture {
            self.set_noise_texture(ctx, tex)?;
        }
        let cached = self
            .texture
            .as_ref()
            .is_some_and(|t| t.context().same_device(ctx));
        if !cached {
            tracing::info!(
                width = canvas.width(),
                height = canvas.height(),
                "noise texture not supplied; synthesizing cpu noise"
            );
            let (w, h) = canvas.size();
            let data = match self.seed {
                Some(seed) => uniform_noise(&mut StdRng::seed_from_u64(seed), w, h, 0.0, 1.0),
                None => uniform_noise(&mut rand::thread_rng(), w, h, 0.0, 1.0),
            };
            let tex = ctx.upload_texture(TextureDesc { width: w, height: h }, &data)?;
            self.texture = Some(Arc::new(tex));
        }

        let program = ctx.compile(&ProgramSource::new(ShaderTemplate::FbmNoise))?;
        let output = allocate_output(&canvas)?;
        let octaves = self.octaves;
        ctx.with(|device| {
            set_size_uniforms(device, program.handle(), &canvas)?;
            set_declared(device, program.handle(), "u_octaves", UniformValue::U32(octaves))
        })?;

        self.state = Some(FbmState {
            canvas,
            program,
            output,
        });
        Ok(self)
    }
}

impl Extent for FbmNoise {
    fn canvas(&self) -> TextureResult<&Canvas> {
        configured(self.state.as_ref().map(|s| &s.canvas), "fbm_noise")
    }
}

impl Node for FbmNoise {
    type Output = PixelBuffer;

    fn name(&self) -> &'static str {
        "fbm_noise"
    }

    fn execute(&mut self) -> TextureResult<PixelBuffer> {
        let (Some(state), Some(texture)) = (self.state.as_ref(), self.texture.as_ref()) else {
            return Err(TextureError::not_configured("fbm_noise"));
        };
        Launch {
            node: "fbm_noise",
            canvas: &state.canvas,
            program: &state.program,
            buffers: vec![(&state.output, 0)],
            textures: vec![(&**texture, 0)],
        }
        .run_and_read(&state.output)
    }
}

/// Ramp shape of a [`Gradient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientKind {
    /// `1 - u`.
    HorizontalLeft,
    /// `u`.
    HorizontalRight,
    /// `1 - v`.
    VerticalUp,
    /// `v`.
    VerticalDown,
    /// `1` at the centre, `0` at distance `0.5` and beyond.
    RadialIn,
    /// `0` at the centre, `1` at distance `0.5` and beyond.
    RadialOut,
}

impl GradientKind {
    pub const ALL: [GradientKind; 6] = [
        GradientKind::HorizontalLeft,
        GradientKind::HorizontalRight,
        GradientKind::VerticalUp,
        GradientKind::VerticalDown,
        GradientKind::RadialIn,
        GradientKind::RadialOut,
    ];

    /// Function selected through the gradient template's `%TYPE%` token.
    pub fn kernel_key(self) -> &'static str {
        match self {
            GradientKind::HorizontalLeft => "_horizontal_left_grid",
            GradientKind::HorizontalRight => "_horizontal_right_grid",
            GradientKind::VerticalUp => "_vertical_up_grid",
            GradientKind::VerticalDown => "_vertical_down_grid",
            GradientKind::RadialIn => "_radial_in_grid",
            GradientKind::RadialOut => "_radial_out_grid",
        }
    }
}

#[derive(Debug)]
struct GradientState {
    canvas: Canvas,
    program: DeviceProgram,
    output: DeviceBuffer,
}

/// Linear or radial ramp in rgb with opaque alpha.
#[derive(Debug)]
pub struct Gradient {
    kind: GradientKind,
    state: Option<GradientState>,
}

impl Gradient {
    pub fn new(kind: GradientKind) -> Self {
        Self { kind, state: None }
    }

    pub fn kind(&self) -> GradientKind {
        self.kind
    }

    pub fn configure(&mut self, extent: &impl Extent) -> TextureResult<&mut Self> {
        let canvas = extent.canvas()?.clone();
        let source =
            ProgramSource::new(ShaderTemplate::Gradient).inject(TOKEN_TYPE, self.kind.kernel_key());
        let program = canvas.context().compile(&source)?;
        let output = allocate_output(&canvas)?;
        canvas
            .context()
            .with(|device| set_size_uniforms(device, program.handle(), &canvas))?;
        self.state = Some(GradientState {
            canvas,
            program,
            output,
        });
        Ok(self)
    }
}

impl Extent for Gradient {
    fn canvas(&self) -> TextureResult<&Canvas> {
        configured(self.state.as_ref().map(|s| &s.canvas), "gradient")
    }
}

impl Node for Gradient {
    type Output = PixelBuffer;

    fn name(&self) -> &'static str {
        "gradient"
    }

    fn execute(&mut self) -> TextureResult<PixelBuffer> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| TextureError::not_configured("gradient"))?;
        Launch {
            node: "gradient",
            canvas: &state.canvas,
            program: &state.program,
            buffers: vec![(&state.output, 0)],
            textures: Vec::new(),
        }
        .run_and_read(&state.output)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/noise.rs"]
mod tests;
