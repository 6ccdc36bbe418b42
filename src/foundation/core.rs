use crate::device::DeviceContext;
use crate::foundation::error::{TextureError, TextureResult};

/// Channels per texel in every node output (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Output resolution plus the device every consuming node runs on.
///
/// Immutable after construction. Cloning is cheap: the device context is shared, not copied.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    ctx: DeviceContext,
}

impl Canvas {
    pub fn new(ctx: &DeviceContext, width: u32, height: u32) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::validation(format!(
                "canvas width/height must be non-zero, got {width}x{height}"
            )));
        }
        pixel_byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            ctx: ctx.clone(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn context(&self) -> &DeviceContext {
        &self.ctx
    }

    /// Byte length of one full-resolution RGBA `f32` buffer on this canvas.
    pub fn buffer_byte_len(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS * std::mem::size_of::<f32>()
    }
}

/// Anything a node can be configured from: a [`Canvas`] or an already configured node.
pub trait Extent {
    /// The canvas this value was built for. Nodes fail with `NotConfigured` before `configure`.
    fn canvas(&self) -> TextureResult<&Canvas>;
}

impl Extent for Canvas {
    fn canvas(&self) -> TextureResult<&Canvas> {
        Ok(self)
    }
}

pub(crate) fn pixel_byte_len(width: u32, height: u32) -> TextureResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS * std::mem::size_of::<f32>()))
        .ok_or_else(|| TextureError::validation(format!("{width}x{height} buffer size overflow")))
}

/// Dense `(width, height, 4)` array of `f32`, row-major: texel `(x, y)` starts at
/// `(y * width + x) * 4`.
///
/// Channel meaning is per node (final colour, packed normals, depth, ...). Every `execute()`
/// produces a fresh buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> TextureResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(TextureError::validation(format!(
                "pixel buffer of {width}x{height} needs {expected} floats, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Every element of every texel set to `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize * CHANNELS],
        }
    }

    pub fn zeros(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Reinterpret raw little-endian `f32` bytes read back from a device buffer.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> TextureResult<Self> {
        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            return Err(TextureError::device(format!(
                "readback of {} bytes is not a whole number of f32 values",
                bytes.len()
            )));
        }
        Self::new(width, height, bytemuck::pod_collect_to_vec(bytes))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `(width, height, 4)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.width as usize, self.height as usize, CHANNELS)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Elementwise map into a new buffer of the same size.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Host-side texture contents with 1 to 4 channels, independent of any canvas size.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<f32>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<f32>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::unsupported_texture(
                "texture width/height must be non-zero",
            ));
        }
        if !(1..=4).contains(&channels) {
            return Err(TextureError::unsupported_texture(format!(
                "textures need 1 to 4 channels, got {channels}"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(TextureError::unsupported_texture(format!(
                "{width}x{height}x{channels} texture needs {expected} floats, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Channel `c` of texel `(x, y)`; coordinates wrap, and channels past the last one repeat it.
    pub fn fetch_wrapped(&self, x: i64, y: i64, c: usize) -> f32 {
        let w = i64::from(self.width);
        let h = i64::from(self.height);
        let xi = x.rem_euclid(w) as usize;
        let yi = y.rem_euclid(h) as usize;
        let ch = c.min(self.channels as usize - 1);
        self.data[(yi * self.width as usize + xi) * self.channels as usize + ch]
    }

    /// Same texels widened to four channels; missing alpha becomes `1.0`.
    pub fn to_rgba(&self) -> Vec<f32> {
        let n = self.width as usize * self.height as usize;
        let ch = self.channels as usize;
        let mut out = Vec::with_capacity(n * CHANNELS);
        for texel in self.data.chunks_exact(ch) {
            for c in 0..CHANNELS {
                let v = match (ch, c) {
                    (_, c) if c < ch => texel[c],
                    (1, 1 | 2) => texel[0],
                    (_, 3) => 1.0,
                    _ => 0.0,
                };
                out.push(v);
            }
        }
        out
    }
}

impl From<&PixelBuffer> for TextureData {
    fn from(buf: &PixelBuffer) -> Self {
        Self {
            width: buf.width,
            height: buf.height,
            channels: CHANNELS as u32,
            data: buf.data.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
