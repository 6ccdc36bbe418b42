use crate::foundation::core::{CHANNELS, PixelBuffer};
use crate::foundation::error::{TextureError, TextureResult};

/// Straight-alpha RGBA8 image with row 0 at the top, as image files and encoders expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> TextureResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(TextureError::validation(format!(
                "rgba8 frame of {width}x{height} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Serialize a node result: rows flipped, each element clamped to `[0, 1]`, scaled by 255
    /// and truncated.
    pub fn from_pixels(buf: &PixelBuffer) -> Self {
        Self {
            width: buf.width(),
            height: buf.height(),
            data: to_rgba8(buf, true),
        }
    }
}

/// 8-bit bytes of `buf`, optionally with the row order reversed.
pub fn to_rgba8(buf: &PixelBuffer, flip_vertical: bool) -> Vec<u8> {
    let row_len = buf.width() as usize * CHANNELS;
    let mut out = Vec::with_capacity(buf.data().len());
    let mut push_row = |row: &[f32]| {
        out.extend(row.iter().map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8));
    };
    if flip_vertical {
        buf.data().chunks_exact(row_len).rev().for_each(&mut push_row);
    } else {
        buf.data().chunks_exact(row_len).for_each(&mut push_row);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/encode/frame.rs"]
mod tests;
