use super::{Node, configured};
use crate::foundation::core::{Canvas, Extent, PixelBuffer};
use crate::foundation::error::TextureResult;

/// Host-side constant: every element of the output equals `value`.
#[derive(Clone, Debug, Default)]
pub struct Constant {
    value: f32,
    canvas: Option<Canvas>,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            canvas: None,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Adopt the size of `extent`; `value` replaces the current constant when given.
    pub fn configure(
        &mut self,
        extent: &impl Extent,
        value: Option<f32>,
    ) -> TextureResult<&mut Self> {
        self.canvas = Some(extent.canvas()?.clone());
        if let Some(v) = value {
            self.value = v;
        }
        Ok(self)
    }
}

impl Extent for Constant {
    fn canvas(&self) -> TextureResult<&Canvas> {
        configured(self.canvas.as_ref(), "constant")
    }
}

impl Node for Constant {
    type Output = PixelBuffer;

    fn name(&self) -> &'static str {
        "constant"
    }

    fn execute(&mut self) -> TextureResult<PixelBuffer> {
        let canvas = self.canvas()?;
        Ok(PixelBuffer::filled(canvas.width(), canvas.height(), self.value))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/constant.rs"]
mod tests;
