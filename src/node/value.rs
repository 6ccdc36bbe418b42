use std::borrow::Cow;

use crate::foundation::core::PixelBuffer;
use crate::foundation::error::{TextureError, TextureResult};

/// Operand of an arithmetic node: a precomputed buffer or a bare scalar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    Scalar(f32),
    Buffer(&'a PixelBuffer),
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Scalar(v)
    }
}

impl<'a> From<&'a PixelBuffer> for Value<'a> {
    fn from(buf: &'a PixelBuffer) -> Self {
        Value::Buffer(buf)
    }
}

impl TryFrom<&serde_json::Value> for Value<'_> {
    type Error = TextureError;

    /// Numbers become scalars; anything else is rejected.
    fn try_from(v: &serde_json::Value) -> TextureResult<Self> {
        match v.as_f64() {
            Some(n) => Ok(Value::Scalar(n as f32)),
            None => Err(TextureError::unsupported_value(format!(
                "expected a number or a buffer, got {}",
                json_kind(v)
            ))),
        }
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Full-resolution `(width, height, 4)` buffer for `value`.
///
/// Buffers pass through untouched (no copy, no resize); scalars are broadcast to every element.
pub fn coerce<'a>(value: Value<'a>, width: u32, height: u32) -> Cow<'a, PixelBuffer> {
    match value {
        Value::Buffer(buf) => Cow::Borrowed(buf),
        Value::Scalar(v) => Cow::Owned(PixelBuffer::filled(width, height, v)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/value.rs"]
mod tests;
