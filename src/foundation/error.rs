pub type TextureResult<T> = Result<T, TextureError>;

/// Errors surfaced by nodes, devices and sinks.
///
/// None of these are retried internally; a failed configure or dispatch aborts the caller's
/// evaluation.
#[derive(thiserror::Error, Debug)]
pub enum TextureError {
    #[error("unsupported value type: {0}")]
    UnsupportedValueType(String),

    #[error("unsupported texture type: {0}")]
    UnsupportedTextureType(String),

    #[error("configuration error in {stage}: {message}")]
    Configuration { stage: String, message: String },

    #[error("node '{node}' executed before configure()")]
    NotConfigured { node: &'static str },

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TextureError {
    pub fn unsupported_value(msg: impl Into<String>) -> Self {
        Self::UnsupportedValueType(msg.into())
    }

    pub fn unsupported_texture(msg: impl Into<String>) -> Self {
        Self::UnsupportedTextureType(msg.into())
    }

    pub fn configuration(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Configuration {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    pub fn not_configured(node: &'static str) -> Self {
        Self::NotConfigured { node }
    }

    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
