use std::time::Duration;

use crate::foundation::error::{TextureError, TextureResult};

/// Environment variable selecting the device backend (`host` or `gpu`).
pub const ENV_BACKEND: &str = "TEXTURESHOP_BACKEND";
/// Environment variable bounding each blocking buffer readback, in milliseconds.
pub const ENV_READBACK_TIMEOUT_MS: &str = "TEXTURESHOP_READBACK_TIMEOUT_MS";

/// Available device kinds.
///
/// - `Host` is always available and runs every kernel on the CPU.
/// - `Gpu` requires the `gpu` feature and a usable wgpu adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Host,
    Gpu,
}

impl BackendKind {
    pub fn parse(s: &str) -> TextureResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" | "cpu" => Ok(Self::Host),
            "gpu" | "wgpu" => Ok(Self::Gpu),
            other => Err(TextureError::validation(format!(
                "unknown backend '{other}' (expected 'host' or 'gpu')"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

/// Settings used once, at the top of the program, to create a [`crate::DeviceContext`].
#[derive(Clone, Debug, Default)]
pub struct DeviceSettings {
    pub backend: BackendKind,
    pub power_preference: PowerPreference,
    /// Upper bound for a single blocking readback. `None` waits indefinitely.
    pub readback_timeout: Option<Duration>,
}

impl DeviceSettings {
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_readback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.readback_timeout = timeout;
        self
    }

    /// Defaults overridden by `TEXTURESHOP_BACKEND` and `TEXTURESHOP_READBACK_TIMEOUT_MS`.
    pub fn from_env() -> TextureResult<Self> {
        let mut settings = Self::default();
        if let Ok(v) = std::env::var(ENV_BACKEND) {
            settings.backend = BackendKind::parse(&v)?;
        }
        if let Ok(v) = std::env::var(ENV_READBACK_TIMEOUT_MS) {
            let ms = v.trim().parse::<u64>().map_err(|_| {
                TextureError::validation(format!(
                    "{ENV_READBACK_TIMEOUT_MS} must be an integer number of milliseconds, got '{v}'"
                ))
            })?;
            settings.readback_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        Ok(settings)
    }
}
