use super::frame::RgbaFrame;
use crate::foundation::error::{TextureError, TextureResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl SinkConfig {
    pub fn validate(&self) -> TextureResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TextureError::validation("sink width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(TextureError::validation("sink fps must be non-zero"));
        }
        Ok(())
    }
}

/// Consumer of rendered frames.
///
/// `push_frame` is called with strictly increasing indices between one `begin` and one `end`.
pub trait FrameSink {
    fn begin(&mut self, cfg: SinkConfig) -> TextureResult<()>;
    fn push_frame(&mut self, idx: u64, frame: &RgbaFrame) -> TextureResult<()>;
    fn end(&mut self) -> TextureResult<()>;
}

/// Run `body` between `begin` and `end`, calling `end` even when `body` fails.
///
/// The first error wins; a failing `end` after a failing `body` is logged.
pub fn with_sink<S, R>(
    sink: &mut S,
    cfg: SinkConfig,
    body: impl FnOnce(&mut S) -> TextureResult<R>,
) -> TextureResult<R>
where
    S: FrameSink + ?Sized,
{
    cfg.validate()?;
    sink.begin(cfg)?;
    match body(sink) {
        Ok(r) => {
            sink.end()?;
            Ok(r)
        }
        Err(e) => {
            if let Err(end_err) = sink.end() {
                tracing::warn!(error = %end_err, "sink failed to finalize after an earlier error");
            }
            Err(e)
        }
    }
}

/// Keeps frames in memory; for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, RgbaFrame)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(u64, RgbaFrame)] {
        &self.frames
    }

    /// Whether `end` ran after the last `begin`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> TextureResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &RgbaFrame) -> TextureResult<()> {
        check_frame(self.cfg.as_ref(), self.frames.last().map(|(i, _)| *i), idx, frame)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> TextureResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Shared `push_frame` checks: sink started, index increasing, size matching.
pub(crate) fn check_frame(
    cfg: Option<&SinkConfig>,
    last: Option<u64>,
    idx: u64,
    frame: &RgbaFrame,
) -> TextureResult<()> {
    let cfg = cfg.ok_or_else(|| TextureError::encode("sink not started"))?;
    if last.is_some_and(|last| idx <= last) {
        return Err(TextureError::encode(format!(
            "sink received out-of-order frame index {idx}"
        )));
    }
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(TextureError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
