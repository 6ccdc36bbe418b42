use std::path::{Path, PathBuf};

use anyhow::Context as _;

use super::ensure_parent_dir;
use super::frame::RgbaFrame;
use super::sink::{FrameSink, SinkConfig, check_frame};
use crate::foundation::core::PixelBuffer;
use crate::foundation::error::TextureResult;

/// Write `frame` as an 8-bit RGBA PNG, creating parent directories.
pub fn write_png(path: &Path, frame: &RgbaFrame) -> TextureResult<()> {
    ensure_parent_dir(path)?;
    image::save_buffer_with_format(
        path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// Serialize a node result (see [`RgbaFrame::from_pixels`]) and write it as a PNG.
pub fn save_pixels(path: &Path, buf: &PixelBuffer) -> TextureResult<()> {
    write_png(path, &RgbaFrame::from_pixels(buf))
}

/// One numbered PNG per frame: `<dir>/<prefix>_00000.png`, `<prefix>_00001.png`, ...
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    prefix: String,
    cfg: Option<SinkConfig>,
    last_idx: Option<u64>,
    written: Vec<PathBuf>,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            cfg: None,
            last_idx: None,
            written: Vec::new(),
        }
    }

    pub fn frame_path(&self, idx: u64) -> PathBuf {
        self.dir.join(format!("{}_{idx:05}.png", self.prefix))
    }

    /// Files written since the last `begin`.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> TextureResult<()> {
        cfg.validate()?;
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create output directory '{}'", self.dir.display())
        })?;
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.written.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &RgbaFrame) -> TextureResult<()> {
        check_frame(self.cfg.as_ref(), self.last_idx, idx, frame)?;
        self.last_idx = Some(idx);
        let path = self.frame_path(idx);
        write_png(&path, frame)?;
        tracing::debug!(path = %path.display(), "frame written");
        self.written.push(path);
        Ok(())
    }

    fn end(&mut self) -> TextureResult<()> {
        self.cfg = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/png.rs"]
mod tests;
