//! Output sinks.
//!
//! Nodes hand off `f32` buffers in `[0, 1]` with row 0 at the bottom. Sinks own the conversion to
//! 8-bit RGBA (see [`RgbaFrame::from_pixels`]) and the file formats.

/// `ffmpeg`-based MP4 sink.
pub mod ffmpeg;
/// 8-bit frame serialization.
pub mod frame;
/// PNG stills and PNG sequences.
pub mod png;
/// Frame sink contract and the in-memory sink.
pub mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use frame::RgbaFrame;
pub use png::{PngSequenceSink, write_png};
pub use sink::{FrameSink, InMemorySink, SinkConfig, with_sink};

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &std::path::Path) -> crate::foundation::error::TextureResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
