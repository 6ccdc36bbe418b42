use super::*;

fn cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: 30,
    }
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "textureshop_{name}_{}_{}.mp4",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn odd_sizes_are_rejected_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(temp_path("odd")));
    let err = sink.begin(cfg(3, 2)).unwrap_err();
    assert!(err.to_string().contains("even"), "{err}");
}

#[test]
fn existing_output_is_kept_without_overwrite() {
    let path = temp_path("no_overwrite");
    std::fs::write(&path, b"keep").unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: path.clone(),
        overwrite: false,
    });
    assert!(matches!(
        sink.begin(cfg(2, 2)),
        Err(TextureError::Validation(_))
    ));
    assert_eq!(std::fs::read(&path).unwrap(), b"keep");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn end_without_begin_fails() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(temp_path("unstarted")));
    assert!(sink.end().is_err());
    let frame = RgbaFrame::new(2, 2, vec![0; 16]).unwrap();
    assert!(sink.push_frame(0, &frame).is_err());
}

#[test]
fn encodes_a_short_clip_when_ffmpeg_is_available() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let path = temp_path("clip");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&path));
    sink.begin(cfg(16, 16)).unwrap();
    for i in 0..3u8 {
        let frame = RgbaFrame::new(16, 16, vec![i * 60; 16 * 16 * 4]).unwrap();
        sink.push_frame(u64::from(i), &frame).unwrap();
    }
    sink.end().unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    std::fs::remove_file(&path).unwrap();
}
