use super::*;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: 30,
    }
}

fn frame(v: u8) -> RgbaFrame {
    RgbaFrame::new(2, 2, vec![v; 16]).unwrap()
}

#[test]
fn in_memory_sink_keeps_frames_in_order() {
    let mut sink = InMemorySink::new();
    with_sink(&mut sink, cfg(), |s| {
        s.push_frame(0, &frame(1))?;
        s.push_frame(1, &frame(2))
    })
    .unwrap();
    assert!(sink.is_finished());
    assert_eq!(sink.config(), Some(&cfg()));
    let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| *i).collect();
    assert_eq!(idx, vec![0, 1]);
}

#[test]
fn out_of_order_frames_are_rejected() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    sink.push_frame(3, &frame(0)).unwrap();
    let err = sink.push_frame(3, &frame(0)).unwrap_err();
    assert!(matches!(err, TextureError::Encode(_)), "{err}");
}

#[test]
fn size_mismatch_is_rejected() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    let wide = RgbaFrame::new(4, 1, vec![0; 16]).unwrap();
    assert!(matches!(
        sink.push_frame(0, &wide),
        Err(TextureError::Validation(_))
    ));
}

#[test]
fn push_before_begin_fails() {
    let mut sink = InMemorySink::new();
    assert!(sink.push_frame(0, &frame(0)).is_err());
}

#[test]
fn sink_is_finalized_when_the_body_fails() {
    let mut sink = InMemorySink::new();
    let err = with_sink(&mut sink, cfg(), |s| {
        s.push_frame(0, &frame(0))?;
        Err::<(), _>(TextureError::device("dispatch failed"))
    })
    .unwrap_err();
    assert!(matches!(err, TextureError::Device(_)));
    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 1);
}

#[test]
fn invalid_config_never_begins() {
    let mut sink = InMemorySink::new();
    let bad = SinkConfig { fps: 0, ..cfg() };
    assert!(with_sink(&mut sink, bad, |_| Ok(())).is_err());
    assert!(sink.config().is_none());
}
