use super::*;
use crate::device::DeviceContext;
use proptest::prelude::*;

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas::new(&DeviceContext::host(), w, h).unwrap()
}

fn run(op: Op, canvas: &Canvas, inputs: &[Value<'_>]) -> PixelBuffer {
    OpNode::new(op).configure(canvas, inputs).unwrap().execute().unwrap()
}

fn assert_all_close(buf: &PixelBuffer, expected: f32) {
    for &v in buf.data() {
        assert!((v - expected).abs() < 1e-5, "{v} != {expected}");
    }
}

#[test]
fn scalar_add() {
    let c = canvas(1, 1);
    let out = run(Op::Add, &c, &[Value::Scalar(0.1), Value::Scalar(0.2)]);
    assert_all_close(&out, 0.3);
}

#[test]
fn divide_buffers() {
    let c = canvas(3, 2);
    let a = PixelBuffer::filled(3, 2, 0.6);
    let b = PixelBuffer::filled(3, 2, 0.2);
    let out = run(Op::Divide, &c, &[Value::from(&a), Value::from(&b)]);
    assert_eq!(out.shape(), (3, 2, 4));
    assert_all_close(&out, 3.0);
}

#[test]
fn clamp_defaults_to_unit_range() {
    let c = canvas(2, 2);
    assert_all_close(&run(Op::Clamp, &c, &[Value::Scalar(1.2)]), 1.0);
    assert_all_close(&run(Op::Clamp, &c, &[Value::Scalar(-0.5)]), 0.0);
}

#[test]
fn clamp_honours_explicit_bounds() {
    let c = canvas(1, 1);
    let out = OpNode::clamp(-2.0, 0.5)
        .configure(&c, &[Value::Scalar(7.0)])
        .unwrap()
        .execute()
        .unwrap();
    assert_all_close(&out, 0.5);
}

#[test]
fn trig_and_log_family() {
    let c = canvas(1, 1);
    let x = 222.0f32;
    assert_all_close(&run(Op::Sin, &c, &[Value::Scalar(x)]), x.sin());
    assert_all_close(&run(Op::Cos, &c, &[Value::Scalar(x)]), x.cos());
    assert_all_close(&run(Op::TanH, &c, &[Value::Scalar(0.3)]), 0.3f32.tanh());
    assert_all_close(&run(Op::Log2, &c, &[Value::Scalar(8.0)]), 3.0);
    assert_all_close(
        &run(Op::Atan2, &c, &[Value::Scalar(1.0), Value::Scalar(-1.0)]),
        1.0f32.atan2(-1.0),
    );
}

#[test]
fn mix_and_smoothstep() {
    let c = canvas(1, 1);
    let mix = run(
        Op::Mix,
        &c,
        &[Value::Scalar(2.0), Value::Scalar(4.0), Value::Scalar(0.25)],
    );
    assert_all_close(&mix, 2.5);
    let step = run(
        Op::Smoothstep,
        &c,
        &[Value::Scalar(0.0), Value::Scalar(1.0), Value::Scalar(0.5)],
    );
    assert_all_close(&step, 0.5);
}

#[test]
fn wrong_input_count_is_rejected() {
    let c = canvas(1, 1);
    let err = OpNode::new(Op::Add)
        .configure(&c, &[Value::Scalar(1.0)])
        .unwrap_err();
    assert!(matches!(err, TextureError::Validation(_)), "{err}");
}

#[test]
fn mismatched_buffer_size_is_rejected() {
    let c = canvas(4, 4);
    let a = PixelBuffer::filled(2, 2, 1.0);
    let err = OpNode::new(Op::Sin).configure(&c, &[Value::from(&a)]).unwrap_err();
    assert!(err.to_string().contains("2x2"), "{err}");
}

#[test]
fn execute_before_configure_fails() {
    let err = OpNode::new(Op::Cos).execute().unwrap_err();
    assert!(matches!(err, TextureError::NotConfigured { .. }), "{err}");
}

#[test]
fn names_round_trip_and_serde_matches() {
    for op in Op::ALL {
        assert_eq!(Op::from_name(op.name()), Some(op));
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, format!("\"{}\"", op.name()));
    }
    assert_eq!(Op::from_name("modulo"), None);
}

fn texels(range: std::ops::Range<f32>) -> impl Strategy<Value = PixelBuffer> {
    proptest::collection::vec(range, 2 * 2 * 4)
        .prop_map(|data| PixelBuffer::new(2, 2, data).unwrap())
}

fn assert_matches(out: &PixelBuffer, expected: impl Fn(usize) -> f32, rel: f32) {
    for (i, &v) in out.data().iter().enumerate() {
        let e = expected(i);
        assert!((v - e).abs() <= rel * (1.0 + e.abs()), "[{i}] {v} != {e}");
    }
}

#[test]
fn smoothstep_saturates_past_both_edges() {
    let c = canvas(1, 1);
    let step = |x: f32| {
        run(
            Op::Smoothstep,
            &c,
            &[Value::Scalar(0.2), Value::Scalar(0.8), Value::Scalar(x)],
        )
    };
    assert_all_close(&step(0.1), 0.0);
    assert_all_close(&step(0.8), 1.0);
    assert_all_close(&step(5.0), 1.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn add_matches_host_for_buffer_operands(
        a in texels(-100.0..100.0),
        b in texels(-100.0..100.0),
    ) {
        let c = canvas(2, 2);
        let sum = run(Op::Add, &c, &[Value::from(&a), Value::from(&b)]);
        assert_matches(&sum, |i| a.data()[i] + b.data()[i], 1e-6);

        let shifted = run(Op::Add, &c, &[Value::from(&a), Value::Scalar(0.5)]);
        assert_matches(&shifted, |i| a.data()[i] + 0.5, 1e-6);
    }

    #[test]
    fn inverse_trig_matches_host_including_negatives(x in -1.0f32..=1.0) {
        let c = canvas(1, 1);
        assert_matches(&run(Op::Asin, &c, &[Value::Scalar(x)]), |_| x.asin(), 1e-4);
        assert_matches(&run(Op::Acos, &c, &[Value::Scalar(x)]), |_| x.acos(), 1e-4);
    }

    #[test]
    fn hyperbolic_power_and_log_match_host(
        x in -5.0f32..5.0,
        base in 0.01f32..10.0,
        exp in -3.0f32..3.0,
        pos in 0.001f32..1000.0,
    ) {
        let c = canvas(1, 1);
        assert_matches(&run(Op::SinH, &c, &[Value::Scalar(x)]), |_| x.sinh(), 1e-4);
        assert_matches(&run(Op::CosH, &c, &[Value::Scalar(x)]), |_| x.cosh(), 1e-4);
        assert_matches(
            &run(Op::Power, &c, &[Value::Scalar(base), Value::Scalar(exp)]),
            |_| base.powf(exp),
            1e-4,
        );
        assert_matches(&run(Op::Log, &c, &[Value::Scalar(pos)]), |_| pos.ln(), 1e-4);
    }

    #[test]
    fn mix_endpoints_select_each_buffer(a in texels(-10.0..10.0), b in texels(-10.0..10.0)) {
        let c = canvas(2, 2);
        let mix = |t: f32| run(Op::Mix, &c, &[Value::from(&a), Value::from(&b), Value::Scalar(t)]);
        let at_zero = mix(0.0);
        prop_assert_eq!(&at_zero, &a);
        let at_one = mix(1.0);
        prop_assert_eq!(&at_one, &b);
    }

    #[test]
    fn smoothstep_matches_hermite_reference(
        edge0 in -10.0f32..0.0,
        edge1 in 0.1f32..10.0,
        x in -20.0f32..20.0,
    ) {
        let c = canvas(1, 1);
        let out = run(
            Op::Smoothstep,
            &c,
            &[Value::Scalar(edge0), Value::Scalar(edge1), Value::Scalar(x)],
        );
        let t = ((f64::from(x) - f64::from(edge0)) / (f64::from(edge1) - f64::from(edge0)))
            .clamp(0.0, 1.0);
        let expected = t * t * (3.0 - 2.0 * t);
        for &v in out.data() {
            prop_assert!((f64::from(v) - expected).abs() < 1e-5, "{} != {}", v, expected);
        }
    }

    #[test]
    fn one_minus_is_an_involution(x in -100.0f32..100.0) {
        let c = canvas(1, 1);
        let once = run(Op::OneMinus, &c, &[Value::Scalar(x)]);
        let twice = run(Op::OneMinus, &c, &[Value::from(&once)]);
        for &v in twice.data() {
            prop_assert!((v - x).abs() < 1e-4);
        }
    }

    #[test]
    fn multiply_matches_host_arithmetic(a in -50.0f32..50.0, b in -50.0f32..50.0) {
        let c = canvas(2, 1);
        let out = run(Op::Multiply, &c, &[Value::Scalar(a), Value::Scalar(b)]);
        for &v in out.data() {
            prop_assert!((v - a * b).abs() <= 1e-3 * (1.0 + (a * b).abs()));
        }
    }
}
