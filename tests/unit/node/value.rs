use super::*;
use proptest::prelude::*;

#[test]
fn buffers_pass_through_without_copy() {
    let buf = PixelBuffer::filled(3, 2, 0.5);
    let out = coerce(Value::from(&buf), 3, 2);
    assert!(matches!(out, Cow::Borrowed(_)));
    assert!(std::ptr::eq(out.as_ref(), &buf));
}

#[test]
fn json_numbers_become_scalars() {
    let v = Value::try_from(&serde_json::json!(0.25)).unwrap();
    assert_eq!(v, Value::Scalar(0.25));
    let v = Value::try_from(&serde_json::json!(3)).unwrap();
    assert_eq!(v, Value::Scalar(3.0));
}

#[test]
fn json_non_numbers_are_unsupported() {
    for bad in [
        serde_json::json!("0.5"),
        serde_json::json!([0.1, 0.2]),
        serde_json::json!(null),
        serde_json::json!({"a": 1}),
    ] {
        let err = Value::try_from(&bad).unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedValueType(_)), "{err}");
    }
}

proptest! {
    #[test]
    fn scalars_broadcast_to_every_element(v in -1.0e6f32..1.0e6, w in 1u32..9, h in 1u32..9) {
        let out = coerce(Value::Scalar(v), w, h);
        prop_assert_eq!(out.shape(), (w as usize, h as usize, 4));
        prop_assert!(out.data().iter().all(|&x| x == v));
    }
}
