use super::*;

const ADD: &str = r#"{
    "width": 2,
    "height": 2,
    "steps": [
        { "id": "a", "node": "constant", "value": 0.1 },
        { "id": "sum", "node": "op", "op": "add", "inputs": ["@a", 0.2] },
        { "id": "clamped", "node": "op", "op": "clamp", "inputs": ["@sum"], "min": 0.0, "max": 0.25 }
    ],
    "output": "sum"
}"#;

#[test]
fn steps_run_in_order_with_references() {
    let script = GraphScript::from_json(ADD).unwrap();
    let results = script.run(&DeviceContext::host()).unwrap();
    assert_eq!(results.order(), ["a", "sum", "clamped"]);
    let sum = results.output().unwrap();
    assert!(sum.data().iter().all(|v| (v - 0.3).abs() < 1e-6));
    let clamped = results.get("clamped").unwrap();
    assert!(clamped.data().iter().all(|&v| v == 0.25));
}

#[test]
fn output_defaults_to_last_step() {
    let json = r#"{ "width": 1, "height": 1, "steps": [
        { "id": "g", "node": "gradient", "kind": "radial_out" },
        { "id": "n", "node": "cpu_random", "min": 0.2, "max": 0.4, "seed": 9 }
    ]}"#;
    let script = GraphScript::from_json(json).unwrap();
    assert_eq!(script.def().output_id(), Some("n"));
    let out = script.run(&DeviceContext::host()).unwrap();
    let n = out.output().unwrap();
    assert!(n.min_value() >= 0.2 && n.max_value() < 0.4);
}

#[test]
fn overflowing_random_range_is_a_validation_error() {
    let json = r#"{ "width": 1, "height": 1, "steps": [
        { "id": "n", "node": "cpu_random", "min": -3.4e38, "max": 3.4e38 }
    ]}"#;
    let err = GraphScript::from_json(json)
        .unwrap()
        .run(&DeviceContext::host())
        .unwrap_err();
    assert!(matches!(err, TextureError::Validation(_)), "{err}");
}

#[test]
fn huge_octave_counts_still_produce_unit_range_noise() {
    let json = r#"{ "width": 8, "height": 8, "steps": [
        { "id": "f", "node": "fbm_noise", "octaves": 300, "seed": 2 }
    ]}"#;
    let out = GraphScript::from_json(json)
        .unwrap()
        .run(&DeviceContext::host())
        .unwrap();
    let f = out.output().unwrap();
    assert!(f.data().iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn string_operands_are_unsupported_values() {
    let json = r#"{ "width": 1, "height": 1, "steps": [
        { "id": "bad", "node": "op", "op": "sin", "inputs": ["0.5"] }
    ]}"#;
    let err = GraphScript::from_json(json)
        .unwrap()
        .run(&DeviceContext::host())
        .unwrap_err();
    assert!(matches!(err, TextureError::UnsupportedValueType(_)), "{err}");
    assert!(err.to_string().contains("step 'bad'"), "{err}");
}

#[test]
fn forward_references_are_rejected_at_load() {
    let json = r#"{ "width": 1, "height": 1, "steps": [
        { "id": "x", "node": "op", "op": "cos", "inputs": ["@y"] },
        { "id": "y", "node": "constant", "value": 1.0 }
    ]}"#;
    let err = GraphScript::from_json(json).unwrap_err();
    assert!(err.to_string().contains("not an earlier step"), "{err}");
}

#[test]
fn duplicate_ids_and_unknown_output_are_rejected() {
    let dup = r#"{ "width": 1, "height": 1, "steps": [
        { "id": "x", "node": "constant", "value": 1.0 },
        { "id": "x", "node": "constant", "value": 2.0 }
    ]}"#;
    assert!(GraphScript::from_json(dup).is_err());
    let missing = r#"{ "width": 1, "height": 1, "output": "nope", "steps": [
        { "id": "x", "node": "constant", "value": 1.0 }
    ]}"#;
    assert!(GraphScript::from_json(missing).is_err());
}

#[test]
fn fbm_can_be_seeded_from_an_earlier_step() {
    let json = r#"{ "width": 4, "height": 4, "steps": [
        { "id": "flat", "node": "constant", "value": 0.6 },
        { "id": "fbm", "node": "fbm_noise", "octaves": 2, "texture": "flat" }
    ]}"#;
    let out = GraphScript::from_json(json)
        .unwrap()
        .run(&DeviceContext::host())
        .unwrap();
    let fbm = out.output().unwrap();
    assert!(fbm.data().iter().all(|v| (v - 0.6).abs() < 1e-5));
}

#[test]
fn raymarch_step_renders_a_shaded_frame() {
    let json = r#"{ "width": 6, "height": 4, "steps": [
        { "id": "r", "node": "raymarch", "scene": "unit_sphere", "max_steps": 48,
          "camera": { "campos": [0.0, 0.0, -4.0], "camtarget": [0.0, 0.0, 0.0] } }
    ]}"#;
    let out = GraphScript::from_json(json)
        .unwrap()
        .run(&DeviceContext::host())
        .unwrap();
    let img = out.output().unwrap();
    assert_eq!(img.shape(), (6, 4, 4));
    assert!(img.min_value() >= 0.0 && img.max_value() <= 1.0);
}

#[test]
fn malformed_json_is_a_validation_error() {
    assert!(matches!(
        GraphScript::from_json("{ \"width\": 1 }"),
        Err(TextureError::Validation(_))
    ));
    assert!(matches!(
        GraphScript::from_json(r#"{ "width": 1, "height": 1, "steps": [] }"#),
        Err(TextureError::Validation(_))
    ));
}
