use super::*;

#[test]
fn block_matches_wgsl_layout_size() {
    // 8 scalars + 3 padded vec3s.
    assert_eq!(std::mem::size_of::<UniformBlock>(), 80);
    assert_eq!(UniformBlock::default().as_bytes().len(), 80);
}

#[test]
fn set_writes_typed_fields() {
    let mut block = UniformBlock::default();
    block.set("u_width", UniformValue::U32(64)).unwrap();
    block.set("u_time", UniformValue::F32(0.5)).unwrap();
    block
        .set("u_campos", UniformValue::Vec3([1.0, 2.0, 3.0]))
        .unwrap();
    assert_eq!(block.u_width, 64);
    assert_eq!(block.u_time, 0.5);
    assert_eq!(block.u_campos, [1.0, 2.0, 3.0, 0.0]);
}

#[test]
fn set_rejects_wrong_type_and_unknown_names() {
    let mut block = UniformBlock::default();
    let err = block.set("u_width", UniformValue::F32(1.0)).unwrap_err();
    assert!(matches!(err, TextureError::Configuration { .. }));

    let err = block.set("u_nope", UniformValue::F32(1.0)).unwrap_err();
    assert!(err.to_string().contains("unknown uniform 'u_nope'"));
}
