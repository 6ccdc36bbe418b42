use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        TextureError::unsupported_value("x")
            .to_string()
            .contains("unsupported value type:")
    );
    assert!(
        TextureError::unsupported_texture("x")
            .to_string()
            .contains("unsupported texture type:")
    );
    assert!(
        TextureError::device_unavailable("x")
            .to_string()
            .contains("device unavailable:")
    );
    assert!(
        TextureError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn configuration_names_the_failing_stage() {
    let err = TextureError::configuration("raymarch", "missing token %NEAR%");
    let msg = err.to_string();
    assert!(msg.contains("raymarch"));
    assert!(msg.contains("%NEAR%"));
}

#[test]
fn not_configured_names_the_node() {
    let err = TextureError::not_configured("deferred_light");
    assert!(err.to_string().contains("deferred_light"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TextureError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
