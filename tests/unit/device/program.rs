use super::*;

#[test]
fn selector_is_substituted_after_prelude() {
    let src = ProgramSource::new(ShaderTemplate::Math).inject(TOKEN_CALC, "_add");
    let wgsl = src.render().unwrap();
    assert!(wgsl.starts_with("// Shared by every template."));
    assert!(wgsl.contains("out0[i] = _add(in1[i], fetch_b(i));"));
    assert!(!wgsl.contains("%CALC%"));
}

#[test]
fn unknown_selector_key_is_a_configuration_error() {
    let err = ProgramSource::new(ShaderTemplate::Math)
        .inject(TOKEN_CALC, "_frobnicate")
        .render()
        .unwrap_err();
    assert!(err.to_string().contains("unsupported %CALC% key '_frobnicate'"), "{err}");
}

#[test]
fn missing_and_foreign_tokens_are_rejected() {
    let err = ProgramSource::new(ShaderTemplate::Gradient).render().unwrap_err();
    assert!(err.to_string().contains("missing macro token %TYPE%"));

    let err = ProgramSource::new(ShaderTemplate::FbmNoise)
        .inject(TOKEN_CALC, "_add")
        .render()
        .unwrap_err();
    assert!(err.to_string().contains("no macro token %CALC%"));
}

#[test]
fn later_injection_replaces_earlier() {
    let src = ProgramSource::new(ShaderTemplate::Mix)
        .inject(TOKEN_CALC, "_mix")
        .inject(TOKEN_CALC, "_smoothstep");
    assert_eq!(src.selector(), Some("_smoothstep"));
}

#[test]
fn fragment_tokens_are_injected_verbatim() {
    let src = ProgramSource::new(ShaderTemplate::Raymarch)
        .inject(TOKEN_DIST_FIELD, "return length(p) - 1.0;")
        .inject(TOKEN_NEAR, "0.001")
        .inject(TOKEN_SURFACE, "0.0001");
    let wgsl = src.render().unwrap();
    assert!(wgsl.contains("return length(p) - 1.0;"));
    assert!(wgsl.contains("const NEAR: f32 = 0.001;"));
}

#[test]
fn declared_uniforms_follow_template_and_fragments() {
    let gradient =
        ProgramSource::new(ShaderTemplate::Gradient).inject(TOKEN_TYPE, "_radial_in_grid");
    let names = gradient.declared_uniforms();
    assert!(names.contains(&"u_width"));
    assert!(!names.contains(&"u_octaves"));

    let fbm = ProgramSource::new(ShaderTemplate::FbmNoise).declared_uniforms();
    assert!(fbm.contains(&"u_octaves"));

    let raymarch = ProgramSource::new(ShaderTemplate::Raymarch).declared_uniforms();
    for name in ["u_campos", "u_camtarget", "u_lightpos", "u_maxsteps", "u_time"] {
        assert!(raymarch.contains(&name), "{name}");
    }
}

#[test]
fn token_scanner_ignores_modulo_and_lowercase() {
    let tokens = find_tokens("a % b; %CALC%(x) %not_a_token% %TYPE%");
    assert_eq!(tokens.into_iter().collect::<Vec<_>>(), vec!["%CALC%", "%TYPE%"]);
}
