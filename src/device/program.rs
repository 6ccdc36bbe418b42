//! Shader templates and textual macro injection.
//!
//! A template is WGSL text containing `%TOKEN%` placeholders. Two kinds of tokens exist:
//!
//! - selector tokens (`%CALC%`, `%TYPE%`) name one of the functions defined in the template,
//!   picking a code path inside one shared shader;
//! - fragment tokens (`%DIST_FIELD%`, `%BXDF%`, ...) receive user-supplied shader code or literal
//!   constants verbatim. This is an intentional extension point: scenes and shading models are
//!   raw WGSL.
//!
//! Rendering fails when a token is left unfilled, when an injection targets a token the template
//! does not have, or when a selector names a function the template does not define.

use std::collections::BTreeSet;

use crate::device::uniforms::KNOWN_UNIFORMS;
use crate::foundation::error::{TextureError, TextureResult};
use crate::scene::{BxdfFn, SceneFn};

pub const TOKEN_CALC: &str = "%CALC%";
pub const TOKEN_TYPE: &str = "%TYPE%";
pub const TOKEN_DIST_FIELD: &str = "%DIST_FIELD%";
pub const TOKEN_NEAR: &str = "%NEAR%";
pub const TOKEN_SURFACE: &str = "%SURFACE%";
pub const TOKEN_BXDF: &str = "%BXDF%";

const SELECTOR_TOKENS: [&str; 2] = [TOKEN_CALC, TOKEN_TYPE];

const PRELUDE: &str = include_str!("../shaders/prelude.wgsl");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderTemplate {
    /// Unary/binary arithmetic and trigonometry, selected by `%CALC%`.
    Math,
    /// Ternary ops (mix, smoothstep), selected by `%CALC%`.
    Mix,
    FbmNoise,
    /// Ramp kinds, selected by `%TYPE%`.
    Gradient,
    Raymarch,
    DeferredLight,
}

impl ShaderTemplate {
    pub fn name(self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Mix => "mix",
            Self::FbmNoise => "fbm_noise",
            Self::Gradient => "gradient",
            Self::Raymarch => "raymarch",
            Self::DeferredLight => "deferred_light",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Math => include_str!("../shaders/math.wgsl"),
            Self::Mix => include_str!("../shaders/mix.wgsl"),
            Self::FbmNoise => include_str!("../shaders/fbm_noise.wgsl"),
            Self::Gradient => include_str!("../shaders/gradient.wgsl"),
            Self::Raymarch => include_str!("../shaders/raymarch.wgsl"),
            Self::DeferredLight => include_str!("../shaders/deferred_light.wgsl"),
        }
    }

    /// Storage slots `0..n` the template declares.
    pub fn storage_slots(self) -> u32 {
        match self {
            Self::Math => 3,
            Self::Mix => 4,
            Self::FbmNoise | Self::Gradient => 1,
            Self::Raymarch => 4,
            Self::DeferredLight => 5,
        }
    }

    /// Texture units `0..n` the template samples.
    pub fn texture_units(self) -> u32 {
        match self {
            Self::FbmNoise => 1,
            _ => 0,
        }
    }
}

/// Host-side mirror of an injected fragment, used by the host device in place of the WGSL text.
#[derive(Clone)]
pub enum HostMirror {
    Scene(SceneFn),
    Bxdf(BxdfFn),
}

/// A template plus its token injections, ready to compile.
#[derive(Clone)]
pub struct ProgramSource {
    template: ShaderTemplate,
    injections: Vec<(String, String)>,
    host: Option<HostMirror>,
}

impl std::fmt::Debug for ProgramSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramSource")
            .field("template", &self.template)
            .field("injections", &self.injections)
            .field("host_mirror", &self.host.is_some())
            .finish()
    }
}

impl ProgramSource {
    pub fn new(template: ShaderTemplate) -> Self {
        Self {
            template,
            injections: Vec::new(),
            host: None,
        }
    }

    /// Replace every occurrence of `token` with `text`. A later injection of the same token wins.
    pub fn inject(mut self, token: impl Into<String>, text: impl Into<String>) -> Self {
        let token = token.into();
        self.injections.retain(|(t, _)| *t != token);
        self.injections.push((token, text.into()));
        self
    }

    pub fn with_host_mirror(mut self, mirror: HostMirror) -> Self {
        self.host = Some(mirror);
        self
    }

    pub fn template(&self) -> ShaderTemplate {
        self.template
    }

    pub fn injection(&self, token: &str) -> Option<&str> {
        self.injections
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn host_mirror(&self) -> Option<&HostMirror> {
        self.host.as_ref()
    }

    /// The function name chosen by `%CALC%` or `%TYPE%`, if the template has a selector.
    pub fn selector(&self) -> Option<&str> {
        SELECTOR_TOKENS.iter().find_map(|t| self.injection(t))
    }

    /// Full WGSL text: shared prelude followed by the template with every token substituted.
    pub fn render(&self) -> TextureResult<String> {
        let stage = self.template.name();
        let body = self.template.text();
        let tokens = find_tokens(body);

        if let Some((token, _)) = self
            .injections
            .iter()
            .find(|(t, _)| !tokens.contains(t.as_str()))
        {
            return Err(TextureError::configuration(
                stage,
                format!("template has no macro token {token}"),
            ));
        }

        let mut out = body.to_string();
        for token in tokens {
            let value = self.injection(token).ok_or_else(|| {
                TextureError::configuration(stage, format!("missing macro token {token}"))
            })?;
            if SELECTOR_TOKENS.contains(&token) && !body.contains(&format!("fn {value}(")) {
                return Err(TextureError::configuration(
                    stage,
                    format!("unsupported {token} key '{value}'"),
                ));
            }
            out = out.replace(token, value);
        }

        Ok(format!("{PRELUDE}\n{out}"))
    }

    /// Uniforms referenced by the template body or any injected fragment.
    pub fn declared_uniforms(&self) -> Vec<&'static str> {
        let body = self.template.text();
        KNOWN_UNIFORMS
            .iter()
            .copied()
            .filter(|name| {
                body.contains(name) || self.injections.iter().any(|(_, v)| v.contains(name))
            })
            .collect()
    }
}

/// `%UPPER_CASE%` placeholders appearing in `text`.
fn find_tokens(text: &str) -> BTreeSet<&str> {
    let mut out = BTreeSet::new();
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end)
                if end > 0
                    && after[..end]
                        .bytes()
                        .all(|b| b.is_ascii_uppercase() || b == b'_') =>
            {
                out.insert(&rest[start..start + end + 2]);
                rest = &after[end + 1..];
            }
            _ => rest = after,
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/device/program.rs"]
mod tests;
