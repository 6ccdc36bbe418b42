use crate::foundation::error::{TextureError, TextureResult};

/// Every uniform a template may declare. Programs only receive the ones they reference.
pub const KNOWN_UNIFORMS: [&str; 11] = [
    "u_width",
    "u_height",
    "u_octaves",
    "u_maxsteps",
    "u_time",
    "u_clamp_min_value",
    "u_clamp_max_value",
    "u_shadow_intensity",
    "u_campos",
    "u_camtarget",
    "u_lightpos",
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    U32(u32),
    F32(f32),
    Vec3([f32; 3]),
}

/// Uniform block shared by all templates, laid out exactly like `struct Uniforms` in the WGSL
/// prelude (vec3 values padded to vec4).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub u_width: u32,
    pub u_height: u32,
    pub u_octaves: u32,
    pub u_maxsteps: u32,
    pub u_time: f32,
    pub u_clamp_min_value: f32,
    pub u_clamp_max_value: f32,
    pub u_shadow_intensity: f32,
    pub u_campos: [f32; 4],
    pub u_camtarget: [f32; 4],
    pub u_lightpos: [f32; 4],
}

impl UniformBlock {
    pub fn set(&mut self, name: &str, value: UniformValue) -> TextureResult<()> {
        use UniformValue::*;

        match (name, value) {
            ("u_width", U32(v)) => self.u_width = v,
            ("u_height", U32(v)) => self.u_height = v,
            ("u_octaves", U32(v)) => self.u_octaves = v,
            ("u_maxsteps", U32(v)) => self.u_maxsteps = v,
            ("u_time", F32(v)) => self.u_time = v,
            ("u_clamp_min_value", F32(v)) => self.u_clamp_min_value = v,
            ("u_clamp_max_value", F32(v)) => self.u_clamp_max_value = v,
            ("u_shadow_intensity", F32(v)) => self.u_shadow_intensity = v,
            ("u_campos", Vec3(v)) => self.u_campos = pad(v),
            ("u_camtarget", Vec3(v)) => self.u_camtarget = pad(v),
            ("u_lightpos", Vec3(v)) => self.u_lightpos = pad(v),
            (name, value) if KNOWN_UNIFORMS.contains(&name) => {
                return Err(TextureError::configuration(
                    "uniforms",
                    format!("uniform '{name}' cannot take {value:?}"),
                ));
            }
            (name, _) => {
                return Err(TextureError::configuration(
                    "uniforms",
                    format!("unknown uniform '{name}'"),
                ));
            }
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

fn pad(v: [f32; 3]) -> [f32; 4] {
    [v[0], v[1], v[2], 0.0]
}

#[cfg(test)]
#[path = "../../tests/unit/device/uniforms.rs"]
mod tests;
