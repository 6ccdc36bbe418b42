use std::collections::{BTreeMap, HashMap};

use super::kernels::field::{GradientFn, fbm, gradient_kernel, texel_uv};
use super::kernels::math::{MathFn, MixFn, math_kernel, mix_kernel};
use super::kernels::raymarch::{GTexel, MarchLimits, march, shade};
use super::program::{HostMirror, TOKEN_NEAR, TOKEN_SURFACE};
use super::{
    BufferHandle, Device, MAX_STORAGE_SLOTS, ProgramHandle, ProgramSource, ShaderTemplate,
    TextureDesc, TextureHandle, UniformBlock, UniformValue, WORKGROUP_SIZE,
};
use crate::foundation::config::BackendKind;
use crate::foundation::core::{CHANNELS, TextureData};
use crate::foundation::error::{TextureError, TextureResult};
use crate::scene::{BxdfFn, SceneFn};

#[derive(Clone)]
enum Kernel {
    Math(MathFn),
    Mix(MixFn),
    Fbm,
    Gradient(GradientFn),
    Raymarch(SceneFn, MarchLimits),
    Deferred(BxdfFn),
}

struct HostProgram {
    template: ShaderTemplate,
    kernel: Kernel,
    declared: Vec<&'static str>,
    uniforms: UniformBlock,
}

/// Reference device evaluating every template on the CPU.
///
/// Follows the GPU contract exactly: templates are rendered (so token errors surface the same
/// way), storage slots form one binding table, each program has its own uniform block, and a
/// dispatch only touches texels inside both the launched grid and `u_width × u_height`.
/// Reads past the end of a bound buffer yield `0.0` and writes past it are dropped.
#[derive(Default)]
pub struct HostDevice {
    next_id: u64,
    programs: HashMap<u64, HostProgram>,
    buffers: HashMap<u64, Vec<f32>>,
    textures: HashMap<u64, TextureData>,
    slots: BTreeMap<u32, BufferHandle>,
    units: BTreeMap<u32, TextureHandle>,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn kernel_for(source: &ProgramSource) -> TextureResult<Kernel> {
        let template = source.template();
        let stage = template.name();
        let selector = || {
            source.selector().ok_or_else(|| {
                TextureError::configuration(stage, "template selector was not injected")
            })
        };
        let unsupported =
            |key: &str| TextureError::configuration(stage, format!("no host kernel for '{key}'"));

        Ok(match template {
            ShaderTemplate::Math => {
                let key = selector()?;
                Kernel::Math(math_kernel(key).ok_or_else(|| unsupported(key))?)
            }
            ShaderTemplate::Mix => {
                let key = selector()?;
                Kernel::Mix(mix_kernel(key).ok_or_else(|| unsupported(key))?)
            }
            ShaderTemplate::Gradient => {
                let key = selector()?;
                Kernel::Gradient(gradient_kernel(key).ok_or_else(|| unsupported(key))?)
            }
            ShaderTemplate::FbmNoise => Kernel::Fbm,
            ShaderTemplate::Raymarch => {
                let Some(HostMirror::Scene(scene)) = source.host_mirror() else {
                    return Err(TextureError::configuration(
                        stage,
                        "distance field has no host mirror; \
                         the host device cannot evaluate raw WGSL",
                    ));
                };
                let limits = MarchLimits {
                    near: parse_constant(source, TOKEN_NEAR)?,
                    surface: parse_constant(source, TOKEN_SURFACE)?,
                };
                Kernel::Raymarch(scene.clone(), limits)
            }
            ShaderTemplate::DeferredLight => {
                let Some(HostMirror::Bxdf(bxdf)) = source.host_mirror() else {
                    return Err(TextureError::configuration(
                        stage,
                        "bxdf has no host mirror; the host device cannot evaluate raw WGSL",
                    ));
                };
                Kernel::Deferred(bxdf.clone())
            }
        })
    }

    fn program(&self, program: ProgramHandle) -> TextureResult<&HostProgram> {
        self.programs
            .get(&program.0)
            .ok_or_else(|| TextureError::device(format!("unknown program {program:?}")))
    }

    /// Contents of the buffer bound at `slot`; unbound slots read as empty.
    fn input(&self, slot: u32) -> &[f32] {
        self.slots
            .get(&slot)
            .and_then(|h| self.buffers.get(&h.0))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Detach the buffer bound at `slot` so it can be written while inputs are borrowed.
    fn take_output(&mut self, slot: u32, stage: &str) -> TextureResult<(u64, Vec<f32>)> {
        let handle = *self.slots.get(&slot).ok_or_else(|| {
            TextureError::device(format!("{stage}: storage slot {slot} is unbound"))
        })?;
        let data = self.buffers.remove(&handle.0).ok_or_else(|| {
            TextureError::device(format!("{stage}: slot {slot} points at a released buffer"))
        })?;
        Ok((handle.0, data))
    }

    fn texture(&self, unit: u32, stage: &str) -> TextureResult<&TextureData> {
        self.units
            .get(&unit)
            .and_then(|h| self.textures.get(&h.0))
            .ok_or_else(|| TextureError::device(format!("{stage}: texture unit {unit} is unbound")))
    }
}

fn parse_constant(source: &ProgramSource, token: &str) -> TextureResult<f32> {
    let stage = source.template().name();
    let text = source
        .injection(token)
        .ok_or_else(|| TextureError::configuration(stage, format!("missing macro token {token}")))?;
    text.trim().parse().map_err(|_| {
        TextureError::configuration(stage, format!("{token} must be a float literal, got '{text}'"))
    })
}

fn fetch(buf: &[f32], texel: usize) -> [f32; 4] {
    let i = texel * CHANNELS;
    match buf.get(i..i + CHANNELS) {
        Some(v) => [v[0], v[1], v[2], v[3]],
        None => [0.0; 4],
    }
}

fn store(buf: &mut [f32], texel: usize, value: [f32; 4]) {
    let i = texel * CHANNELS;
    if let Some(dst) = buf.get_mut(i..i + CHANNELS) {
        dst.copy_from_slice(&value);
    }
}

impl Device for HostDevice {
    fn kind(&self) -> BackendKind {
        BackendKind::Host
    }

    fn compile_program(&mut self, source: &ProgramSource) -> TextureResult<ProgramHandle> {
        source.render()?;
        let kernel = Self::kernel_for(source)?;
        let id = self.next_id();
        self.programs.insert(
            id,
            HostProgram {
                template: source.template(),
                kernel,
                declared: source.declared_uniforms(),
                uniforms: UniformBlock::default(),
            },
        );
        Ok(ProgramHandle(id))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
    }

    fn has_uniform(&self, program: ProgramHandle, name: &str) -> bool {
        self.programs
            .get(&program.0)
            .is_some_and(|p| p.declared.iter().any(|d| *d == name))
    }

    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        name: &str,
        value: UniformValue,
    ) -> TextureResult<()> {
        let prog = self
            .programs
            .get_mut(&program.0)
            .ok_or_else(|| TextureError::device(format!("unknown program {program:?}")))?;
        prog.uniforms.set(name, value)
    }

    fn allocate_buffer(
        &mut self,
        byte_len: usize,
        initial: Option<&[u8]>,
    ) -> TextureResult<BufferHandle> {
        if byte_len % std::mem::size_of::<f32>() != 0 {
            return Err(TextureError::validation(format!(
                "storage buffers hold f32 values; {byte_len} bytes is not a multiple of 4"
            )));
        }
        let data = match initial {
            Some(bytes) if bytes.len() != byte_len => {
                return Err(TextureError::validation(format!(
                    "initial contents are {} bytes, buffer is {byte_len}",
                    bytes.len()
                )));
            }
            Some(bytes) => bytemuck::pod_collect_to_vec(bytes),
            None => vec![0.0; byte_len / std::mem::size_of::<f32>()],
        };
        let id = self.next_id();
        self.buffers.insert(id, data);
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, bytes: &[u8]) -> TextureResult<()> {
        let data = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| TextureError::device(format!("unknown buffer {buffer:?}")))?;
        if bytes.len() != data.len() * std::mem::size_of::<f32>() {
            return Err(TextureError::validation(format!(
                "write of {} bytes into a {}-byte buffer",
                bytes.len(),
                data.len() * std::mem::size_of::<f32>()
            )));
        }
        *data = bytemuck::pod_collect_to_vec(bytes);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
        self.slots.retain(|_, h| *h != buffer);
    }

    fn bind_buffer(&mut self, buffer: BufferHandle, slot: u32) -> TextureResult<()> {
        if slot >= MAX_STORAGE_SLOTS {
            return Err(TextureError::device(format!(
                "storage slot {slot} out of range (max {})",
                MAX_STORAGE_SLOTS - 1
            )));
        }
        if !self.buffers.contains_key(&buffer.0) {
            return Err(TextureError::device(format!("unknown buffer {buffer:?}")));
        }
        self.slots.insert(slot, buffer);
        Ok(())
    }

    fn create_texture(&mut self, desc: TextureDesc, rgba: &[f32]) -> TextureResult<TextureHandle> {
        let tex = TextureData::new(desc.width, desc.height, CHANNELS as u32, rgba.to_vec())?;
        let id = self.next_id();
        self.textures.insert(id, tex);
        Ok(TextureHandle(id))
    }

    fn bind_texture(&mut self, texture: TextureHandle, unit: u32) -> TextureResult<()> {
        if !self.textures.contains_key(&texture.0) {
            return Err(TextureError::device(format!("unknown texture {texture:?}")));
        }
        self.units.insert(unit, texture);
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
        self.units.retain(|_, h| *h != texture);
    }

    fn dispatch(
        &mut self,
        program: ProgramHandle,
        groups_x: u32,
        groups_y: u32,
    ) -> TextureResult<()> {
        let prog = self.program(program)?;
        let stage = prog.template.name();
        let uni = prog.uniforms;
        let kernel = prog.kernel.clone();
        let width = uni.u_width;
        let nx = groups_x.saturating_mul(WORKGROUP_SIZE).min(width);
        let ny = groups_y.saturating_mul(WORKGROUP_SIZE).min(uni.u_height);
        let texels = || (0..ny).flat_map(move |y| (0..nx).map(move |x| (x, y)));
        let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

        match kernel {
            Kernel::Math(f) => {
                let (id, mut out) = self.take_output(0, stage)?;
                let (a, b) = (self.input(1), self.input(2));
                for (x, y) in texels() {
                    let i = index(x, y);
                    let (va, vb) = (fetch(a, i), fetch(b, i));
                    store(&mut out, i, std::array::from_fn(|c| f(va[c], vb[c], &uni)));
                }
                self.buffers.insert(id, out);
            }
            Kernel::Mix(f) => {
                let (id, mut out) = self.take_output(0, stage)?;
                let (a, b, t) = (self.input(1), self.input(2), self.input(3));
                for (x, y) in texels() {
                    let i = index(x, y);
                    let (va, vb, vt) = (fetch(a, i), fetch(b, i), fetch(t, i));
                    store(&mut out, i, std::array::from_fn(|c| f(va[c], vb[c], vt[c])));
                }
                self.buffers.insert(id, out);
            }
            Kernel::Gradient(f) => {
                let (id, mut out) = self.take_output(0, stage)?;
                for (x, y) in texels() {
                    let (u, v) = texel_uv(x, y, width, uni.u_height);
                    let r = f(u, v);
                    store(&mut out, index(x, y), [r, r, r, 1.0]);
                }
                self.buffers.insert(id, out);
            }
            Kernel::Fbm => {
                let tex = self.texture(0, stage)?.clone();
                let (id, mut out) = self.take_output(0, stage)?;
                for (x, y) in texels() {
                    let v = fbm(&tex, uni.u_octaves, x, y, width, uni.u_height);
                    store(&mut out, index(x, y), v);
                }
                self.buffers.insert(id, out);
            }
            Kernel::Raymarch(scene, limits) => {
                let mut planes = Vec::with_capacity(4);
                for slot in 0..4 {
                    match self.take_output(slot, stage) {
                        Ok(plane) => planes.push(plane),
                        Err(e) => {
                            for (id, data) in planes {
                                self.buffers.insert(id, data);
                            }
                            return Err(e);
                        }
                    }
                }
                for (x, y) in texels() {
                    let g = march(&scene, limits, &uni, x, y);
                    let i = index(x, y);
                    store(&mut planes[0].1, i, g.depth);
                    store(&mut planes[1].1, i, g.color);
                    store(&mut planes[2].1, i, g.normal);
                    store(&mut planes[3].1, i, g.shadow);
                }
                for (id, data) in planes {
                    self.buffers.insert(id, data);
                }
            }
            Kernel::Deferred(bxdf) => {
                let (id, mut out) = self.take_output(0, stage)?;
                let (depth, color) = (self.input(1), self.input(2));
                let (normal, shadow) = (self.input(3), self.input(4));
                for (x, y) in texels() {
                    let i = index(x, y);
                    let g = GTexel {
                        depth: fetch(depth, i),
                        color: fetch(color, i),
                        normal: fetch(normal, i),
                        shadow: fetch(shadow, i),
                    };
                    store(&mut out, i, shade(&bxdf, &uni, &g, x, y));
                }
                self.buffers.insert(id, out);
            }
        }
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferHandle) -> TextureResult<Vec<u8>> {
        self.buffers
            .get(&buffer.0)
            .map(|data| bytemuck::cast_slice(data).to_vec())
            .ok_or_else(|| TextureError::device(format!("unknown buffer {buffer:?}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/device/host.rs"]
mod tests;
