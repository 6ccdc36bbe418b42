use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use wgpu::util::DeviceExt;

use super::{
    BufferHandle, Device, MAX_STORAGE_SLOTS, ProgramHandle, ProgramSource, ShaderTemplate,
    TextureDesc, TextureHandle, UniformBlock, UniformValue, WORKGROUP_SIZE,
};
use crate::foundation::config::{BackendKind, DeviceSettings, PowerPreference};
use crate::foundation::error::{TextureError, TextureResult};

/// Binding index of the uniform block in group 0. Must match the WGSL prelude.
const UNIFORM_BINDING: u32 = 15;

struct Pipeline {
    pipeline: wgpu::ComputePipeline,
    storage_layout: wgpu::BindGroupLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
    slots: u32,
    units: u32,
}

struct GpuProgram {
    template: ShaderTemplate,
    pipeline: Arc<Pipeline>,
    declared: Vec<&'static str>,
    uniforms: UniformBlock,
    uniform_buffer: wgpu::Buffer,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// wgpu compute device running the WGSL templates.
///
/// Pipelines are cached by rendered source, so nodes sharing a template variant share one
/// pipeline while keeping their own uniform buffer.
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    readback_timeout: Option<Duration>,
    next_id: u64,
    pipelines: HashMap<String, Arc<Pipeline>>,
    programs: HashMap<u64, GpuProgram>,
    buffers: HashMap<u64, wgpu::Buffer>,
    textures: HashMap<u64, GpuTexture>,
    slots: BTreeMap<u32, BufferHandle>,
    units: BTreeMap<u32, TextureHandle>,
    // Bound to declared storage slots nothing was bound to.
    placeholder: wgpu::Buffer,
}

impl GpuDevice {
    pub fn new(settings: &DeviceSettings) -> TextureResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let power_preference = match settings.power_preference {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                TextureError::device_unavailable("no gpu adapter available")
            }
            other => {
                TextureError::device_unavailable(format!("wgpu request_adapter failed: {other:?}"))
            }
        })?;

        let available = adapter.limits();
        let invocations = WORKGROUP_SIZE * WORKGROUP_SIZE;
        if available.max_compute_invocations_per_workgroup < invocations
            || available.max_compute_workgroup_size_x < WORKGROUP_SIZE
            || available.max_compute_workgroup_size_y < WORKGROUP_SIZE
        {
            return Err(TextureError::device_unavailable(format!(
                "adapter supports {} invocations per workgroup, {invocations} required",
                available.max_compute_invocations_per_workgroup
            )));
        }
        let required_limits = wgpu::Limits {
            max_compute_invocations_per_workgroup: invocations,
            max_storage_buffer_binding_size: available.max_storage_buffer_binding_size,
            max_buffer_size: available.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("textureshop"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            TextureError::device_unavailable(format!("wgpu request_device failed: {e:?}"))
        })?;

        tracing::info!(adapter = ?adapter.get_info().name, "gpu device ready");

        let placeholder = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("textureshop_placeholder"),
            size: 16,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            readback_timeout: settings.readback_timeout,
            next_id: 0,
            pipelines: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            slots: BTreeMap::new(),
            units: BTreeMap::new(),
            placeholder,
        })
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn build_pipeline(&self, template: ShaderTemplate, wgsl: &str) -> TextureResult<Pipeline> {
        let slots = template.storage_slots();
        let units = template.texture_units();

        let mut storage_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..slots)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        storage_entries.push(wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BINDING,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        let storage_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("textureshop_storage_bgl"),
                entries: &storage_entries,
            });

        let texture_layout = (units > 0).then(|| {
            let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..units)
                .map(|binding| wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                })
                .collect();
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("textureshop_texture_bgl"),
                    entries: &entries,
                })
        });

        let mut layouts = vec![&storage_layout];
        if let Some(l) = &texture_layout {
            layouts.push(l);
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(template.name()),
                source: wgpu::ShaderSource::Wgsl(wgsl.into()),
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("textureshop_pl"),
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(template.name()),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(TextureError::configuration(
                template.name(),
                format!("shader compilation failed: {err}"),
            ));
        }

        Ok(Pipeline {
            pipeline,
            storage_layout,
            texture_layout,
            slots,
            units,
        })
    }

    fn program(&self, program: ProgramHandle) -> TextureResult<&GpuProgram> {
        self.programs
            .get(&program.0)
            .ok_or_else(|| TextureError::device(format!("unknown program {program:?}")))
    }

    fn wait_for_map(
        &self,
        rx: &mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
    ) -> TextureResult<()> {
        let Some(limit) = self.readback_timeout else {
            self.device
                .poll(wgpu::PollType::wait_indefinitely())
                .map_err(|e| TextureError::device(format!("wgpu poll failed: {e:?}")))?;
            return rx
                .recv()
                .map_err(|_| TextureError::device("readback channel closed"))?
                .map_err(|e| TextureError::device(format!("readback map failed: {e:?}")));
        };

        let start = Instant::now();
        loop {
            self.device
                .poll(wgpu::PollType::Poll)
                .map_err(|e| TextureError::device(format!("wgpu poll failed: {e:?}")))?;
            match rx.try_recv() {
                Ok(res) => {
                    return res
                        .map_err(|e| TextureError::device(format!("readback map failed: {e:?}")));
                }
                Err(mpsc::TryRecvError::Empty) if start.elapsed() < limit => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(mpsc::TryRecvError::Empty) => {
                    return Err(TextureError::device(format!(
                        "readback timed out after {limit:?}"
                    )));
                }
                Err(mpsc::TryRecvError::Disconnected) => {
                    return Err(TextureError::device("readback channel closed"));
                }
            }
        }
    }
}

impl Device for GpuDevice {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn compile_program(&mut self, source: &ProgramSource) -> TextureResult<ProgramHandle> {
        let wgsl = source.render()?;
        let pipeline = match self.pipelines.get(&wgsl) {
            Some(p) => p.clone(),
            None => {
                let p = Arc::new(self.build_pipeline(source.template(), &wgsl)?);
                self.pipelines.insert(wgsl, p.clone());
                p
            }
        };
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("textureshop_uniforms"),
            size: std::mem::size_of::<UniformBlock>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let id = self.next_id();
        self.programs.insert(
            id,
            GpuProgram {
                template: source.template(),
                pipeline,
                declared: source.declared_uniforms(),
                uniforms: UniformBlock::default(),
                uniform_buffer,
            },
        );
        Ok(ProgramHandle(id))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if let Some(p) = self.programs.remove(&program.0) {
            p.uniform_buffer.destroy();
        }
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
        if byte_len == 0 || byte_len % std::mem::size_of::<f32>() != 0 {
            return Err(TextureError::validation(format!(
                "storage buffers hold f32 values; {byte_len} bytes is not a positive multiple of 4"
            )));
        }
        let usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;
        let buffer = match initial {
            Some(bytes) if bytes.len() != byte_len => {
                return Err(TextureError::validation(format!(
                    "initial contents are {} bytes, buffer is {byte_len}",
                    bytes.len()
                )));
            }
            Some(bytes) => self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("textureshop_storage"),
                    contents: bytes,
                    usage,
                }),
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("textureshop_storage"),
                size: byte_len as u64,
                usage,
                mapped_at_creation: false,
            }),
        };
        let id = self.next_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, bytes: &[u8]) -> TextureResult<()> {
        let buf = self
            .buffers
            .get(&buffer.0)
            .ok_or_else(|| TextureError::device(format!("unknown buffer {buffer:?}")))?;
        if bytes.len() as u64 != buf.size() {
            return Err(TextureError::validation(format!(
                "write of {} bytes into a {}-byte buffer",
                bytes.len(),
                buf.size()
            )));
        }
        self.queue.write_buffer(buf, 0, bytes);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buf) = self.buffers.remove(&buffer.0) {
            buf.destroy();
        }
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
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.width == 0 || desc.height == 0 || rgba.len() != expected {
            return Err(TextureError::unsupported_texture(format!(
                "{}x{} rgba texture needs {expected} floats, got {}",
                desc.width,
                desc.height,
                rgba.len()
            )));
        }
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("textureshop_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(rgba),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * 16),
                rows_per_image: Some(desc.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.next_id();
        self.textures.insert(
            id,
            GpuTexture {
                _texture: texture,
                view,
            },
        );
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
        let pipeline = &prog.pipeline;

        if !self.slots.contains_key(&0) {
            return Err(TextureError::device(format!(
                "{stage}: storage slot 0 is unbound"
            )));
        }

        self.queue
            .write_buffer(&prog.uniform_buffer, 0, prog.uniforms.as_bytes());

        let mut storage_entries: Vec<wgpu::BindGroupEntry<'_>> = (0..pipeline.slots)
            .map(|slot| {
                let buffer = self
                    .slots
                    .get(&slot)
                    .and_then(|h| self.buffers.get(&h.0))
                    .unwrap_or(&self.placeholder);
                wgpu::BindGroupEntry {
                    binding: slot,
                    resource: buffer.as_entire_binding(),
                }
            })
            .collect();
        storage_entries.push(wgpu::BindGroupEntry {
            binding: UNIFORM_BINDING,
            resource: prog.uniform_buffer.as_entire_binding(),
        });

        let mut texture_views = Vec::with_capacity(pipeline.units as usize);
        for unit in 0..pipeline.units {
            let view = self
                .units
                .get(&unit)
                .and_then(|h| self.textures.get(&h.0))
                .map(|t| &t.view)
                .ok_or_else(|| {
                    TextureError::device(format!("{stage}: texture unit {unit} is unbound"))
                })?;
            texture_views.push(view);
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let storage_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("textureshop_storage_bg"),
            layout: &pipeline.storage_layout,
            entries: &storage_entries,
        });
        let texture_group = pipeline.texture_layout.as_ref().map(|layout| {
            let entries: Vec<wgpu::BindGroupEntry<'_>> = texture_views
                .iter()
                .enumerate()
                .map(|(unit, view)| wgpu::BindGroupEntry {
                    binding: unit as u32,
                    resource: wgpu::BindingResource::TextureView(view),
                })
                .collect();
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("textureshop_texture_bg"),
                layout,
                entries: &entries,
            })
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("textureshop_dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(stage),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, &storage_group, &[]);
            if let Some(group) = &texture_group {
                pass.set_bind_group(1, group, &[]);
            }
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(TextureError::device(format!("{stage}: dispatch failed: {err}")));
        }
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferHandle) -> TextureResult<Vec<u8>> {
        let src = self
            .buffers
            .get(&buffer.0)
            .ok_or_else(|| TextureError::device(format!("unknown buffer {buffer:?}")))?;
        let size = src.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("textureshop_readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("textureshop_readback"),
            });
        encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.wait_for_map(&rx)?;

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }
}
