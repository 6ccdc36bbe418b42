//! Device Context API: programs, storage buffers bound to numeric slots, textures, dispatch and
//! blocking readback.
//!
//! Two implementations exist:
//!
//! - [`HostDevice`] runs every template's kernel on the CPU. Always available.
//! - `GpuDevice` (feature `gpu`) compiles the WGSL templates with wgpu.
//!
//! Both share one contract: slot `0` is the output, slots `1..N` are inputs, the dispatch grid is
//! [`dispatch_groups`] over a fixed [`WORKGROUP_SIZE`]² local size, and each shader only writes
//! texels inside `u_width × u_height`.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::config::{BackendKind, DeviceSettings};
use crate::foundation::error::{TextureError, TextureResult};

mod host;
mod kernels;
pub mod program;
mod resource;
pub mod uniforms;

#[cfg(feature = "gpu")]
mod gpu;

pub use host::HostDevice;
pub use program::{ProgramSource, ShaderTemplate};
pub use resource::{DeviceBuffer, DeviceProgram, DeviceTexture};
pub use uniforms::{UniformBlock, UniformValue};

#[cfg(feature = "gpu")]
pub use gpu::GpuDevice;

/// Local workgroup size in both axes. Must match `@workgroup_size` in every template.
pub const WORKGROUP_SIZE: u32 = 32;

/// Highest storage slot a template may use.
pub const MAX_STORAGE_SLOTS: u32 = 8;

/// Workgroups needed to cover a `width × height` image: `ceil(dim / 32)` per axis.
pub fn dispatch_groups(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(WORKGROUP_SIZE),
        height.div_ceil(WORKGROUP_SIZE),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u64);

/// Size of a device texture. Contents are always widened to four `f32` channels on upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
}

/// Low-level device operations.
///
/// Not internally synchronized: callers go through [`DeviceContext::with`], which serializes
/// access and keeps bind + dispatch + read atomic with respect to other nodes.
pub trait Device: Send {
    fn kind(&self) -> BackendKind;

    /// Render `source` (template + injected fragments) and compile it.
    fn compile_program(&mut self, source: &ProgramSource) -> TextureResult<ProgramHandle>;
    fn release_program(&mut self, program: ProgramHandle);

    /// Whether the compiled program declares `name`. Nodes only set declared uniforms.
    fn has_uniform(&self, program: ProgramHandle, name: &str) -> bool;
    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        name: &str,
        value: UniformValue,
    ) -> TextureResult<()>;

    fn allocate_buffer(
        &mut self,
        byte_len: usize,
        initial: Option<&[u8]>,
    ) -> TextureResult<BufferHandle>;
    fn write_buffer(&mut self, buffer: BufferHandle, bytes: &[u8]) -> TextureResult<()>;
    fn release_buffer(&mut self, buffer: BufferHandle);
    /// Point storage slot `slot` of the global binding table at `buffer`.
    fn bind_buffer(&mut self, buffer: BufferHandle, slot: u32) -> TextureResult<()>;

    fn create_texture(&mut self, desc: TextureDesc, rgba: &[f32]) -> TextureResult<TextureHandle>;
    fn bind_texture(&mut self, texture: TextureHandle, unit: u32) -> TextureResult<()>;
    fn release_texture(&mut self, texture: TextureHandle);

    fn dispatch(&mut self, program: ProgramHandle, groups_x: u32, groups_y: u32)
    -> TextureResult<()>;
    /// Blocks until the buffer contents are available on the host.
    fn read_buffer(&mut self, buffer: BufferHandle) -> TextureResult<Vec<u8>>;
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Release {
    Program(ProgramHandle),
    Buffer(BufferHandle),
    Texture(TextureHandle),
}

struct Shared {
    kind: BackendKind,
    device: Mutex<Box<dyn Device>>,
    // Releases queued by dropped resources; drained the next time the device is locked.
    pending: Mutex<Vec<Release>>,
}

/// Shared handle to one device, created explicitly once per program (or test fixture).
///
/// Cloning is cheap. The device is torn down when the last clone (including the clones held by
/// canvases, nodes and scoped resources) is dropped.
#[derive(Clone)]
pub struct DeviceContext {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("kind", &self.shared.kind)
            .finish_non_exhaustive()
    }
}

impl DeviceContext {
    /// Create the device described by `settings`.
    ///
    /// - `BackendKind::Host` is always available.
    /// - `BackendKind::Gpu` fails with `DeviceUnavailable` without the `gpu` feature or adapter.
    pub fn create(settings: &DeviceSettings) -> TextureResult<Self> {
        let device: Box<dyn Device> = match settings.backend {
            BackendKind::Host => Box::new(HostDevice::new()),
            #[cfg(feature = "gpu")]
            BackendKind::Gpu => Box::new(GpuDevice::new(settings)?),
            #[cfg(not(feature = "gpu"))]
            BackendKind::Gpu => {
                return Err(TextureError::device_unavailable(
                    "gpu backend requested but textureshop was built without the `gpu` feature",
                ));
            }
        };
        tracing::info!(backend = ?settings.backend, "device context created");
        Ok(Self::from_device(device))
    }

    /// Host reference device.
    pub fn host() -> Self {
        Self::from_device(Box::new(HostDevice::new()))
    }

    pub fn from_device(device: Box<dyn Device>) -> Self {
        Self {
            shared: Arc::new(Shared {
                kind: device.kind(),
                device: Mutex::new(device),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.shared.kind
    }

    pub fn same_device(&self, other: &DeviceContext) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Run `f` with exclusive access to the device.
    ///
    /// Scoped resources dropped since the last call are released first. Do not drop
    /// [`DeviceBuffer`]s or other scoped resources from inside `f`; they are queued, not freed,
    /// until the next call.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Device) -> TextureResult<R>) -> TextureResult<R> {
        let mut device = self.lock()?;
        self.drain_pending(device.as_mut());
        f(device.as_mut())
    }

    fn lock(&self) -> TextureResult<MutexGuard<'_, Box<dyn Device>>> {
        self.shared
            .device
            .lock()
            .map_err(|_| TextureError::device("device context lock poisoned"))
    }

    fn drain_pending(&self, device: &mut dyn Device) {
        let pending = match self.shared.pending.lock() {
            Ok(mut q) => std::mem::take(&mut *q),
            Err(_) => {
                tracing::warn!("release queue poisoned; queued device resources leak");
                return;
            }
        };
        for release in pending {
            match release {
                Release::Program(h) => device.release_program(h),
                Release::Buffer(h) => device.release_buffer(h),
                Release::Texture(h) => device.release_texture(h),
            }
        }
    }

    pub(crate) fn queue_release(&self, release: Release) {
        match self.shared.pending.lock() {
            Ok(mut q) => q.push(release),
            Err(_) => tracing::warn!(?release, "release queue poisoned; resource leaks"),
        }
    }

    /// Compile `source` into a program released when the returned guard is dropped.
    pub fn compile(&self, source: &ProgramSource) -> TextureResult<DeviceProgram> {
        let handle = self.with(|d| d.compile_program(source))?;
        tracing::debug!(template = source.template().name(), "program compiled");
        Ok(DeviceProgram::new(self.clone(), handle, source.template()))
    }

    /// Allocate a storage buffer released when the returned guard is dropped.
    pub fn allocate(&self, byte_len: usize, initial: Option<&[u8]>) -> TextureResult<DeviceBuffer> {
        let handle = self.with(|d| d.allocate_buffer(byte_len, initial))?;
        tracing::debug!(byte_len, "storage buffer allocated");
        Ok(DeviceBuffer::new(self.clone(), handle, byte_len))
    }

    /// Upload a texture released when the returned guard is dropped.
    pub fn upload_texture(&self, desc: TextureDesc, rgba: &[f32]) -> TextureResult<DeviceTexture> {
        let handle = self.with(|d| d.create_texture(desc, rgba))?;
        Ok(DeviceTexture::new(self.clone(), handle, desc))
    }

    /// Number of releases queued but not yet applied.
    pub fn pending_releases(&self) -> usize {
        self.shared.pending.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/device/context.rs"]
mod tests;
