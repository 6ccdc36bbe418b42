use super::{
    BufferHandle, DeviceContext, ProgramHandle, Release, ShaderTemplate, TextureDesc,
    TextureHandle,
};

/// Compiled program owned by a node; released when dropped.
#[derive(Debug)]
pub struct DeviceProgram {
    ctx: DeviceContext,
    handle: ProgramHandle,
    template: ShaderTemplate,
}

impl DeviceProgram {
    pub(super) fn new(ctx: DeviceContext, handle: ProgramHandle, template: ShaderTemplate) -> Self {
        Self {
            ctx,
            handle,
            template,
        }
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn template(&self) -> ShaderTemplate {
        self.template
    }
}

impl Drop for DeviceProgram {
    fn drop(&mut self) {
        self.ctx.queue_release(Release::Program(self.handle));
    }
}

/// Storage buffer owned by whoever holds the guard; released when dropped.
///
/// Buffers shared between nodes (the raymarch G-buffer) are wrapped in `Arc` so the consumer
/// keeps them alive without owning the allocation.
#[derive(Debug)]
pub struct DeviceBuffer {
    ctx: DeviceContext,
    handle: BufferHandle,
    byte_len: usize,
}

impl DeviceBuffer {
    pub(super) fn new(ctx: DeviceContext, handle: BufferHandle, byte_len: usize) -> Self {
        Self {
            ctx,
            handle,
            byte_len,
        }
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn context(&self) -> &DeviceContext {
        &self.ctx
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.ctx.queue_release(Release::Buffer(self.handle));
    }
}

#[derive(Debug)]
pub struct DeviceTexture {
    ctx: DeviceContext,
    handle: TextureHandle,
    desc: TextureDesc,
}

impl DeviceTexture {
    pub(super) fn new(ctx: DeviceContext, handle: TextureHandle, desc: TextureDesc) -> Self {
        Self { ctx, handle, desc }
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn desc(&self) -> TextureDesc {
        self.desc
    }

    pub fn context(&self) -> &DeviceContext {
        &self.ctx
    }
}

impl Drop for DeviceTexture {
    fn drop(&mut self) {
        self.ctx.queue_release(Release::Texture(self.handle));
    }
}
