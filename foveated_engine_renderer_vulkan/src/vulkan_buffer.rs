/// GpuBuffer - a Vulkan buffer with its gpu-allocator allocation

use ash::vk;
use foveated_engine::foveated::{Error, Result};
use foveated_engine::engine_bail;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::{VkResultExt, LOG_SOURCE};

pub struct GpuBuffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    /// Cached host pointer; `CpuToGpu` memory stays mapped for its whole life
    mapped: Option<NonNull<u8>>,
}

impl GpuBuffer {
    /// Create a buffer and bind fresh memory to it
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `size` - Size in bytes
    /// * `usage` - Vulkan usage flags
    /// * `location` - `CpuToGpu` for host-written buffers, `GpuOnly` otherwise
    pub fn new(ctx: Arc<GpuContext>, size: u64, usage: vk::BufferUsageFlags, location: MemoryLocation) -> Result<Self> {
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = ctx
                .device
                .create_buffer(&create_info, None)
                .or_backend(&format!("create buffer of {} bytes", size))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate("buffer", requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .or_backend("bind buffer memory")
            {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                return Err(e);
            }

            Ok(Self { ctx, buffer, allocation: Some(allocation), size, mapped: None })
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Host pointer to the buffer memory
    ///
    /// Repeated calls return the same pointer until [`GpuBuffer::unmap`].
    pub fn map(&mut self) -> Result<NonNull<u8>> {
        if let Some(ptr) = self.mapped {
            return Ok(ptr);
        }
        let Some(allocation) = &self.allocation else {
            engine_bail!(LOG_SOURCE, "Buffer map failed: buffer was destroyed");
        };
        let ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .cast::<u8>();
        self.mapped = Some(ptr);
        Ok(ptr)
    }

    /// Forget the cached pointer (the allocator keeps the memory mapped)
    pub fn unmap(&mut self) {
        self.mapped = None;
    }

    #[cfg(test)]
    pub(crate) fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Copy `bytes` into the buffer at `offset`
    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let end = offset.checked_add(bytes.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at offset {} overflows a {} byte buffer",
                bytes.len(),
                offset,
                self.size
            )));
        }
        let ptr = self.map()?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr().add(offset as usize), bytes.len());
        }
        Ok(())
    }

    /// Whole-buffer descriptor (buffer, 0, size)
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer,
            offset: 0,
            range: self.size,
        }
    }

    /// Free the memory and the buffer; a second call does nothing
    pub fn destroy(&mut self) {
        self.mapped = None;
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
            unsafe {
                self.ctx.device.destroy_buffer(self.buffer, None);
            }
            self.buffer = vk::Buffer::null();
        }
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}
