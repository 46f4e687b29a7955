/*!
# Foveated Engine - Vulkan Backend

Vulkan implementation of [`GraphicsDevice`](foveated_engine::foveated::device::GraphicsDevice),
built on `ash` for the bindings and `gpu-allocator` for device memory.

One graphics queue runs the five passes of a frame. Each offscreen pass owns
a framebuffer with a signal semaphore; the swapchain owns the acquire and
present semaphores. `VulkanGraphicsDevice::new` takes the window the
swapchain presents into.

Validation layers are compiled in with the `vulkan-validation` feature and
enabled at runtime by `EngineConfig::enable_validation`.
*/

// GPU context, device selection and error mapping
mod vulkan_error;
mod vulkan_device;
mod vulkan_context;
#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

// Memory-backed objects
mod vulkan_buffer;
mod vulkan_image;

// Render targets
mod vulkan_surface;
mod vulkan_frame_buffer;

// Pipeline interface
mod vulkan_descriptor_set;
mod vulkan_pipeline;

// GraphicsDevice implementation
mod vulkan_graphics_device;

#[cfg(test)]
mod vulkan_gpu_tests;

pub mod foveated {
    pub use crate::vulkan_graphics_device::{VulkanGraphicsDevice, STAGING_BUFFER_SIZE};
}
