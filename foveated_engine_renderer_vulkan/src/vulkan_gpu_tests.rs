/// GPU checks on crate-internal objects (buffer mapping, framebuffer rebuilds)
///
/// Requires a GPU and a display, so the single test is marked with #[ignore].
/// winit allows one event loop per process, so every check shares one device.
///
/// Run with: cargo test -p foveated_engine_renderer_vulkan -- --ignored

use ash::vk;
use foveated_engine::foveated::config::EngineConfig;
use foveated_engine::foveated::Error;
use gpu_allocator::MemoryLocation;
use serial_test::serial;
use std::sync::Arc;
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_frame_buffer::{Framebuffer, COLOR_FORMAT, DEPTH_FORMAT};
use crate::vulkan_graphics_device::VulkanGraphicsDevice;

#[allow(deprecated)]
fn create_test_window(width: u32, height: u32) -> (Window, EventLoop<()>) {
    let mut builder = EventLoop::builder();
    #[cfg(target_os = "linux")]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }
    let event_loop = builder.build().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("Vulkan GPU Test")
        .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
        .with_visible(false);
    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

fn check_buffer_mapping(ctx: &Arc<GpuContext>) {
    let mut buffer = GpuBuffer::new(
        Arc::clone(ctx),
        64,
        vk::BufferUsageFlags::UNIFORM_BUFFER,
        MemoryLocation::CpuToGpu,
    )
    .unwrap();
    assert!(!buffer.is_mapped());

    let first = buffer.map().unwrap();
    let second = buffer.map().unwrap();
    assert_eq!(first, second);
    assert!(buffer.is_mapped());

    buffer.unmap();
    assert!(!buffer.is_mapped());

    // Writing maps again on demand
    buffer.write(60, &[1, 2, 3, 4]).unwrap();
    assert!(buffer.is_mapped());
    let remapped = buffer.map().unwrap();
    assert_eq!(unsafe { std::slice::from_raw_parts(remapped.as_ptr().add(60), 4) }, &[1, 2, 3, 4]);

    assert!(matches!(buffer.write(61, &[0; 4]), Err(Error::InvalidResource(_))));

    buffer.destroy();
    assert!(!buffer.is_mapped());
    assert!(buffer.map().is_err());
}

fn check_resize_keeps_render_pass(ctx: &Arc<GpuContext>) {
    let extent = vk::Extent2D { width: 64, height: 64 };
    let mut framebuffer =
        Framebuffer::new(Arc::clone(ctx), "Test", extent, &[COLOR_FORMAT], Some(DEPTH_FORMAT), false).unwrap();
    let render_pass = framebuffer.render_pass;
    let generation = framebuffer.generation();

    let resized = framebuffer.resize(vk::Extent2D { width: 32, height: 16 }).unwrap();
    assert_eq!(resized, generation + 1);
    assert_eq!(framebuffer.render_pass, render_pass);
    assert_ne!(framebuffer.framebuffer, vk::Framebuffer::null());
    assert_eq!(framebuffer.extent(), vk::Extent2D { width: 32, height: 16 });

    framebuffer.destroy();
    assert_eq!(framebuffer.render_pass, vk::RenderPass::null());
    assert!(framebuffer.resize(extent).is_err());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_gpu_internal_objects() {
    let config = EngineConfig { width: 320, height: 180, shadow_resolution: 256, ..EngineConfig::default() };
    let (window, _event_loop) = create_test_window(config.width, config.height);
    let device = VulkanGraphicsDevice::new(&window, &config).unwrap();
    let ctx = Arc::clone(device.context());

    check_buffer_mapping(&ctx);
    check_resize_keeps_render_pass(&ctx);
}
