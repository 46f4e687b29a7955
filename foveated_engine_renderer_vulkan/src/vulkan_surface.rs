/// Surface - swapchain, present render pass and presentation sync
///
/// The swapchain is built once at the window size. It is never recreated:
/// an out-of-date swapchain is reported as an error, which is fatal.

use ash::vk;
use foveated_engine::foveated::Result;
use foveated_engine::{engine_debug, engine_info};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::{VkResultExt, LOG_SOURCE};
use crate::vulkan_image::full_range;

const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

// ===== SELECTION RULES =====

/// B8G8R8A8_UNORM / SRGB_NONLINEAR when allowed, else the first reported format
///
/// A single UNDEFINED entry means the surface accepts any format.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    match formats {
        [] => None,
        [only] if only.format == vk::Format::UNDEFINED => Some(PREFERRED_FORMAT),
        _ => Some(
            formats
                .iter()
                .copied()
                .find(|f| f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space)
                .unwrap_or(formats[0]),
        ),
    }
}

/// IMMEDIATE when available; FIFO is always supported
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        vk::PresentModeKHR::IMMEDIATE
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's current extent, or the window size clamped into its limits
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One image more than the minimum, within the maximum (0 means unbounded)
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

// ===== SURFACE =====

pub struct Surface {
    ctx: Arc<GpuContext>,
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    pub(crate) extent: vk::Extent2D,
    pub(crate) render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    /// Signaled by [`Surface::acquire`]
    pub(crate) image_available: vk::Semaphore,
    /// Waited on by [`Surface::present`]
    pub(crate) render_finished: vk::Semaphore,
}

impl Surface {
    /// Build the swapchain and everything the present pass renders into
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context owning the window surface
    /// * `width` - Window width, used when the surface leaves the extent open
    /// * `height` - Window height
    pub fn new(ctx: Arc<GpuContext>, width: u32, height: u32) -> Result<Self> {
        unsafe {
            let physical_device = ctx.queues.physical_device;
            let capabilities = ctx
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, ctx.surface)
                .or_init("get surface capabilities")?;
            let formats = ctx
                .surface_loader
                .get_physical_device_surface_formats(physical_device, ctx.surface)
                .or_init("get surface formats")?;
            let modes = ctx
                .surface_loader
                .get_physical_device_surface_present_modes(physical_device, ctx.surface)
                .or_init("get surface present modes")?;

            let surface_format = choose_surface_format(&formats).ok_or_else(|| {
                crate::vulkan_error::init_error("choose a surface format", "surface reports no formats")
            })?;
            let present_mode = choose_present_mode(&modes);
            let extent = choose_extent(&capabilities, width, height);

            let families = [ctx.queues.graphics_family, ctx.queues.present_family];
            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(ctx.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true);
            if families[0] != families[1] {
                create_info = create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&families);
            }

            let loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
            let swapchain = loader.create_swapchain(&create_info, None).or_init("create swapchain")?;

            let images = loader.get_swapchain_images(swapchain).or_init("get swapchain images")?;
            let image_views = images
                .iter()
                .map(|&image| {
                    let view_info = vk::ImageViewCreateInfo::default()
                        .image(image)
                        .view_type(vk::ImageViewType::TYPE_2D)
                        .format(surface_format.format)
                        .subresource_range(full_range(vk::ImageAspectFlags::COLOR));
                    ctx.device.create_image_view(&view_info, None)
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .or_init("create swapchain image views")?;

            let render_pass = create_present_render_pass(&ctx.device, surface_format.format)?;

            let framebuffers = image_views
                .iter()
                .map(|&view| {
                    let attachments = [view];
                    let info = vk::FramebufferCreateInfo::default()
                        .render_pass(render_pass)
                        .attachments(&attachments)
                        .width(extent.width)
                        .height(extent.height)
                        .layers(1);
                    ctx.device.create_framebuffer(&info, None)
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .or_init("create swapchain framebuffers")?;

            let semaphore_info = vk::SemaphoreCreateInfo::default();
            let image_available = ctx
                .device
                .create_semaphore(&semaphore_info, None)
                .or_init("create image-available semaphore")?;
            let render_finished = ctx
                .device
                .create_semaphore(&semaphore_info, None)
                .or_init("create render-finished semaphore")?;

            engine_info!(
                LOG_SOURCE,
                "Swapchain {}x{}, {} images, {:?}, {:?}",
                extent.width,
                extent.height,
                images.len(),
                surface_format.format,
                present_mode
            );

            Ok(Self {
                ctx,
                loader,
                swapchain,
                image_views,
                extent,
                render_pass,
                framebuffers,
                image_available,
                render_finished,
            })
        }
    }

    /// Framebuffer wrapping swapchain image `index`
    pub fn framebuffer(&self, index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(index as usize).copied()
    }

    /// Next swapchain image index, signaling `image_available`
    ///
    /// A suboptimal swapchain still presents correctly and counts as success.
    pub fn acquire(&self) -> Result<u32> {
        unsafe {
            let (index, suboptimal) = self
                .loader
                .acquire_next_image(self.swapchain, u64::MAX, self.image_available, vk::Fence::null())
                .or_backend("acquire swapchain image")?;
            if suboptimal {
                engine_debug!(LOG_SOURCE, "Swapchain is suboptimal (image {})", index);
            }
            Ok(index)
        }
    }

    /// Queue presentation of `index` once `render_finished` signals
    pub fn present(&self, index: u32) -> Result<()> {
        let wait_semaphores = [self.render_finished];
        let swapchains = [self.swapchain];
        let indices = [index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe {
            self.loader
                .queue_present(self.ctx.present_queue, &present_info)
                .or_backend("present swapchain image")?;
        }
        Ok(())
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            let device = &self.ctx.device;
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_semaphore(self.image_available, None);
            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            device.destroy_render_pass(self.render_pass, None);
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Single color attachment, UNDEFINED -> PRESENT_SRC
fn create_present_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
    let attachments = [vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);

    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    unsafe { device.create_render_pass(&info, None).or_init("create present render pass") }
}

#[cfg(test)]
#[path = "vulkan_surface_tests.rs"]
mod tests;
