/// Framebuffer - offscreen color/depth images, their render pass and completion semaphore
///
/// The render pass is created once. Resizing rebuilds the images, the
/// framebuffer and the semaphore against it, and bumps the generation so
/// stale descriptors can be told apart. Pipelines built for the pass stay valid.

use ash::vk;
use foveated_engine::foveated::Result;
use foveated_engine::{engine_bail, engine_debug};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::{VkResultExt, LOG_SOURCE};
use crate::vulkan_image::GpuImage;

/// Color attachment format of every offscreen pass
pub const COLOR_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
/// Depth attachment format of every offscreen pass
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Attachment descriptions in attachment order: colors first, then depth
///
/// Colors are always kept for sampling. Depth is only stored when a later
/// pass reads it (the shadow map).
pub fn attachment_descriptions(
    color_formats: &[vk::Format],
    depth_format: Option<vk::Format>,
    depth_must_persist: bool,
) -> Vec<vk::AttachmentDescription> {
    let mut attachments: Vec<vk::AttachmentDescription> = color_formats
        .iter()
        .map(|&format| {
            vk::AttachmentDescription::default()
                .format(format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        })
        .collect();

    if let Some(format) = depth_format {
        let store_op = if depth_must_persist {
            vk::AttachmentStoreOp::STORE
        } else {
            vk::AttachmentStoreOp::DONT_CARE
        };
        attachments.push(
            vk::AttachmentDescription::default()
                .format(format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(store_op)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL),
        );
    }
    attachments
}

/// Build the render pass matching an attachment layout
pub fn create_render_pass(
    device: &ash::Device,
    color_formats: &[vk::Format],
    depth_format: Option<vk::Format>,
    depth_must_persist: bool,
) -> Result<vk::RenderPass> {
    let attachments = attachment_descriptions(color_formats, depth_format, depth_must_persist);

    let color_refs: Vec<vk::AttachmentReference> = (0..color_formats.len() as u32)
        .map(|i| {
            vk::AttachmentReference::default()
                .attachment(i)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        })
        .collect();
    let depth_ref = vk::AttachmentReference::default()
        .attachment(color_formats.len() as u32)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if depth_format.is_some() {
        subpass = subpass.depth_stencil_attachment(&depth_ref);
    }

    // Previous readers finish before we write; later passes sample in the fragment stage
    let write_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    let write_access = vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    let dependencies = [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .src_access_mask(vk::AccessFlags::SHADER_READ)
            .dst_stage_mask(write_stages)
            .dst_access_mask(write_access),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(write_stages)
            .src_access_mask(write_access)
            .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .dst_access_mask(vk::AccessFlags::SHADER_READ),
    ];

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    unsafe { device.create_render_pass(&info, None).or_init("create framebuffer render pass") }
}

pub struct Framebuffer {
    ctx: Arc<GpuContext>,
    label: &'static str,
    color_formats: Vec<vk::Format>,
    depth_format: Option<vk::Format>,
    depth_must_persist: bool,

    extent: vk::Extent2D,
    colors: Vec<GpuImage>,
    depth: Option<GpuImage>,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) framebuffer: vk::Framebuffer,
    /// Signaled by the pass rendering into this framebuffer
    pub(crate) semaphore: vk::Semaphore,
    generation: u64,
    live: bool,
}

impl Framebuffer {
    /// Allocate the attachments and build the render pass and framebuffer
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `label` - Name used in logs
    /// * `extent` - Size in pixels
    /// * `color_formats` - One color image per format
    /// * `depth_format` - Optional depth image
    /// * `depth_must_persist` - Keep depth for later sampling
    pub fn new(
        ctx: Arc<GpuContext>,
        label: &'static str,
        extent: vk::Extent2D,
        color_formats: &[vk::Format],
        depth_format: Option<vk::Format>,
        depth_must_persist: bool,
    ) -> Result<Self> {
        let mut framebuffer = Self {
            ctx,
            label,
            color_formats: color_formats.to_vec(),
            depth_format,
            depth_must_persist,
            extent,
            colors: Vec::new(),
            depth: None,
            render_pass: vk::RenderPass::null(),
            framebuffer: vk::Framebuffer::null(),
            semaphore: vk::Semaphore::null(),
            generation: 0,
            // Partially built state is owned by self, so Drop cleans up on error
            live: true,
        };
        framebuffer.render_pass = create_render_pass(
            &framebuffer.ctx.device,
            &framebuffer.color_formats,
            framebuffer.depth_format,
            framebuffer.depth_must_persist,
        )?;
        framebuffer.setup(extent)?;
        Ok(framebuffer)
    }

    fn setup(&mut self, extent: vk::Extent2D) -> Result<()> {
        let color_usage = vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED;
        let depth_usage = vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED;

        self.extent = extent;
        for &format in &self.color_formats {
            self.colors.push(GpuImage::new(
                Arc::clone(&self.ctx),
                extent.width,
                extent.height,
                format,
                color_usage,
                vk::ImageAspectFlags::COLOR,
            )?);
        }
        if let Some(format) = self.depth_format {
            self.depth = Some(GpuImage::new(
                Arc::clone(&self.ctx),
                extent.width,
                extent.height,
                format,
                depth_usage,
                vk::ImageAspectFlags::DEPTH,
            )?);
        }

        let views: Vec<vk::ImageView> = self
            .colors
            .iter()
            .chain(self.depth.iter())
            .map(|image| image.view)
            .collect();
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(self.render_pass)
            .attachments(&views)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        unsafe {
            self.framebuffer = self
                .ctx
                .device
                .create_framebuffer(&info, None)
                .or_init(&format!("create {} framebuffer", self.label))?;
            self.semaphore = self
                .ctx
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .or_init(&format!("create {} semaphore", self.label))?;
        }

        self.generation += 1;
        Ok(())
    }

    /// Images, framebuffer and semaphore; the render pass survives
    fn release_attachments(&mut self) {
        unsafe {
            let device = &self.ctx.device;
            if self.semaphore != vk::Semaphore::null() {
                device.destroy_semaphore(self.semaphore, None);
            }
            if self.framebuffer != vk::Framebuffer::null() {
                device.destroy_framebuffer(self.framebuffer, None);
            }
        }
        self.semaphore = vk::Semaphore::null();
        self.framebuffer = vk::Framebuffer::null();
        self.colors.clear();
        self.depth = None;
    }

    /// Release images, render pass, framebuffer and semaphore; a second call does nothing
    pub fn destroy(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.release_attachments();
        if self.render_pass != vk::RenderPass::null() {
            unsafe {
                self.ctx.device.destroy_render_pass(self.render_pass, None);
            }
        }
        self.render_pass = vk::RenderPass::null();
    }

    /// Rebuild the attachments at `extent` inside the same render pass
    ///
    /// # Returns
    ///
    /// The new generation
    pub fn resize(&mut self, extent: vk::Extent2D) -> Result<u64> {
        engine_debug!(
            LOG_SOURCE,
            "{} framebuffer {}x{} -> {}x{}",
            self.label,
            self.extent.width,
            self.extent.height,
            extent.width,
            extent.height
        );
        if !self.live {
            engine_bail!(LOG_SOURCE, "{} framebuffer resize after destroy", self.label);
        }
        self.release_attachments();
        self.setup(extent)?;
        Ok(self.generation)
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sampler descriptors: colors in order, then depth
    pub fn descriptor_image_infos(&self, sampler: vk::Sampler) -> Vec<vk::DescriptorImageInfo> {
        self.colors
            .iter()
            .map(|image| image.descriptor_info(sampler, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL))
            .chain(
                self.depth
                    .iter()
                    .map(|image| image.descriptor_info(sampler, vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL)),
            )
            .collect()
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "vulkan_frame_buffer_tests.rs"]
mod tests;
