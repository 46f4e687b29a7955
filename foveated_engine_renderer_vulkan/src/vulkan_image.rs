/// GpuImage - a 2D device-local image, its memory and its view

use ash::vk;
use foveated_engine::foveated::Result;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::VkResultExt;

pub struct GpuImage {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
}

impl GpuImage {
    /// Create the image, bind GPU-only memory, then build the 2D view
    ///
    /// The view is only created once the memory is bound, so a failed
    /// allocation never leaves a dangling view behind.
    pub fn new(
        ctx: Arc<GpuContext>,
        width: u32,
        height: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> Result<Self> {
        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width, height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx
                .device
                .create_image(&image_create_info, None)
                .or_backend(&format!("create {}x{} image", width, height))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate("image", requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .or_backend("bind image memory")
            {
                ctx.free(allocation);
                ctx.device.destroy_image(image, None);
                return Err(e);
            }

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(full_range(aspect));

            let view = match ctx.device.create_image_view(&view_create_info, None).or_backend("create image view") {
                Ok(view) => view,
                Err(e) => {
                    ctx.free(allocation);
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            Ok(Self {
                ctx,
                image,
                view,
                allocation: Some(allocation),
            })
        }
    }

    /// Sampler descriptor for this image in `layout`
    pub fn descriptor_info(&self, sampler: vk::Sampler, layout: vk::ImageLayout) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler,
            image_view: self.view,
            image_layout: layout,
        }
    }

    /// Destroy the view, the image and its memory; a second call does nothing
    pub fn destroy(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            unsafe {
                self.ctx.device.destroy_image_view(self.view, None);
                self.ctx.device.destroy_image(self.image, None);
            }
            self.ctx.free(allocation);
            self.view = vk::ImageView::null();
            self.image = vk::Image::null();
        }
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// One mip, one layer
pub fn full_range(aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: aspect,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}
