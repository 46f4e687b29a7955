/// Descriptor layouts, samplers and descriptor set writes
///
/// Every pipeline shares one layout:
///
/// ```text
/// set 0 (per frame)  binding 0  camera       VERTEX
///                    binding 1  light        VERTEX | FRAGMENT
///                    binding 6  shadow map   FRAGMENT
///                    binding 7  user data    VERTEX | FRAGMENT
/// set 1 (per object) binding 0  texture      FRAGMENT
/// push constant      one mat4                VERTEX
/// ```

use ash::vk;
use foveated_engine::foveated::Result;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::VkResultExt;

pub const CAMERA_BINDING: u32 = 0;
pub const LIGHT_BINDING: u32 = 1;
pub const SHADOW_MAP_BINDING: u32 = 6;
pub const USER_DATA_BINDING: u32 = 7;
pub const TEXTURE_BINDING: u32 = 0;

pub const FRAME_SET: u32 = 0;
pub const TEXTURE_SET: u32 = 1;

/// Size of the vertex-stage push constant (one mat4)
pub const PUSH_CONSTANT_SIZE: u32 = 64;

fn binding(
    binding: u32,
    descriptor_type: vk::DescriptorType,
    stage_flags: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(descriptor_type)
        .descriptor_count(1)
        .stage_flags(stage_flags)
}

/// Bindings of set 0
pub fn frame_set_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 4] {
    let vertex_fragment = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
    [
        binding(CAMERA_BINDING, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX),
        binding(LIGHT_BINDING, vk::DescriptorType::UNIFORM_BUFFER, vertex_fragment),
        binding(SHADOW_MAP_BINDING, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT),
        binding(USER_DATA_BINDING, vk::DescriptorType::UNIFORM_BUFFER, vertex_fragment),
    ]
}

/// Bindings of set 1
pub fn texture_set_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 1] {
    [binding(TEXTURE_BINDING, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT)]
}

pub fn push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX,
        offset: 0,
        size: PUSH_CONSTANT_SIZE,
    }
}

// ===== LAYOUTS =====

/// Set layouts plus the pipeline layout built from them
pub struct DescriptorLayouts {
    ctx: Arc<GpuContext>,
    pub(crate) frame: vk::DescriptorSetLayout,
    pub(crate) texture: vk::DescriptorSetLayout,
    pub(crate) pipeline_layout: vk::PipelineLayout,
}

impl DescriptorLayouts {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let frame_bindings = frame_set_bindings();
            let frame = ctx
                .device
                .create_descriptor_set_layout(
                    &vk::DescriptorSetLayoutCreateInfo::default().bindings(&frame_bindings),
                    None,
                )
                .or_init("create frame descriptor set layout")?;

            let texture_bindings = texture_set_bindings();
            let texture = ctx
                .device
                .create_descriptor_set_layout(
                    &vk::DescriptorSetLayoutCreateInfo::default().bindings(&texture_bindings),
                    None,
                )
                .or_init("create texture descriptor set layout")?;

            let set_layouts = [frame, texture];
            let push_constants = [push_constant_range()];
            let pipeline_layout = ctx
                .device
                .create_pipeline_layout(
                    &vk::PipelineLayoutCreateInfo::default()
                        .set_layouts(&set_layouts)
                        .push_constant_ranges(&push_constants),
                    None,
                )
                .or_init("create pipeline layout")?;

            Ok(Self { ctx, frame, texture, pipeline_layout })
        }
    }

    fn allocate(&self, layout: vk::DescriptorSetLayout, what: &str) -> Result<vk::DescriptorSet> {
        let layouts = [layout];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.ctx.descriptor_pool)
            .set_layouts(&layouts);
        // The pool is never grown: running out is fatal
        let sets = unsafe { self.ctx.device.allocate_descriptor_sets(&info).or_backend(what)? };
        Ok(sets[0])
    }

    pub fn allocate_frame_set(&self) -> Result<vk::DescriptorSet> {
        self.allocate(self.frame, "allocate frame descriptor set")
    }

    pub fn allocate_texture_set(&self) -> Result<vk::DescriptorSet> {
        self.allocate(self.texture, "allocate texture descriptor set")
    }

    /// Return a set to the pool (it is created with FREE_DESCRIPTOR_SET)
    pub fn free_set(&self, set: vk::DescriptorSet) {
        unsafe {
            self.ctx
                .device
                .free_descriptor_sets(self.ctx.descriptor_pool, &[set])
                .ok();
        }
    }
}

impl Drop for DescriptorLayouts {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.ctx.device.destroy_descriptor_set_layout(self.texture, None);
            self.ctx.device.destroy_descriptor_set_layout(self.frame, None);
        }
    }
}

// ===== WRITES =====

/// Point set 0 at the uniform buffers and the shadow map
pub fn write_frame_set(
    device: &ash::Device,
    set: vk::DescriptorSet,
    camera: vk::DescriptorBufferInfo,
    light: vk::DescriptorBufferInfo,
    user_data: vk::DescriptorBufferInfo,
    shadow_map: vk::DescriptorImageInfo,
) {
    let camera = [camera];
    let light = [light];
    let user_data = [user_data];
    let shadow_map = [shadow_map];
    let writes = [
        buffer_write(set, CAMERA_BINDING, &camera),
        buffer_write(set, LIGHT_BINDING, &light),
        buffer_write(set, USER_DATA_BINDING, &user_data),
        image_write(set, SHADOW_MAP_BINDING, &shadow_map),
    ];
    unsafe {
        device.update_descriptor_sets(&writes, &[]);
    }
}

/// Rewrite only the shadow map binding of set 0
pub fn write_shadow_map(device: &ash::Device, set: vk::DescriptorSet, shadow_map: vk::DescriptorImageInfo) {
    let shadow_map = [shadow_map];
    unsafe {
        device.update_descriptor_sets(&[image_write(set, SHADOW_MAP_BINDING, &shadow_map)], &[]);
    }
}

/// Point a set-1 set at one sampled image
pub fn write_texture_set(device: &ash::Device, set: vk::DescriptorSet, image: vk::DescriptorImageInfo) {
    let image = [image];
    unsafe {
        device.update_descriptor_sets(&[image_write(set, TEXTURE_BINDING, &image)], &[]);
    }
}

fn buffer_write<'a>(set: vk::DescriptorSet, binding: u32, info: &'a [vk::DescriptorBufferInfo]) -> vk::WriteDescriptorSet<'a> {
    vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(info)
}

fn image_write<'a>(set: vk::DescriptorSet, binding: u32, info: &'a [vk::DescriptorImageInfo]) -> vk::WriteDescriptorSet<'a> {
    vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .image_info(info)
}

// ===== SAMPLERS =====

/// Linear/repeat sampler for textures and framebuffers, clamp-to-white for the shadow map
pub struct Samplers {
    ctx: Arc<GpuContext>,
    pub(crate) linear: vk::Sampler,
    pub(crate) shadow: vk::Sampler,
}

impl Samplers {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let linear_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .max_lod(1.0);

        // Outside the light frustum counts as lit
        let shadow_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
            .max_lod(1.0);

        unsafe {
            let linear = ctx.device.create_sampler(&linear_info, None).or_init("create texture sampler")?;
            let shadow = match ctx.device.create_sampler(&shadow_info, None).or_init("create shadow sampler") {
                Ok(shadow) => shadow,
                Err(e) => {
                    ctx.device.destroy_sampler(linear, None);
                    return Err(e);
                }
            };
            Ok(Self { ctx, linear, shadow })
        }
    }
}

impl Drop for Samplers {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.shadow, None);
            self.ctx.device.destroy_sampler(self.linear, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_descriptor_set_tests.rs"]
mod tests;
