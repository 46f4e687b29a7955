/// Pipeline - one graphics pipeline built against the render pass of its draw stage
///
/// All pipelines share the fixed state below and the layout from
/// [`DescriptorLayouts`](crate::vulkan_descriptor_set::DescriptorLayouts);
/// only the shader code and the render pass differ.

use ash::vk;
use foveated_engine::foveated::device::{DrawStage, ShaderDesc, Vertex};
use foveated_engine::foveated::{Error, Result};
use foveated_engine::engine_debug;
use std::io::Cursor;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_error::{VkResultExt, LOG_SOURCE};

/// Interleaved vertex buffer at binding 0
pub fn vertex_binding() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: Vertex::STRIDE,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

/// position, normal, tex_coord, color at locations 0..=3
pub fn vertex_attributes() -> [vk::VertexInputAttributeDescription; 4] {
    let formats = [
        vk::Format::R32G32B32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT,
        vk::Format::R32G32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT,
    ];
    let mut attributes = [vk::VertexInputAttributeDescription::default(); 4];
    for (location, attribute) in attributes.iter_mut().enumerate() {
        *attribute = vk::VertexInputAttributeDescription {
            location: location as u32,
            binding: 0,
            format: formats[location],
            offset: Vertex::ATTRIBUTE_OFFSETS[location],
        };
    }
    attributes
}

/// SPIR-V words from raw bytes
pub fn read_spirv(code: &[u8]) -> Result<Vec<u32>> {
    ash::util::read_spv(&mut Cursor::new(code))
        .map_err(|e| Error::InvalidResource(format!("invalid SPIR-V ({} bytes): {}", code.len(), e)))
}

pub struct Pipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) stage: DrawStage,
}

impl Pipeline {
    /// Compile both modules and build the pipeline
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `layout` - The shared pipeline layout
    /// * `render_pass` - Render pass of `desc.stage`
    /// * `color_attachment_count` - Color attachments of that render pass (0 for the shadow pass)
    /// * `extent` - Initial viewport size (viewport and scissor are dynamic)
    /// * `desc` - Vertex and fragment code plus the draw stage
    pub fn new(
        ctx: Arc<GpuContext>,
        layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
        color_attachment_count: u32,
        extent: vk::Extent2D,
        desc: &ShaderDesc,
    ) -> Result<Self> {
        desc.validate()?;
        let vertex_words = read_spirv(desc.vertex_code)?;
        let fragment_words = read_spirv(desc.fragment_code)?;

        unsafe {
            let device = &ctx.device;
            let vertex_module = device
                .create_shader_module(&vk::ShaderModuleCreateInfo::default().code(&vertex_words), None)
                .or_backend("create vertex shader module")?;
            let fragment_module = match device
                .create_shader_module(&vk::ShaderModuleCreateInfo::default().code(&fragment_words), None)
                .or_backend("create fragment shader module")
            {
                Ok(module) => module,
                Err(e) => {
                    device.destroy_shader_module(vertex_module, None);
                    return Err(e);
                }
            };

            let stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::VERTEX)
                    .module(vertex_module)
                    .name(c"main"),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(fragment_module)
                    .name(c"main"),
            ];

            let bindings = [vertex_binding()];
            let attributes = vertex_attributes();
            let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&bindings)
                .vertex_attribute_descriptions(&attributes);

            let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
                .primitive_restart_enable(false);

            let viewports = [vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }];
            let scissors = [vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent }];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
                .polygon_mode(vk::PolygonMode::FILL)
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::CLOCKWISE)
                .line_width(1.0);

            let multisample = vk::PipelineMultisampleStateCreateInfo::default()
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(true)
                .depth_compare_op(vk::CompareOp::LESS);

            let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
                .color_write_mask(vk::ColorComponentFlags::RGBA);
            let blend_attachments = vec![blend_attachment; color_attachment_count as usize];
            let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

            let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

            let create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&stages)
                .vertex_input_state(&vertex_input)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization)
                .multisample_state(&multisample)
                .depth_stencil_state(&depth_stencil)
                .color_blend_state(&color_blend)
                .dynamic_state(&dynamic_state)
                .layout(layout)
                .render_pass(render_pass)
                .subpass(0);

            let result = device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None);

            // Modules are only needed while the pipeline is built
            device.destroy_shader_module(fragment_module, None);
            device.destroy_shader_module(vertex_module, None);

            let pipelines = result
                .map_err(|(_, e)| e)
                .or_backend(&format!("create {:?} pipeline", desc.stage))?;

            engine_debug!(
                LOG_SOURCE,
                "{:?} pipeline ready ({} + {} bytes of SPIR-V)",
                desc.stage,
                desc.vertex_code.len(),
                desc.fragment_code.len()
            );

            Ok(Self { ctx, pipeline: pipelines[0], stage: desc.stage })
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
