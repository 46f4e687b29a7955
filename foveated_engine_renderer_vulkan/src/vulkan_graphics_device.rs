/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns every GPU object of the foveated pipeline: the four offscreen
/// framebuffers, the swapchain, one command buffer per pass, the frame fence,
/// the persistently mapped uniform buffers and the single staging buffer.
/// Resources are kept in slotmaps and handed out as opaque handles.

use ash::vk;
use foveated_engine::foveated::config::EngineConfig;
use foveated_engine::foveated::device::{
    BoundTexture, CameraUniform, ClearValue, DepthMode, DrawKind, DrawStage, Extent2D, FrameSemaphore,
    FrameUniforms, GraphicsDevice, LightData, ModelHandle, Pass, PassRecording, PassSync, Rect2D, ShaderDesc,
    ShaderHandle, TextureData, TextureFormat, TextureHandle, Vertex, Viewport, WaitStage,
};
use foveated_engine::foveated::{Error, Result};
use foveated_engine::glam::Mat4;
use foveated_engine::{engine_debug, engine_info, engine_trace};
use gpu_allocator::MemoryLocation;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::borrow::Cow;
use std::sync::Arc;
use winit::window::Window;

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_set::{self as descriptors, DescriptorLayouts, Samplers, FRAME_SET, TEXTURE_SET};
use crate::vulkan_error::{VkResultExt, LOG_SOURCE};
use crate::vulkan_frame_buffer::{Framebuffer, COLOR_FORMAT, DEPTH_FORMAT};
use crate::vulkan_image::{full_range, GpuImage};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_surface::Surface;

/// Size of the one staging buffer every upload goes through
pub const STAGING_BUFFER_SIZE: u64 = 64 * 1024 * 1024;

/// Side of the black placeholder texture
const DUMMY_TEXTURE_SIZE: u32 = 2;

/// Passes that own a descriptor set sampling their first color attachment
const SAMPLED_PASSES: [Pass; 3] = [Pass::World, Pass::Foveated, Pass::Ui];

// ===== CONVERSIONS =====

pub fn clear_value_to_vk(clear: &ClearValue) -> vk::ClearValue {
    match *clear {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

pub fn wait_stage_to_vk(stage: WaitStage) -> vk::PipelineStageFlags {
    let mut flags = vk::PipelineStageFlags::empty();
    if stage.contains(WaitStage::FRAGMENT_SHADER) {
        flags |= vk::PipelineStageFlags::FRAGMENT_SHADER;
    }
    if stage.contains(WaitStage::COLOR_ATTACHMENT_OUTPUT) {
        flags |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    }
    flags
}

pub fn viewport_to_vk(viewport: &Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

pub fn rect_to_vk(rect: &Rect2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: rect.x, y: rect.y },
        extent: vk::Extent2D { width: rect.width, height: rect.height },
    }
}

fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D { width: extent.width, height: extent.height }
}

fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

/// Device format and tightly packed bytes of a texture
///
/// Three-channel images are widened to RGBA with opaque alpha, since
/// R8G8B8 is rarely sampleable with optimal tiling.
pub fn upload_layout(data: &TextureData) -> Result<(vk::Format, Cow<'_, [u8]>)> {
    if !(1..=4).contains(&data.channels) {
        return Err(Error::InvalidResource(format!("texture with {} channels", data.channels)));
    }
    data.validate()?;
    let pixels = &data.pixels[..data.byte_size() as usize];
    Ok(match data.format() {
        TextureFormat::R8_UNORM => (vk::Format::R8_UNORM, Cow::Borrowed(pixels)),
        TextureFormat::R8G8_UNORM => (vk::Format::R8G8_UNORM, Cow::Borrowed(pixels)),
        TextureFormat::R8G8B8A8_UNORM => (vk::Format::R8G8B8A8_UNORM, Cow::Borrowed(pixels)),
        TextureFormat::R8G8B8_UNORM => {
            let rgba: Vec<u8> = pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
                .collect();
            (vk::Format::R8G8B8A8_UNORM, Cow::Owned(rgba))
        }
    })
}

/// Command buffer slot of a pass
fn pass_slot(pass: Pass) -> usize {
    match pass {
        Pass::Shadow => 0,
        Pass::World => 1,
        Pass::Foveated => 2,
        Pass::Ui => 3,
        Pass::Present => 4,
    }
}

// ===== RESOURCES =====

struct Model {
    /// Vertices followed by the indices
    buffer: GpuBuffer,
    index_offset: u64,
}

struct Texture {
    /// Owns the memory and view the descriptor set samples
    _image: GpuImage,
    set: vk::DescriptorSet,
}

// ===== UPLOADS =====

/// Copy bytes into the start of the staging buffer
fn stage(staging: &mut GpuBuffer, bytes: &[u8]) -> Result<vk::Buffer> {
    if bytes.len() as u64 > staging.size() {
        return Err(Error::InvalidResource(format!(
            "upload of {} bytes exceeds the {} byte staging buffer",
            bytes.len(),
            staging.size()
        )));
    }
    staging.write(0, bytes)?;
    Ok(staging.buffer)
}

/// Upload an image and build its set-1 descriptor set
fn upload_texture(
    ctx: &Arc<GpuContext>,
    staging: &mut GpuBuffer,
    layouts: &DescriptorLayouts,
    samplers: &Samplers,
    data: &TextureData,
) -> Result<Texture> {
    let (format, pixels) = upload_layout(data)?;
    let source = stage(staging, &pixels)?;

    let image = GpuImage::new(
        Arc::clone(ctx),
        data.width,
        data.height,
        format,
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
        vk::ImageAspectFlags::COLOR,
    )?;
    let vk_image = image.image;
    let extent = vk::Extent3D { width: data.width, height: data.height, depth: 1 };

    ctx.one_time_submit(|device, cmd| unsafe {
        let to_transfer = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(vk_image)
            .subresource_range(full_range(vk::ImageAspectFlags::COLOR))
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_transfer],
        );

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_extent(extent);
        device.cmd_copy_buffer_to_image(cmd, source, vk_image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &[region]);

        let to_shader = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(vk_image)
            .subresource_range(full_range(vk::ImageAspectFlags::COLOR))
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::SHADER_READ);
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_shader],
        );
    })?;

    let set = layouts.allocate_texture_set()?;
    descriptors::write_texture_set(
        &ctx.device,
        set,
        image.descriptor_info(samplers.linear, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
    );
    Ok(Texture { _image: image, set })
}

pub struct VulkanGraphicsDevice {
    command_buffers: Vec<vk::CommandBuffer>,
    /// Signaled by the Present submission, waited on at the top of the next frame
    frame_fence: vk::Fence,
    /// Second fan-out of the shadow pass (the first is the shadow framebuffer's own)
    shadow_to_foveated: vk::Semaphore,

    models: SlotMap<ModelHandle, Model>,
    textures: SlotMap<TextureHandle, Texture>,
    shaders: SlotMap<ShaderHandle, Pipeline>,
    dummy: Texture,

    framebuffers: FxHashMap<Pass, Framebuffer>,
    framebuffer_sets: FxHashMap<Pass, vk::DescriptorSet>,
    frame_set: vk::DescriptorSet,

    camera_buffer: GpuBuffer,
    light_buffer: GpuBuffer,
    user_data_buffer: GpuBuffer,
    staging: GpuBuffer,

    surface: Surface,
    samplers: Samplers,
    layouts: DescriptorLayouts,
    ctx: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create the device, the swapchain and every framebuffer
    ///
    /// # Arguments
    ///
    /// * `window` - Window to present into
    /// * `config` - Window size, shadow map size and validation toggle
    pub fn new(window: &Window, config: &EngineConfig) -> Result<Self> {
        let ctx = Arc::new(GpuContext::new(window, config.enable_validation)?);

        let size = window.inner_size();
        let surface = Surface::new(Arc::clone(&ctx), size.width.max(1), size.height.max(1))?;
        let layouts = DescriptorLayouts::new(Arc::clone(&ctx))?;
        let samplers = Samplers::new(Arc::clone(&ctx))?;

        let screen = vk::Extent2D { width: config.width, height: config.height };
        let shadow = vk::Extent2D { width: config.shadow_resolution, height: config.shadow_resolution };

        let mut framebuffers = FxHashMap::default();
        framebuffers.insert(
            Pass::Shadow,
            Framebuffer::new(Arc::clone(&ctx), "Shadow", shadow, &[], Some(DEPTH_FORMAT), true)?,
        );
        framebuffers.insert(
            Pass::World,
            Framebuffer::new(Arc::clone(&ctx), "World", screen, &[COLOR_FORMAT], Some(DEPTH_FORMAT), false)?,
        );
        framebuffers.insert(
            Pass::Foveated,
            Framebuffer::new(Arc::clone(&ctx), "Foveated", screen, &[COLOR_FORMAT], Some(DEPTH_FORMAT), false)?,
        );
        framebuffers.insert(
            Pass::Ui,
            Framebuffer::new(Arc::clone(&ctx), "UI", screen, &[COLOR_FORMAT], None, false)?,
        );

        let uniform = |size: usize| {
            GpuBuffer::new(
                Arc::clone(&ctx),
                size as u64,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                MemoryLocation::CpuToGpu,
            )
        };
        let camera_buffer = uniform(std::mem::size_of::<CameraUniform>())?;
        let light_buffer = uniform(std::mem::size_of::<LightData>())?;
        let user_data_buffer = uniform(std::mem::size_of::<Mat4>())?;
        let mut staging = GpuBuffer::new(
            Arc::clone(&ctx),
            STAGING_BUFFER_SIZE,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;

        let frame_set = layouts.allocate_frame_set()?;
        let mut framebuffer_sets = FxHashMap::default();
        for pass in SAMPLED_PASSES {
            framebuffer_sets.insert(pass, layouts.allocate_texture_set()?);
        }

        let command_buffers = ctx.allocate_command_buffers(Pass::ALL.len() as u32)?;
        let (frame_fence, shadow_to_foveated) = unsafe {
            let fence = ctx
                .device
                .create_fence(&vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED), None)
                .or_init("create frame fence")?;
            let semaphore = ctx
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .or_init("create shadow-to-foveated semaphore")?;
            (fence, semaphore)
        };

        let black = TextureData::new(
            DUMMY_TEXTURE_SIZE,
            DUMMY_TEXTURE_SIZE,
            4,
            vec![0; (DUMMY_TEXTURE_SIZE * DUMMY_TEXTURE_SIZE * 4) as usize],
        );
        let dummy = upload_texture(&ctx, &mut staging, &layouts, &samplers, &black)?;

        let device = Self {
            command_buffers,
            frame_fence,
            shadow_to_foveated,
            models: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            dummy,
            framebuffers,
            framebuffer_sets,
            frame_set,
            camera_buffer,
            light_buffer,
            user_data_buffer,
            staging,
            surface,
            samplers,
            layouts,
            ctx,
        };

        device.write_frame_descriptors()?;
        for pass in SAMPLED_PASSES {
            device.write_sampled_framebuffer(pass)?;
        }

        engine_info!(
            LOG_SOURCE,
            "Framebuffers ready: screen {}x{}, shadow {}x{}, swapchain {}x{}",
            screen.width,
            screen.height,
            shadow.width,
            shadow.height,
            device.surface.extent.width,
            device.surface.extent.height
        );
        Ok(device)
    }

    #[cfg(test)]
    pub(crate) fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    fn framebuffer(&self, pass: Pass) -> Result<&Framebuffer> {
        self.framebuffers
            .get(&pass)
            .ok_or_else(|| Error::InvalidResource(format!("{:?} pass has no offscreen framebuffer", pass)))
    }

    fn framebuffer_mut(&mut self, pass: Pass) -> Result<&mut Framebuffer> {
        self.framebuffers
            .get_mut(&pass)
            .ok_or_else(|| Error::InvalidResource(format!("{:?} pass has no offscreen framebuffer", pass)))
    }

    fn shadow_map_info(&self) -> Result<vk::DescriptorImageInfo> {
        self.framebuffer(Pass::Shadow)?
            .descriptor_image_infos(self.samplers.shadow)
            .last()
            .copied()
            .ok_or_else(|| Error::InvalidResource("shadow framebuffer has no depth attachment".to_string()))
    }

    /// Point set 0 at the uniform buffers and the shadow map
    fn write_frame_descriptors(&self) -> Result<()> {
        descriptors::write_frame_set(
            &self.ctx.device,
            self.frame_set,
            self.camera_buffer.descriptor_info(),
            self.light_buffer.descriptor_info(),
            self.user_data_buffer.descriptor_info(),
            self.shadow_map_info()?,
        );
        Ok(())
    }

    /// Point the set of a World, Foveated or UI framebuffer at its color attachment
    fn write_sampled_framebuffer(&self, pass: Pass) -> Result<u64> {
        let target = self.framebuffer(pass)?;
        let set = self
            .framebuffer_sets
            .get(&pass)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("{:?} framebuffer is not sampleable", pass)))?;
        let color = target
            .descriptor_image_infos(self.samplers.linear)
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("{:?} framebuffer has no color attachment", pass)))?;
        descriptors::write_texture_set(&self.ctx.device, set, color);
        Ok(target.generation())
    }

    fn pipeline(&self, shader: ShaderHandle) -> Result<vk::Pipeline> {
        self.shaders
            .get(shader)
            .map(|p| p.pipeline)
            .ok_or_else(|| Error::InvalidResource(format!("unknown shader {:?}", shader)))
    }

    /// Set-1 descriptor set to bind for a draw, `None` to leave set 1 alone
    fn texture_set(&self, texture: BoundTexture) -> Result<Option<vk::DescriptorSet>> {
        match texture {
            BoundTexture::Unbound => Ok(None),
            BoundTexture::Dummy => Ok(Some(self.dummy.set)),
            BoundTexture::Texture(handle) => self
                .textures
                .get(handle)
                .map(|t| Some(t.set))
                .ok_or_else(|| Error::InvalidResource(format!("unknown texture {:?}", handle))),
            BoundTexture::Framebuffer(pass) => self
                .framebuffer_sets
                .get(&pass)
                .copied()
                .map(Some)
                .ok_or_else(|| Error::InvalidResource(format!("{:?} framebuffer is not sampleable", pass))),
        }
    }

    fn semaphore(&self, semaphore: FrameSemaphore) -> Result<vk::Semaphore> {
        Ok(match semaphore {
            FrameSemaphore::ShadowToWorld => self.framebuffer(Pass::Shadow)?.semaphore,
            FrameSemaphore::ShadowToFoveated => self.shadow_to_foveated,
            FrameSemaphore::WorldFinished => self.framebuffer(Pass::World)?.semaphore,
            FrameSemaphore::FoveatedFinished => self.framebuffer(Pass::Foveated)?.semaphore,
            FrameSemaphore::UiFinished => self.framebuffer(Pass::Ui)?.semaphore,
            FrameSemaphore::ImageAvailable => self.surface.image_available,
            FrameSemaphore::RenderFinished => self.surface.render_finished,
        })
    }

    /// Render pass, framebuffer and render area of a recording
    fn render_target(&self, recording: &PassRecording) -> Result<(vk::RenderPass, vk::Framebuffer, vk::Extent2D)> {
        if recording.pass == Pass::Present {
            let index = recording
                .swapchain_image
                .ok_or_else(|| Error::InvalidResource("Present pass without a swapchain image".to_string()))?;
            let framebuffer = self
                .surface
                .framebuffer(index)
                .ok_or_else(|| Error::InvalidResource(format!("swapchain image {} out of range", index)))?;
            return Ok((self.surface.render_pass, framebuffer, self.surface.extent));
        }
        let target = self.framebuffer(recording.pass)?;
        Ok((target.render_pass, target.framebuffer, target.extent()))
    }

    fn record(&self, cmd: vk::CommandBuffer, recording: &PassRecording) -> Result<()> {
        let device = &self.ctx.device;
        let layout = self.layouts.pipeline_layout;
        let (render_pass, framebuffer, extent) = self.render_target(recording)?;
        let clear_values: Vec<vk::ClearValue> = recording.clear.iter().map(clear_value_to_vk).collect();

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .or_backend("reset pass command buffer")?;
            device
                .begin_command_buffer(cmd, &vk::CommandBufferBeginInfo::default())
                .or_backend("begin pass command buffer")?;

            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(render_pass)
                .framebuffer(framebuffer)
                .render_area(vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent })
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(cmd, 0, &[viewport_to_vk(&recording.viewport)]);
            device.cmd_set_scissor(cmd, 0, &[rect_to_vk(&recording.scissor)]);

            if let Some(shader) = recording.pass_shader {
                device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline(shader)?);
            }
            if recording.bind_frame_set {
                device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    layout,
                    FRAME_SET,
                    &[self.frame_set],
                    &[],
                );
            }

            for draw in &recording.draws {
                if let Some(shader) = draw.shader {
                    device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline(shader)?);
                }
                if let Some(set) = self.texture_set(draw.texture)? {
                    device.cmd_bind_descriptor_sets(
                        cmd,
                        vk::PipelineBindPoint::GRAPHICS,
                        layout,
                        TEXTURE_SET,
                        &[set],
                        &[],
                    );
                }
                if draw.kind == DrawKind::Geometry {
                    device.cmd_push_constants(
                        cmd,
                        layout,
                        vk::ShaderStageFlags::VERTEX,
                        0,
                        bytemuck::bytes_of(&draw.transform),
                    );
                }
                let model = self
                    .models
                    .get(draw.model)
                    .ok_or_else(|| Error::InvalidResource(format!("unknown model {:?}", draw.model)))?;
                device.cmd_bind_vertex_buffers(cmd, 0, &[model.buffer.buffer], &[0]);
                device.cmd_bind_index_buffer(cmd, model.buffer.buffer, model.index_offset, vk::IndexType::UINT32);
                device.cmd_draw_indexed(cmd, draw.index_count, 1, 0, 0, 0);
            }

            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd).or_backend("end pass command buffer")?;
        }
        Ok(())
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    // ===== INFO =====

    fn device_name(&self) -> String {
        self.ctx.queues.device_name.clone()
    }

    fn used_vram(&self) -> u64 {
        self.ctx.used_vram()
    }

    fn shader_folder_name(&self) -> &'static str {
        "VK"
    }

    fn depth_mode(&self) -> DepthMode {
        DepthMode::ZeroToOne
    }

    fn framebuffer_extent(&self, pass: Pass) -> Extent2D {
        match pass {
            Pass::Present => extent_from_vk(self.surface.extent),
            _ => self
                .framebuffers
                .get(&pass)
                .map(|f| extent_from_vk(f.extent()))
                .unwrap_or_default(),
        }
    }

    fn framebuffer_generation(&self, pass: Pass) -> u64 {
        self.framebuffers.get(&pass).map_or(0, |f| f.generation())
    }

    // ===== RESOURCES =====

    fn create_model(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<ModelHandle> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(Error::InvalidResource(format!(
                "model with {} vertices and {} indices",
                vertices.len(),
                indices.len()
            )));
        }
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let mut bytes = Vec::with_capacity(vertex_bytes.len() + index_bytes.len());
        bytes.extend_from_slice(vertex_bytes);
        bytes.extend_from_slice(index_bytes);

        let source = stage(&mut self.staging, &bytes)?;
        let size = bytes.len() as u64;
        let buffer = GpuBuffer::new(
            Arc::clone(&self.ctx),
            size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        )?;
        let destination = buffer.buffer;
        self.ctx.one_time_submit(|device, cmd| unsafe {
            let region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size };
            device.cmd_copy_buffer(cmd, source, destination, &[region]);
        })?;

        engine_trace!(LOG_SOURCE, "Model uploaded: {} vertices, {} indices", vertices.len(), indices.len());
        Ok(self.models.insert(Model { buffer, index_offset: vertex_bytes.len() as u64 }))
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<TextureHandle> {
        if data.is_empty() {
            return Err(Error::InvalidResource(format!("zero-sized texture {}x{}", data.width, data.height)));
        }
        let texture = upload_texture(&self.ctx, &mut self.staging, &self.layouts, &self.samplers, data)?;
        engine_trace!(LOG_SOURCE, "Texture uploaded: {}x{}x{}", data.width, data.height, data.channels);
        Ok(self.textures.insert(texture))
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<ShaderHandle> {
        let (render_pass, color_attachments, extent) = match desc.stage {
            DrawStage::Aspect => (self.surface.render_pass, 1, self.surface.extent),
            DrawStage::World => {
                let f = self.framebuffer(Pass::World)?;
                (f.render_pass, 1, f.extent())
            }
            DrawStage::Foveated => {
                let f = self.framebuffer(Pass::Foveated)?;
                (f.render_pass, 1, f.extent())
            }
            DrawStage::Ui => {
                let f = self.framebuffer(Pass::Ui)?;
                (f.render_pass, 1, f.extent())
            }
            DrawStage::Shadow => {
                let f = self.framebuffer(Pass::Shadow)?;
                (f.render_pass, 0, f.extent())
            }
        };
        let pipeline = Pipeline::new(
            Arc::clone(&self.ctx),
            self.layouts.pipeline_layout,
            render_pass,
            color_attachments,
            extent,
            desc,
        )?;
        Ok(self.shaders.insert(pipeline))
    }

    fn destroy_model(&mut self, model: ModelHandle) -> Result<()> {
        self.models
            .remove(model)
            .map(drop)
            .ok_or_else(|| Error::InvalidResource(format!("unknown model {:?}", model)))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<()> {
        let removed = self
            .textures
            .remove(texture)
            .ok_or_else(|| Error::InvalidResource(format!("unknown texture {:?}", texture)))?;
        self.layouts.free_set(removed.set);
        Ok(())
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) -> Result<()> {
        let pipeline = self
            .shaders
            .remove(shader)
            .ok_or_else(|| Error::InvalidResource(format!("unknown shader {:?}", shader)))?;
        engine_trace!(LOG_SOURCE, "Destroying {:?} pipeline", pipeline.stage);
        Ok(())
    }

    // ===== FRAMEBUFFERS =====

    fn resize_framebuffer(&mut self, pass: Pass, extent: Extent2D) -> Result<u64> {
        if extent.width == 0 || extent.height == 0 {
            return Err(Error::InvalidResource(format!(
                "{:?} framebuffer cannot be {}x{}",
                pass, extent.width, extent.height
            )));
        }
        self.framebuffer_mut(pass)?.resize(extent_to_vk(extent))
    }

    fn write_framebuffer_descriptor(&mut self, pass: Pass) -> Result<u64> {
        let generation = match pass {
            Pass::Shadow => {
                descriptors::write_shadow_map(&self.ctx.device, self.frame_set, self.shadow_map_info()?);
                self.framebuffer(Pass::Shadow)?.generation()
            }
            _ => self.write_sampled_framebuffer(pass)?,
        };
        engine_debug!(LOG_SOURCE, "{:?} descriptor written against generation {}", pass, generation);
        Ok(generation)
    }

    // ===== FRAME =====

    fn wait_for_previous_frame(&mut self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[self.frame_fence], true, u64::MAX)
                .or_backend("wait for frame fence")?;
            self.ctx
                .device
                .reset_fences(&[self.frame_fence])
                .or_backend("reset frame fence")
        }
    }

    fn write_uniforms(&mut self, uniforms: &FrameUniforms) -> Result<()> {
        self.camera_buffer.write(0, bytemuck::bytes_of(&uniforms.camera))?;
        self.user_data_buffer.write(0, bytemuck::bytes_of(&uniforms.user_data))?;
        self.light_buffer.write(0, bytemuck::bytes_of(&uniforms.light))
    }

    fn acquire_next_image(&mut self) -> Result<u32> {
        self.surface.acquire()
    }

    fn submit_pass(&mut self, recording: &PassRecording, sync: &PassSync) -> Result<()> {
        let cmd = self.command_buffers[pass_slot(recording.pass)];
        self.record(cmd, recording)?;

        let waits = sync
            .waits
            .iter()
            .map(|w| self.semaphore(w.semaphore))
            .collect::<Result<Vec<_>>>()?;
        let stages: Vec<vk::PipelineStageFlags> = sync.waits.iter().map(|w| wait_stage_to_vk(w.stage)).collect();
        let signals = sync
            .signals
            .iter()
            .map(|&s| self.semaphore(s))
            .collect::<Result<Vec<_>>>()?;
        let command_buffers = [cmd];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&waits)
            .wait_dst_stage_mask(&stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signals);
        let fence = if sync.signal_frame_fence { self.frame_fence } else { vk::Fence::null() };

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                .or_backend(&format!("submit {:?} pass", recording.pass))
        }
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        self.surface.present(image_index)
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle().or_backend("wait for device idle") }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
        self.shaders.clear();
        self.textures.clear();
        self.models.clear();
        self.ctx.free_command_buffers(&self.command_buffers);
        unsafe {
            self.ctx.device.destroy_semaphore(self.shadow_to_foveated, None);
            self.ctx.device.destroy_fence(self.frame_fence, None);
        }
        // Remaining fields release their own objects; the context goes last
    }
}

#[cfg(test)]
#[path = "vulkan_graphics_device_tests.rs"]
mod tests;
