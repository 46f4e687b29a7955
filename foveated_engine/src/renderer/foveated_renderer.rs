//! FoveatedRenderer - the five-pass frame orchestrator
//!
//! Each frame:
//! 1. wait for the previous frame's fence;
//! 2. rebuild the World framebuffer if the base scale changed, and rewrite
//!    its descriptor before anything references it;
//! 3. write the camera, user-data and light uniforms;
//! 4. submit Shadow, World, Foveated and Ui with the fixed semaphore graph;
//! 5. acquire a swapchain image, submit Present (which signals the fence)
//!    and queue presentation.
//!
//! GPU errors are never retried. They propagate to the caller, which is
//! expected to terminate (see [`crate::foveated::fatal`]).

use crate::error::{Error, Result};
use crate::graphics_device::{
    DepthMode, DrawStage, Extent2D, GraphicsDevice, ModelHandle, Pass, PassRecording, PassSync,
    ShaderDesc, ShaderHandle, TextureData, TextureHandle, Vertex,
};
use crate::renderer::light::frame_uniforms;
use crate::renderer::passes::{self, CompositeResources};
use crate::renderer::resolution::{scaled_extent, ResolutionScale};
use crate::renderer::{FrameInput, RenderBackend, RenderSettings};
use crate::{engine_debug, engine_err, engine_info, engine_trace};

pub struct FoveatedRenderer<D: GraphicsDevice> {
    /// `None` once shut down
    device: Option<D>,
    settings: RenderSettings,
    /// Scale the World framebuffer was last built with
    world_scale: ResolutionScale,
    /// Framebuffer generation the World descriptor was written against
    world_descriptor_generation: u64,
    composite: CompositeResources,
    frame_count: u64,
}

impl<D: GraphicsDevice> FoveatedRenderer<D> {
    /// Wrap a device whose framebuffers are all at full size
    pub fn new(device: D, settings: RenderSettings) -> Self {
        let world_descriptor_generation = device.framebuffer_generation(Pass::World);
        engine_info!(
            "foveated::renderer",
            "Renderer ready on '{}' ({}x{})",
            device.device_name(),
            device.framebuffer_extent(Pass::Present).width,
            device.framebuffer_extent(Pass::Present).height
        );
        Self {
            device: Some(device),
            settings,
            world_scale: ResolutionScale::default(),
            world_descriptor_generation,
            composite: CompositeResources::default(),
            frame_count: 0,
        }
    }

    /// The wrapped device, until shutdown
    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.device.as_mut()
    }

    /// Frames drawn so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Scale the World framebuffer currently has
    pub fn world_scale(&self) -> f32 {
        self.world_scale.current()
    }

    fn live_device(&mut self) -> Result<&mut D> {
        self.device
            .as_mut()
            .ok_or_else(|| Error::BackendError("renderer is shut down".to_string()))
    }

    /// Rebuild the World framebuffer when the effective scale changed
    ///
    /// Only called after the previous frame's fence, so no submitted work
    /// can still reference the old attachment.
    fn apply_resolution_scale(&mut self) -> Result<()> {
        let requested = self.settings.effective_base_res_scale();
        if !self.world_scale.needs_rebuild(requested) {
            return Ok(());
        }
        let device = self.live_device()?;

        let old = device.framebuffer_extent(Pass::World);
        let extent = scaled_extent(device.framebuffer_extent(Pass::Foveated), requested);
        engine_debug!(
            "foveated::renderer",
            "Rebuilding World framebuffer {}x{} -> {}x{} (scale {:.3})",
            old.width,
            old.height,
            extent.width,
            extent.height,
            requested
        );
        device.resize_framebuffer(Pass::World, extent)?;
        let generation = device.write_framebuffer_descriptor(Pass::World)?;

        self.world_descriptor_generation = generation;
        self.world_scale.commit(requested);
        Ok(())
    }

    /// Refuse to composite a World framebuffer the descriptor does not describe
    fn check_world_generation(&self, device: &D) -> Result<()> {
        let live = device.framebuffer_generation(Pass::World);
        debug_assert_eq!(
            live, self.world_descriptor_generation,
            "World descriptor is stale: written against generation {}, framebuffer is at {}",
            self.world_descriptor_generation, live
        );
        if live != self.world_descriptor_generation {
            return Err(engine_err!(
                "foveated::renderer",
                "World descriptor is stale: written against generation {}, framebuffer is at {}",
                self.world_descriptor_generation,
                live
            ));
        }
        Ok(())
    }
}

fn submit<D: GraphicsDevice>(device: &mut D, recording: &PassRecording) -> Result<()> {
    engine_trace!(
        "foveated::renderer",
        "Submitting {:?}: {} draws",
        recording.pass,
        recording.draws.len()
    );
    device.submit_pass(recording, &PassSync::for_pass(recording.pass))
}

impl<D: GraphicsDevice> RenderBackend for FoveatedRenderer<D> {
    fn draw(&mut self, frame: &FrameInput) -> Result<()> {
        let composite = self.composite.resolve()?;

        self.live_device()?.wait_for_previous_frame()?;
        self.apply_resolution_scale()?;

        let settings = self.settings;
        let uniforms = frame_uniforms(frame.view, frame.projection, frame.user_data, &frame.light);

        let device = self.live_device()?;
        device.write_uniforms(&uniforms)?;

        let shadow = passes::record_shadow(frame, device.framebuffer_extent(Pass::Shadow), &composite);
        submit(device, &shadow)?;

        let world = passes::record_world(frame, device.framebuffer_extent(Pass::World));
        submit(device, &world)?;

        let foveated = passes::record_foveated(
            frame,
            device.framebuffer_extent(Pass::Foveated),
            &settings,
            &composite,
        );
        submit(device, &foveated)?;

        let ui = passes::record_ui(frame, device.framebuffer_extent(Pass::Ui), &settings, &composite);
        if let Some(device) = self.device.as_ref() {
            self.check_world_generation(device)?;
        }
        let device = self.live_device()?;
        submit(device, &ui)?;

        let image_index = device.acquire_next_image()?;
        let present = passes::record_present(
            frame,
            device.framebuffer_extent(Pass::Present),
            &composite,
            image_index,
        );
        submit(device, &present)?;
        device.present(image_index)?;

        self.frame_count += 1;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(mut device) = self.device.take() else {
            return Ok(());
        };
        device.wait_idle()?;
        engine_info!(
            "foveated::renderer",
            "Renderer shut down after {} frames",
            self.frame_count
        );
        drop(device);
        Ok(())
    }

    fn is_shut_down(&self) -> bool {
        self.device.is_none()
    }

    fn load_model(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<ModelHandle> {
        self.live_device()?.create_model(vertices, indices)
    }

    fn load_texture(&mut self, data: &TextureData) -> Result<Option<TextureHandle>> {
        if data.is_empty() {
            engine_debug!(
                "foveated::renderer",
                "Zero-sized texture {}x{}: no texture set",
                data.width,
                data.height
            );
            return Ok(None);
        }
        self.live_device()?.create_texture(data).map(Some)
    }

    fn create_shader(&mut self, vertex_code: &[u8], fragment_code: &[u8], stage: DrawStage) -> Result<ShaderHandle> {
        let desc = ShaderDesc { vertex_code, fragment_code, stage };
        self.live_device()?.create_shader(&desc)
    }

    fn delete_model(&mut self, model: ModelHandle) -> Result<()> {
        let device = self.live_device()?;
        device.wait_idle()?;
        device.destroy_model(model)
    }

    fn delete_texture(&mut self, texture: TextureHandle) -> Result<()> {
        let device = self.live_device()?;
        device.wait_idle()?;
        device.destroy_texture(texture)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) -> Result<()> {
        let device = self.live_device()?;
        device.wait_idle()?;
        device.destroy_shader(shader)
    }

    fn set_framebuffer_model(&mut self, model: ModelHandle, num_faces: u32) {
        self.composite.framebuffer_model = Some((model, num_faces));
    }

    fn set_framebuffer_shader(&mut self, shader: ShaderHandle, stage: DrawStage) -> Result<()> {
        match stage {
            DrawStage::Ui => self.composite.ui_shader = Some(shader),
            DrawStage::Aspect => self.composite.aspect_shader = Some(shader),
            other => {
                crate::engine_error!(
                    "foveated::renderer",
                    "Draw stage {:?} has no associated framebuffer",
                    other
                );
                return Err(Error::InvalidResource(format!(
                    "draw stage {:?} has no associated framebuffer",
                    other
                )));
            }
        }
        Ok(())
    }

    fn set_shadow_shader(&mut self, shader: ShaderHandle) {
        self.composite.shadow_shader = Some(shader);
    }

    fn set_foveated_clear_shader(&mut self, shader: ShaderHandle) {
        self.composite.foveated_clear_shader = Some(shader);
    }

    fn shader_folder_name(&self) -> &'static str {
        self.device.as_ref().map_or("", |d| d.shader_folder_name())
    }

    fn depth_mode(&self) -> DepthMode {
        self.device.as_ref().map_or(DepthMode::ZeroToOne, |d| d.depth_mode())
    }

    fn device_name(&self) -> String {
        self.device.as_ref().map(|d| d.device_name()).unwrap_or_default()
    }

    fn used_vram(&self) -> u64 {
        self.device.as_ref().map_or(0, |d| d.used_vram())
    }

    fn screen_extent(&self) -> Extent2D {
        self.device
            .as_ref()
            .map(|d| d.framebuffer_extent(Pass::Present))
            .unwrap_or_default()
    }

    fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }
}

#[cfg(test)]
#[path = "foveated_renderer_tests.rs"]
mod tests;
