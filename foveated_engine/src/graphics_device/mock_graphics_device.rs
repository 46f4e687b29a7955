/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Every call is recorded as a string event in a shared [`MockState`], so a
/// test can keep a handle to the state after the device has been moved into
/// (or dropped by) the orchestrator.

#[cfg(test)]
use std::sync::{Arc, Mutex, MutexGuard};
#[cfg(test)]
use rustc_hash::FxHashMap;
#[cfg(test)]
use slotmap::SlotMap;

#[cfg(test)]
use crate::error::{Error, Result};
#[cfg(test)]
use crate::graphics_device::{
    DepthMode, Extent2D, FrameUniforms, GraphicsDevice, ModelHandle, Pass, PassRecording,
    PassSync, ShaderDesc, ShaderHandle, TextureData, TextureHandle, Vertex, DrawStage,
};
#[cfg(test)]
use crate::engine_bail;

// ============================================================================
// Recorded state
// ============================================================================

/// One recorded `submit_pass` call
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MockSubmission {
    pub recording: PassRecording,
    pub sync: PassSync,
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockState {
    /// Every device call in order ("submit:World", "resize:World:800x450", ...)
    pub events: Vec<String>,
    pub submissions: Vec<MockSubmission>,
    pub uniforms: Vec<FrameUniforms>,
    pub rebuilds: usize,
    pub descriptor_writes: usize,
    pub live_models: usize,
    pub live_textures: usize,
    pub live_shaders: usize,
    pub dropped: bool,
}

#[cfg(test)]
impl MockState {
    /// Submissions of one pass
    pub fn submissions_of(&self, pass: Pass) -> Vec<&MockSubmission> {
        self.submissions.iter().filter(|s| s.recording.pass == pass).collect()
    }

    /// Pass order of all submissions
    pub fn submitted_passes(&self) -> Vec<Pass> {
        self.submissions.iter().map(|s| s.recording.pass).collect()
    }

    pub fn count_events(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }
}

// ============================================================================
// Mock device
// ============================================================================

#[cfg(test)]
pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockState>>,
    models: SlotMap<ModelHandle, u32>,
    textures: SlotMap<TextureHandle, Extent2D>,
    shaders: SlotMap<ShaderHandle, DrawStage>,
    extents: FxHashMap<Pass, Extent2D>,
    generations: FxHashMap<Pass, u64>,
    next_image: u32,
    /// Submitting this pass fails with a BackendError
    pub fail_on_submit: Option<Pass>,
}

#[cfg(test)]
impl MockGraphicsDevice {
    /// Device whose offscreen targets (and swapchain) are `width` x `height`
    pub fn new(width: u32, height: u32, shadow_size: u32) -> Self {
        let mut extents = FxHashMap::default();
        for pass in Pass::ALL {
            extents.insert(pass, Extent2D::new(width, height));
        }
        extents.insert(Pass::Shadow, Extent2D::new(shadow_size, shadow_size));

        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            models: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            extents,
            generations: FxHashMap::default(),
            next_image: 0,
            fail_on_submit: None,
        }
    }

    /// Shared handle to the recorded state
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    /// Bump a framebuffer generation without rewriting its descriptor
    pub fn force_generation(&mut self, pass: Pass, generation: u64) {
        self.generations.insert(pass, generation);
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn event(&self, event: String) {
        self.lock().events.push(event);
    }
}

#[cfg(test)]
impl GraphicsDevice for MockGraphicsDevice {
    fn device_name(&self) -> String {
        "Mock Device".to_string()
    }

    fn used_vram(&self) -> u64 {
        (self.models.len() + self.textures.len()) as u64 * 1024
    }

    fn shader_folder_name(&self) -> &'static str {
        "MOCK"
    }

    fn depth_mode(&self) -> DepthMode {
        DepthMode::ZeroToOne
    }

    fn framebuffer_extent(&self, pass: Pass) -> Extent2D {
        self.extents.get(&pass).copied().unwrap_or_default()
    }

    fn framebuffer_generation(&self, pass: Pass) -> u64 {
        self.generations.get(&pass).copied().unwrap_or(0)
    }

    fn create_model(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<ModelHandle> {
        if vertices.is_empty() {
            return Err(Error::InvalidResource("model without vertices".to_string()));
        }
        let handle = self.models.insert(indices.len() as u32);
        let mut state = self.lock();
        state.live_models += 1;
        state.events.push(format!("create_model:{}:{}", vertices.len(), indices.len()));
        Ok(handle)
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<TextureHandle> {
        data.validate()?;
        let handle = self.textures.insert(Extent2D::new(data.width, data.height));
        let mut state = self.lock();
        state.live_textures += 1;
        state.events.push(format!("create_texture:{}x{}", data.width, data.height));
        Ok(handle)
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<ShaderHandle> {
        desc.validate()?;
        let handle = self.shaders.insert(desc.stage);
        let mut state = self.lock();
        state.live_shaders += 1;
        state.events.push(format!("create_shader:{:?}", desc.stage));
        Ok(handle)
    }

    fn destroy_model(&mut self, model: ModelHandle) -> Result<()> {
        if self.models.remove(model).is_none() {
            engine_bail!("foveated::mock", "destroy_model: stale handle");
        }
        let mut state = self.lock();
        state.live_models -= 1;
        state.events.push("destroy_model".to_string());
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<()> {
        if self.textures.remove(texture).is_none() {
            engine_bail!("foveated::mock", "destroy_texture: stale handle");
        }
        let mut state = self.lock();
        state.live_textures -= 1;
        state.events.push("destroy_texture".to_string());
        Ok(())
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) -> Result<()> {
        if self.shaders.remove(shader).is_none() {
            engine_bail!("foveated::mock", "destroy_shader: stale handle");
        }
        let mut state = self.lock();
        state.live_shaders -= 1;
        state.events.push("destroy_shader".to_string());
        Ok(())
    }

    fn resize_framebuffer(&mut self, pass: Pass, extent: Extent2D) -> Result<u64> {
        self.extents.insert(pass, extent);
        let generation = self.framebuffer_generation(pass) + 1;
        self.generations.insert(pass, generation);
        let mut state = self.lock();
        state.rebuilds += 1;
        state.events.push(format!("resize:{:?}:{}x{}", pass, extent.width, extent.height));
        Ok(generation)
    }

    fn write_framebuffer_descriptor(&mut self, pass: Pass) -> Result<u64> {
        let generation = self.framebuffer_generation(pass);
        let mut state = self.lock();
        state.descriptor_writes += 1;
        state.events.push(format!("descriptor:{:?}", pass));
        Ok(generation)
    }

    fn wait_for_previous_frame(&mut self) -> Result<()> {
        self.event("wait_fence".to_string());
        Ok(())
    }

    fn write_uniforms(&mut self, uniforms: &FrameUniforms) -> Result<()> {
        let mut state = self.lock();
        state.uniforms.push(*uniforms);
        state.events.push("uniforms".to_string());
        Ok(())
    }

    fn acquire_next_image(&mut self) -> Result<u32> {
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % 3;
        self.event(format!("acquire:{}", index));
        Ok(index)
    }

    fn submit_pass(&mut self, recording: &PassRecording, sync: &PassSync) -> Result<()> {
        if self.fail_on_submit == Some(recording.pass) {
            engine_bail!("foveated::mock", "submit {:?} failed: VK_ERROR_DEVICE_LOST", recording.pass);
        }
        let mut state = self.lock();
        state.events.push(format!("submit:{:?}", recording.pass));
        state.submissions.push(MockSubmission { recording: recording.clone(), sync: *sync });
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        self.event(format!("present:{}", image_index));
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.event("wait_idle".to_string());
        Ok(())
    }
}

#[cfg(test)]
impl Drop for MockGraphicsDevice {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.dropped = true;
        state.events.push("drop".to_string());
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
