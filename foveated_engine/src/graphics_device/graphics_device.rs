/// GraphicsDevice trait - the low-level seam between the pass orchestrator
/// and a concrete GPU API
///
/// The orchestrator decides *what* each pass draws and in which order; the
/// device owns every GPU object (framebuffers, pipelines, descriptor sets,
/// uniform buffers, swapchain) and turns a [`PassRecording`] into a command
/// buffer submission with the given [`PassSync`].

use crate::error::Result;
use crate::graphics_device::{
    DepthMode, Extent2D, FrameUniforms, ModelHandle, Pass, PassRecording, PassSync,
    ShaderDesc, ShaderHandle, TextureData, TextureHandle, Vertex,
};

/// Low-level GPU device
///
/// Implemented by backend crates (e.g. `VulkanGraphicsDevice`) and by the
/// in-crate mock used for tests.
pub trait GraphicsDevice {
    // ===== INFO =====

    /// Name of the selected physical device
    fn device_name(&self) -> String;

    /// Bytes currently allocated from device memory
    fn used_vram(&self) -> u64;

    /// Folder under `shaders/` holding this backend's compiled shaders
    fn shader_folder_name(&self) -> &'static str;

    fn depth_mode(&self) -> DepthMode;

    /// Current size of a pass target (`Present` reports the swapchain extent)
    fn framebuffer_extent(&self, pass: Pass) -> Extent2D;

    /// Generation of a pass framebuffer, increased on every rebuild
    fn framebuffer_generation(&self, pass: Pass) -> u64;

    // ===== RESOURCES =====

    /// Upload vertices and indices into one device-local buffer
    ///
    /// # Arguments
    ///
    /// * `vertices` - Interleaved vertex data
    /// * `indices` - 32-bit indices, stored right after the vertices
    fn create_model(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<ModelHandle>;

    /// Upload a non-empty image and build its sampler descriptor set
    fn create_texture(&mut self, data: &TextureData) -> Result<TextureHandle>;

    /// Build a pipeline for the render pass selected by `desc.stage`
    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<ShaderHandle>;

    fn destroy_model(&mut self, model: ModelHandle) -> Result<()>;

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<()>;

    fn destroy_shader(&mut self, shader: ShaderHandle) -> Result<()>;

    // ===== FRAMEBUFFERS =====

    /// Tear down and set up a pass framebuffer at a new size
    ///
    /// # Returns
    ///
    /// The new generation of the framebuffer
    fn resize_framebuffer(&mut self, pass: Pass, extent: Extent2D) -> Result<u64>;

    /// Rewrite the descriptor that samples a pass's first color attachment
    ///
    /// # Returns
    ///
    /// The framebuffer generation the descriptor now refers to
    fn write_framebuffer_descriptor(&mut self, pass: Pass) -> Result<u64>;

    // ===== FRAME =====

    /// Block until the previous frame's fence signals, then reset it
    fn wait_for_previous_frame(&mut self) -> Result<()>;

    /// Copy the frame uniforms into the mapped uniform buffers
    fn write_uniforms(&mut self, uniforms: &FrameUniforms) -> Result<()>;

    /// Acquire the next swapchain image, signaling `ImageAvailable`
    fn acquire_next_image(&mut self) -> Result<u32>;

    /// Record and submit one pass with its waits and signals
    fn submit_pass(&mut self, recording: &PassRecording, sync: &PassSync) -> Result<()>;

    /// Queue presentation of an image once `RenderFinished` signals
    fn present(&mut self, image_index: u32) -> Result<()>;

    /// Block until the device has no pending work
    fn wait_idle(&mut self) -> Result<()>;
}
