/// RenderBackend trait - the Frontend's view of the rendering pipeline
///
/// Exactly the operations the Frontend drives: per-frame draw, resource
/// loading and deletion, and the handful of composite resources the passes
/// need. `FoveatedRenderer` is the implementation; any other backend can be
/// substituted without touching the Frontend.

use glam::{Mat4, Vec2};
use crate::error::Result;
use crate::graphics_device::{
    DepthMode, DrawStage, Extent2D, ModelHandle, ShaderHandle, TextureData, TextureHandle, Vertex,
};
use crate::renderer::{DirectionalLight, Drawable, RenderSettings};

/// Everything one call to [`RenderBackend::draw`] consumes
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Camera view (identity when there is no camera)
    pub view: Mat4,
    /// Camera projection (identity when there is no camera)
    pub projection: Mat4,
    /// Free-form matrix exposed to shaders at set 0, binding 7
    pub user_data: Mat4,
    pub world: &'a [Drawable],
    pub ui: &'a [Drawable],
    /// Diagnostic drawables composited in the Present pass, unaffected by `draw_ui`
    pub overlay: &'a [Drawable],
    pub light: DirectionalLight,
    /// Normalized gaze point of this frame
    pub gaze: Vec2,
}

impl FrameInput<'static> {
    /// Frame with no camera and no drawables, gaze at the center
    pub fn empty() -> Self {
        FrameInput {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            user_data: Mat4::IDENTITY,
            world: &[],
            ui: &[],
            overlay: &[],
            light: DirectionalLight::default(),
            gaze: Vec2::splat(0.5),
        }
    }
}

pub trait RenderBackend {
    // ===== FRAME =====

    /// Render and present one frame
    ///
    /// Any error is a GPU failure and is meant to be fatal to the caller.
    fn draw(&mut self, frame: &FrameInput) -> Result<()>;

    /// Release every GPU resource; a second call does nothing
    fn shutdown(&mut self) -> Result<()>;

    fn is_shut_down(&self) -> bool;

    // ===== RESOURCES =====

    fn load_model(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<ModelHandle>;

    /// Upload a texture; a zero-sized image yields `None` (no texture set)
    fn load_texture(&mut self, data: &TextureData) -> Result<Option<TextureHandle>>;

    /// Build a pipeline from compiled vertex and fragment code
    ///
    /// # Arguments
    ///
    /// * `vertex_code` - Compiled vertex shader
    /// * `fragment_code` - Compiled fragment shader
    /// * `stage` - Render pass the pipeline is built against
    fn create_shader(&mut self, vertex_code: &[u8], fragment_code: &[u8], stage: DrawStage) -> Result<ShaderHandle>;

    fn delete_model(&mut self, model: ModelHandle) -> Result<()>;

    fn delete_texture(&mut self, texture: TextureHandle) -> Result<()>;

    fn delete_shader(&mut self, shader: ShaderHandle) -> Result<()>;

    // ===== COMPOSITE RESOURCES =====

    /// Full-screen quad used to draw one framebuffer into another
    fn set_framebuffer_model(&mut self, model: ModelHandle, num_faces: u32);

    /// Shader drawing framebuffer quads; only `Ui` and `Aspect` have one
    fn set_framebuffer_shader(&mut self, shader: ShaderHandle, stage: DrawStage) -> Result<()>;

    /// Depth-only pipeline of the shadow pass
    fn set_shadow_shader(&mut self, shader: ShaderHandle);

    /// Quad that clears the foveated square before the scene is drawn
    fn set_foveated_clear_shader(&mut self, shader: ShaderHandle);

    // ===== INFO =====

    fn shader_folder_name(&self) -> &'static str;

    fn depth_mode(&self) -> DepthMode;

    fn device_name(&self) -> String;

    fn used_vram(&self) -> u64;

    /// Size of the presented image
    fn screen_extent(&self) -> Extent2D;

    fn settings(&self) -> &RenderSettings;

    fn settings_mut(&mut self) -> &mut RenderSettings;
}
