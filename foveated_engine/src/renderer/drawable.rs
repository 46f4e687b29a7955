/// Drawable - the unit of one draw call, rebuilt every frame

use glam::Mat4;
use crate::graphics_device::{ModelHandle, ShaderHandle, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawable {
    pub shader: ShaderHandle,
    pub model: ModelHandle,
    /// `None` keeps the previously bound texture (dummy in the shadow pass)
    pub texture: Option<TextureHandle>,
    /// Triangle count; the draw issues `num_faces * 3` indices
    pub num_faces: u32,
    pub transform: Mat4,
}

impl Drawable {
    pub fn index_count(&self) -> u32 {
        self.num_faces * 3
    }
}
