/// AssetSource trait - the decoder boundary of the Frontend
///
/// Mesh import, image decoding and font rasterization happen behind this
/// trait. Paths are relative to the data folder; the Frontend resolves
/// shader paths to `shaders/<backend folder>/<file>` before asking.

use crate::error::Result;
use crate::frontend::font::FontData;
use crate::frontend::model_tree::ModelNode;
use crate::graphics_device::{TextureData, Vertex};

/// One decoded mesh: triangle list indices into its own vertices
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn num_faces(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }
}

/// Decoded model file: its meshes and the node hierarchy referencing them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelData {
    pub meshes: Vec<MeshData>,
    pub root: ModelNode,
}

pub trait AssetSource {
    /// Decode a model file
    fn load_model(&mut self, path: &str) -> Result<ModelData>;

    /// Decode an image, rows bottom to top
    fn load_image(&mut self, path: &str) -> Result<TextureData>;

    /// Rasterize a font at [`crate::frontend::FONT_SIZE`] pixels
    fn load_font(&mut self, path: &str) -> Result<FontData>;

    /// Raw bytes of a compiled shader
    fn read_shader(&mut self, path: &str) -> Result<Vec<u8>>;
}
