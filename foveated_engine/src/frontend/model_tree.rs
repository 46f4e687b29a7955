//! Hierarchical model representation and its flattening into Drawables.
//!
//! # Hierarchy
//!
//! ```text
//! ModelTree
//! ├── shader (assigned by the caller, none after loading)
//! ├── meshes[]            → Mesh (GPU model + texture + face count)
//! └── root: ModelNode
//!     ├── transform (local)
//!     ├── mesh_indices[]  → indices into meshes[]
//!     └── children[]      → ModelNode ...
//! ```
//!
//! Flattening is depth-first: a node's meshes are emitted with
//! `parent * node.transform`, then its children recurse with that same
//! accumulated matrix as their parent.

use glam::Mat4;
use crate::engine_warn;
use crate::graphics_device::{ModelHandle, ShaderHandle, TextureHandle};
use crate::renderer::Drawable;

// ============================================================================
// MODEL NODE
// ============================================================================

/// One node of the model hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    /// Transform relative to the parent node
    pub transform: Mat4,
    /// Meshes drawn at this node, as indices into [`ModelTree::meshes`]
    pub mesh_indices: Vec<usize>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    /// Leaf node drawing `mesh_indices` with a local transform
    pub fn new(transform: Mat4, mesh_indices: Vec<usize>) -> Self {
        Self { transform, mesh_indices, children: Vec::new() }
    }

    pub fn with_child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for ModelNode {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Vec::new())
    }
}

// ============================================================================
// MESH
// ============================================================================

/// A GPU-resident mesh of a model tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mesh {
    pub model: ModelHandle,
    pub texture: Option<TextureHandle>,
    pub num_faces: u32,
}

// ============================================================================
// MODEL TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ModelTree {
    pub shader: Option<ShaderHandle>,
    pub root: ModelNode,
    pub meshes: Vec<Mesh>,
}

impl ModelTree {
    pub fn new(root: ModelNode, meshes: Vec<Mesh>) -> Self {
        Self { shader: None, root, meshes }
    }

    pub fn set_shader(&mut self, shader: ShaderHandle) {
        self.shader = Some(shader);
    }

    /// Texture every mesh of the tree
    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        for mesh in &mut self.meshes {
            mesh.texture = texture;
        }
    }

    /// Flatten the tree into `out`, `root_transform` applied above the root node
    ///
    /// A tree without a shader draws nothing. Mesh indices past the end of
    /// [`ModelTree::meshes`] are skipped.
    pub fn flatten_into(&self, root_transform: Mat4, out: &mut Vec<Drawable>) {
        let Some(shader) = self.shader else {
            engine_warn!("foveated::frontend", "Model tree has no shader, nothing drawn");
            return;
        };
        self.flatten_node(&self.root, root_transform, shader, out);
    }

    /// Flattened copy of the tree, see [`ModelTree::flatten_into`]
    pub fn flatten(&self, root_transform: Mat4) -> Vec<Drawable> {
        let mut out = Vec::new();
        self.flatten_into(root_transform, &mut out);
        out
    }

    fn flatten_node(&self, node: &ModelNode, parent: Mat4, shader: ShaderHandle, out: &mut Vec<Drawable>) {
        let transform = parent * node.transform;

        for &index in &node.mesh_indices {
            let Some(mesh) = self.meshes.get(index) else {
                engine_warn!(
                    "foveated::frontend",
                    "Mesh index {} out of range ({} meshes)",
                    index,
                    self.meshes.len()
                );
                continue;
            };
            out.push(Drawable {
                shader,
                model: mesh.model,
                texture: mesh.texture,
                num_faces: mesh.num_faces,
                transform,
            });
        }

        for child in &node.children {
            self.flatten_node(child, transform, shader, out);
        }
    }
}

#[cfg(test)]
#[path = "model_tree_tests.rs"]
mod tests;
