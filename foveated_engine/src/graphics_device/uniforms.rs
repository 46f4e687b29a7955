/// Per-frame uniform payloads, laid out exactly as the shaders read them

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Set 0, binding 0
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: Mat4,
    pub projection: Mat4,
}

/// Set 0, binding 1
///
/// All colors and the direction are padded to vec4 for std140.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightData {
    pub direction: Vec4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub light_space: Mat4,
}

/// Everything written into the persistently mapped uniform buffers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub camera: CameraUniform,
    /// Set 0, binding 7
    pub user_data: Mat4,
    pub light: LightData,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            camera: CameraUniform { view: Mat4::IDENTITY, projection: Mat4::IDENTITY },
            user_data: Mat4::IDENTITY,
            light: LightData::zeroed(),
        }
    }
}
