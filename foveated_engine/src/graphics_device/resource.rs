/// GPU resource handles and the data handed to the device at load time
///
/// Handles are slotmap keys: the device owns the GPU objects, callers only
/// hold opaque keys that become invalid once the resource is destroyed.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use crate::error::{Error, Result};

slotmap::new_key_type! {
    /// Vertex + index buffer pair
    pub struct ModelHandle;
    /// Sampled 2D texture with its descriptor set
    pub struct TextureHandle;
    /// Graphics pipeline bound to one draw stage
    pub struct ShaderHandle;
}

// ===== VERTEX =====

/// Interleaved vertex, shared by every pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
    pub color: Vec3,
}

impl Vertex {
    /// Size of one vertex in bytes
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Byte offsets of (position, normal, tex_coord, color), locations 0..=3
    pub const ATTRIBUTE_OFFSETS: [u32; 4] = [0, 12, 24, 32];

    pub fn new(position: Vec3, normal: Vec3, tex_coord: Vec2, color: Vec3) -> Self {
        Self { position, normal, tex_coord, color }
    }
}

// ===== TEXTURE DATA =====

/// Pixel layout of an uploaded texture, chosen from the channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8_UNORM,
    R8G8B8A8_UNORM,
}

/// Decoded image bytes, tightly packed rows
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, channels: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, channels, pixels }
    }

    /// A zero-sized image has no GPU counterpart
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes the image occupies once uploaded
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.channels as u64
    }

    /// Device format for the channel count (anything unknown falls back to R8)
    pub fn format(&self) -> TextureFormat {
        match self.channels {
            2 => TextureFormat::R8G8_UNORM,
            3 => TextureFormat::R8G8B8_UNORM,
            4 => TextureFormat::R8G8B8A8_UNORM,
            _ => TextureFormat::R8_UNORM,
        }
    }

    /// Reject pixel buffers that are shorter than width * height * channels
    pub fn validate(&self) -> Result<()> {
        if (self.pixels.len() as u64) < self.byte_size() {
            return Err(Error::InvalidResource(format!(
                "texture {}x{}x{} needs {} bytes, got {}",
                self.width,
                self.height,
                self.channels,
                self.byte_size(),
                self.pixels.len()
            )));
        }
        Ok(())
    }
}

// ===== SHADERS =====

/// Which render pass a pipeline is built against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawStage {
    World,
    Ui,
    Aspect,
    Shadow,
    Foveated,
}

impl DrawStage {
    /// Stable index used in shader cache keys
    pub fn index(&self) -> u32 {
        match self {
            DrawStage::World => 0,
            DrawStage::Ui => 1,
            DrawStage::Aspect => 2,
            DrawStage::Shadow => 3,
            DrawStage::Foveated => 4,
        }
    }
}

/// Clip-space depth convention of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    ZeroToOne,
    NegativeOneToOne,
}

/// SPIR-V (or equivalent) code for one pipeline
#[derive(Debug, Clone, Copy)]
pub struct ShaderDesc<'a> {
    pub vertex_code: &'a [u8],
    pub fragment_code: &'a [u8],
    pub stage: DrawStage,
}

impl<'a> ShaderDesc<'a> {
    /// SPIR-V words are 4 bytes; anything else cannot be a valid module
    pub fn validate(&self) -> Result<()> {
        for (kind, code) in [("vertex", self.vertex_code), ("fragment", self.fragment_code)] {
            if code.is_empty() || code.len() % 4 != 0 {
                return Err(Error::InvalidResource(format!(
                    "{} shader code length {} is not a multiple of 4",
                    kind,
                    code.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
