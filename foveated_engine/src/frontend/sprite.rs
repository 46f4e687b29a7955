/// Screen-space sprite placement and UI draw ordering

use glam::{Mat4, Quat, Vec2, Vec3};
use crate::graphics_device::DepthMode;
use crate::renderer::Drawable;

/// Highest UI layer; layers above it land in front of the near plane
pub const MAX_UI_LAYER: u32 = 50;

const FURTHEST_UI_DEPTH: f32 = 0.7;
const CLOSEST_UI_DEPTH: f32 = 0.2;

/// Placement of a sprite or glyph on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    /// Degrees, counter-clockwise around the view axis
    pub rotation: f32,
    pub scale: Vec2,
    /// 0 is the back, [`MAX_UI_LAYER`] the front
    pub layer: u32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self { position: Vec2::ZERO, rotation: 0.0, scale: Vec2::ONE, layer: 0 }
    }
}

/// How queued UI drawables are ordered before submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiOrder {
    /// In the order they were queued
    #[default]
    Submission,
    /// Furthest depth first
    BackToFront,
}

/// Depth of a UI layer, interpolated from the far end to the near end
pub fn sprite_depth(layer: u32, depth_mode: DepthMode) -> f32 {
    match depth_mode {
        DepthMode::ZeroToOne => {
            let t = layer as f32 / MAX_UI_LAYER as f32;
            t * (CLOSEST_UI_DEPTH - FURTHEST_UI_DEPTH) + FURTHEST_UI_DEPTH
        }
        DepthMode::NegativeOneToOne => 0.5,
    }
}

/// Model matrix of a sprite: `aspect * translate * rotate_z * scale`
///
/// The y scale is flipped so sprite images are upright on screen.
pub fn sprite_matrix(transform: &Transform2D, depth_mode: DepthMode, aspect: Mat4) -> Mat4 {
    let depth = sprite_depth(transform.layer, depth_mode);
    let trs = Mat4::from_scale_rotation_translation(
        Vec3::new(transform.scale.x, -transform.scale.y, 1.0),
        Quat::from_rotation_z(transform.rotation.to_radians()),
        transform.position.extend(depth),
    );
    aspect * trs
}

/// Reorder the UI queue in place
pub fn order_ui(drawables: &mut [Drawable], order: UiOrder) {
    match order {
        UiOrder::Submission => {}
        UiOrder::BackToFront => drawables.sort_by(|a, b| b.transform.w_axis.z.total_cmp(&a.transform.w_axis.z)),
    }
}

#[cfg(test)]
#[path = "sprite_tests.rs"]
mod tests;
