/// Gaze-to-scissor mapping for the foveated pass

use glam::Vec2;
use crate::graphics_device::{Extent2D, Rect2D};

/// Smallest side of the foveated square, in pixels
pub const MIN_FOVEATED_BOX_SIZE: u32 = 120;
/// Largest side of the foveated square, in pixels
pub const MAX_FOVEATED_BOX_SIZE: u32 = 2400;
/// Side used until the user changes it
pub const DEFAULT_FOVEATED_BOX_SIZE: u32 = 2 * MIN_FOVEATED_BOX_SIZE;

pub fn clamp_box_size(size: u32) -> u32 {
    size.clamp(MIN_FOVEATED_BOX_SIZE, MAX_FOVEATED_BOX_SIZE)
}

/// Square scissor of side `box_size` centered on the gaze pixel
///
/// The gaze is normalized to [0, 1] on both axes. The square is clamped
/// into the framebuffer, so near an edge it shrinks instead of moving.
///
/// # Arguments
///
/// * `gaze` - Normalized gaze point (values outside [0, 1] are clamped)
/// * `extent` - Framebuffer size in pixels
/// * `box_size` - Side of the square, clamped to [120, 2400]
pub fn gaze_scissor(gaze: Vec2, extent: Extent2D, box_size: u32) -> Rect2D {
    let size = clamp_box_size(box_size) as i64;
    let width = extent.width as i64;
    let height = extent.height as i64;

    let gaze = if gaze.is_finite() {
        gaze.clamp(Vec2::ZERO, Vec2::ONE)
    } else {
        Vec2::splat(0.5)
    };
    let pixel_x = (gaze.x * extent.width as f32) as i64;
    let pixel_y = (gaze.y * extent.height as f32) as i64;

    let top_left_x = (pixel_x - size / 2).max(0);
    let top_left_y = (pixel_y - size / 2).max(0);
    let bottom_right_x = (pixel_x - size / 2 + size).min(width);
    let bottom_right_y = (pixel_y - size / 2 + size).min(height);

    Rect2D {
        x: top_left_x.min(width) as i32,
        y: top_left_y.min(height) as i32,
        width: (bottom_right_x - top_left_x).max(0) as u32,
        height: (bottom_right_y - top_left_y).max(0) as u32,
    }
}

#[cfg(test)]
#[path = "scissor_tests.rs"]
mod tests;
