/// Base-pass resolution scale tracking
///
/// The World framebuffer is rebuilt only when the requested scale differs
/// from the one it was built with by more than [`SCALE_EPSILON`].

use crate::graphics_device::Extent2D;

/// Scale differences below this are float noise, not a change
pub const SCALE_EPSILON: f32 = 1e-4;

/// Scale the World framebuffer currently has
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionScale {
    current: f32,
}

impl Default for ResolutionScale {
    fn default() -> Self {
        Self { current: 1.0 }
    }
}

impl ResolutionScale {
    pub fn new(current: f32) -> Self {
        Self { current }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Whether `requested` calls for a rebuild
    pub fn needs_rebuild(&self, requested: f32) -> bool {
        (requested - self.current).abs() > SCALE_EPSILON
    }

    /// Record the scale the framebuffer was rebuilt with
    pub fn commit(&mut self, scale: f32) {
        self.current = scale;
    }
}

/// `extent * scale`, never collapsing below one pixel
pub fn scaled_extent(extent: Extent2D, scale: f32) -> Extent2D {
    let scale_axis = |value: u32| ((value as f32 * scale) as u32).max(1);
    Extent2D::new(scale_axis(extent.width), scale_axis(extent.height))
}

#[cfg(test)]
#[path = "resolution_tests.rs"]
mod tests;
