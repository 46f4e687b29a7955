/// Host-side render settings, read once at the top of every frame

use crate::config::EngineConfig;
use crate::renderer::scissor::clamp_box_size;

/// Lowest base-pass scale (5%)
pub const MIN_BASE_RES_SCALE: f32 = 0.05;
/// Highest base-pass scale (100%)
pub const MAX_BASE_RES_SCALE: f32 = 1.0;

/// Mutable toggles of the foveated pipeline
///
/// Setters clamp into the supported ranges, so every stored value is valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    draw_ui: bool,
    foveation_enabled: bool,
    base_res_scale: f32,
    foveated_box_size: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RenderSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut settings = Self {
            draw_ui: config.draw_ui,
            foveation_enabled: config.foveation_enabled,
            base_res_scale: MAX_BASE_RES_SCALE,
            foveated_box_size: 0,
        };
        settings.set_base_res_scale(config.base_res_scale);
        settings.set_foveated_box_size(config.foveated_box_size);
        settings
    }

    pub fn draw_ui(&self) -> bool {
        self.draw_ui
    }

    pub fn set_draw_ui(&mut self, draw_ui: bool) {
        self.draw_ui = draw_ui;
    }

    pub fn foveation_enabled(&self) -> bool {
        self.foveation_enabled
    }

    pub fn set_foveation_enabled(&mut self, enabled: bool) {
        self.foveation_enabled = enabled;
    }

    /// Requested scale, kept even while foveation is off
    pub fn base_res_scale(&self) -> f32 {
        self.base_res_scale
    }

    pub fn set_base_res_scale(&mut self, scale: f32) {
        self.base_res_scale = if scale.is_nan() {
            MAX_BASE_RES_SCALE
        } else {
            scale.clamp(MIN_BASE_RES_SCALE, MAX_BASE_RES_SCALE)
        };
    }

    /// Scale the World pass actually renders at (full size without foveation)
    pub fn effective_base_res_scale(&self) -> f32 {
        if self.foveation_enabled {
            self.base_res_scale
        } else {
            MAX_BASE_RES_SCALE
        }
    }

    pub fn foveated_box_size(&self) -> u32 {
        self.foveated_box_size
    }

    pub fn set_foveated_box_size(&mut self, size: u32) {
        self.foveated_box_size = clamp_box_size(size);
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
