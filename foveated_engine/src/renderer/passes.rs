//! Pass recordings for one frame
//!
//! Pure functions from the frame input to the draw lists of the five passes.
//! The orchestrator submits them in [`Pass::ALL`] order.

use glam::Mat4;
use crate::error::{Error, Result};
use crate::graphics_device::{
    BoundTexture, ClearValue, DrawCall, DrawKind, Extent2D, ModelHandle, Pass, PassRecording,
    ShaderHandle,
};
use crate::renderer::scissor::gaze_scissor;
use crate::renderer::{Drawable, FrameInput, RenderSettings};

const DEPTH_CLEAR: ClearValue = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };

/// Resources the composite draws need, registered once by the Frontend
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeResources {
    pub framebuffer_model: Option<(ModelHandle, u32)>,
    pub ui_shader: Option<ShaderHandle>,
    pub aspect_shader: Option<ShaderHandle>,
    pub shadow_shader: Option<ShaderHandle>,
    pub foveated_clear_shader: Option<ShaderHandle>,
}

/// Composite resources with every slot filled
#[derive(Debug, Clone, Copy)]
pub struct ResolvedComposite {
    pub quad: ModelHandle,
    pub quad_faces: u32,
    pub ui_shader: ShaderHandle,
    pub aspect_shader: ShaderHandle,
    pub shadow_shader: ShaderHandle,
    pub foveated_clear_shader: ShaderHandle,
}

impl CompositeResources {
    pub fn resolve(&self) -> Result<ResolvedComposite> {
        fn require<T>(slot: Option<T>, name: &str) -> Result<T> {
            slot.ok_or_else(|| Error::InvalidResource(format!("{} was never set", name)))
        }
        let (quad, quad_faces) = require(self.framebuffer_model, "framebuffer model")?;
        Ok(ResolvedComposite {
            quad,
            quad_faces,
            ui_shader: require(self.ui_shader, "UI framebuffer shader")?,
            aspect_shader: require(self.aspect_shader, "aspect framebuffer shader")?,
            shadow_shader: require(self.shadow_shader, "shadow shader")?,
            foveated_clear_shader: require(self.foveated_clear_shader, "foveated clear shader")?,
        })
    }
}

impl ResolvedComposite {
    /// Framebuffer quad drawn with `shader`, sampling `texture`
    fn quad(&self, shader: ShaderHandle, texture: BoundTexture) -> DrawCall {
        DrawCall {
            shader: Some(shader),
            model: self.quad,
            texture,
            transform: Mat4::IDENTITY,
            index_count: self.quad_faces * 3,
            kind: DrawKind::Composite,
        }
    }
}

fn geometry(drawable: &Drawable) -> DrawCall {
    DrawCall {
        shader: Some(drawable.shader),
        model: drawable.model,
        texture: drawable.texture.map_or(BoundTexture::Unbound, BoundTexture::Texture),
        transform: drawable.transform,
        index_count: drawable.index_count(),
        kind: DrawKind::Geometry,
    }
}

fn full_target(pass: Pass, extent: Extent2D, clear: Vec<ClearValue>) -> PassRecording {
    PassRecording {
        pass,
        clear,
        viewport: extent.full_viewport(),
        scissor: extent.full_rect(),
        pass_shader: None,
        bind_frame_set: true,
        draws: Vec::new(),
        swapchain_image: None,
    }
}

/// Depth-only pass from the light's point of view
pub fn record_shadow(frame: &FrameInput, extent: Extent2D, composite: &ResolvedComposite) -> PassRecording {
    let light_space = frame.light.light_space_matrix();
    let mut recording = full_target(Pass::Shadow, extent, vec![DEPTH_CLEAR]);
    recording.pass_shader = Some(composite.shadow_shader);
    recording.bind_frame_set = false;
    recording.draws = frame
        .world
        .iter()
        .map(|drawable| DrawCall {
            shader: None,
            model: drawable.model,
            texture: drawable.texture.map_or(BoundTexture::Dummy, BoundTexture::Texture),
            transform: light_space * drawable.transform,
            index_count: drawable.index_count(),
            kind: DrawKind::Geometry,
        })
        .collect();
    recording
}

/// Whole scene at base resolution
pub fn record_world(frame: &FrameInput, extent: Extent2D) -> PassRecording {
    let clear = vec![ClearValue::Color(frame.light.clear_color(1.0)), DEPTH_CLEAR];
    let mut recording = full_target(Pass::World, extent, clear);
    recording.draws = frame.world.iter().map(geometry).collect();
    recording
}

/// Whole scene at full resolution, restricted to the gaze square
///
/// Without foveation the pass still runs and only clears.
pub fn record_foveated(
    frame: &FrameInput,
    extent: Extent2D,
    settings: &RenderSettings,
    composite: &ResolvedComposite,
) -> PassRecording {
    let clear = vec![ClearValue::Color(frame.light.clear_color(0.0)), DEPTH_CLEAR];
    let mut recording = full_target(Pass::Foveated, extent, clear);
    recording.scissor = gaze_scissor(frame.gaze, extent, settings.foveated_box_size());
    if settings.foveation_enabled() {
        recording
            .draws
            .push(composite.quad(composite.foveated_clear_shader, BoundTexture::Dummy));
        recording.draws.extend(frame.world.iter().map(geometry));
    }
    recording
}

/// World then Foveated composited, UI drawables on top
pub fn record_ui(
    frame: &FrameInput,
    extent: Extent2D,
    settings: &RenderSettings,
    composite: &ResolvedComposite,
) -> PassRecording {
    let clear = vec![ClearValue::Color(frame.light.clear_color(1.0))];
    let mut recording = full_target(Pass::Ui, extent, clear);
    recording.draws.push(composite.quad(composite.ui_shader, BoundTexture::Framebuffer(Pass::World)));
    recording
        .draws
        .push(composite.quad(composite.ui_shader, BoundTexture::Framebuffer(Pass::Foveated)));
    if settings.draw_ui() {
        recording.draws.extend(frame.ui.iter().map(geometry));
    }
    recording
}

/// UI framebuffer through the aspect-correction quad into the swapchain image,
/// then the overlay drawables on top
pub fn record_present(
    frame: &FrameInput,
    extent: Extent2D,
    composite: &ResolvedComposite,
    image_index: u32,
) -> PassRecording {
    let clear = vec![ClearValue::Color(frame.light.clear_color(1.0))];
    let mut recording = full_target(Pass::Present, extent, clear);
    recording
        .draws
        .push(composite.quad(composite.aspect_shader, BoundTexture::Framebuffer(Pass::Ui)));
    recording.draws.extend(frame.overlay.iter().map(geometry));
    recording.swapchain_image = Some(image_index);
    recording
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod tests;
