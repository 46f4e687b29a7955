//! The five passes of a frame and the semaphore graph that orders them
//!
//! ```text
//! Shadow ──ShadowToWorld──────► World ────WorldFinished─────┐
//!        └─ShadowToFoveated──► Foveated ─FoveatedFinished──►├─► Ui ─UiFinished─► Present ─► present()
//!                                          ImageAvailable ──────────────────────┘
//! ```
//!
//! Every wait is at the fragment-shader stage except the swapchain image,
//! which is waited on at color-attachment output. Present also signals the
//! frame fence that the next frame waits on.

use bitflags::bitflags;
use glam::Mat4;
use crate::graphics_device::{ClearValue, ModelHandle, Rect2D, ShaderHandle, TextureHandle, Viewport};

/// One of the five passes, in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Shadow,
    World,
    Foveated,
    Ui,
    Present,
}

impl Pass {
    /// All passes in the order they are submitted every frame
    pub const ALL: [Pass; 5] = [Pass::Shadow, Pass::World, Pass::Foveated, Pass::Ui, Pass::Present];

    /// Offscreen passes own a framebuffer; Present renders into the swapchain
    pub fn is_offscreen(&self) -> bool {
        !matches!(self, Pass::Present)
    }
}

/// Device semaphores created once and reused every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSemaphore {
    ShadowToWorld,
    ShadowToFoveated,
    WorldFinished,
    FoveatedFinished,
    UiFinished,
    ImageAvailable,
    RenderFinished,
}

bitflags! {
    /// Pipeline stage at which a semaphore wait takes effect
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WaitStage: u32 {
        const FRAGMENT_SHADER = 1 << 0;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 1;
    }
}

/// A semaphore wait with its destination stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreWait {
    pub semaphore: FrameSemaphore,
    pub stage: WaitStage,
}

const fn fragment_wait(semaphore: FrameSemaphore) -> SemaphoreWait {
    SemaphoreWait { semaphore, stage: WaitStage::FRAGMENT_SHADER }
}

/// Waits and signals attached to one pass submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSync {
    pub waits: &'static [SemaphoreWait],
    pub signals: &'static [FrameSemaphore],
    /// Whether this submission signals the frame fence
    pub signal_frame_fence: bool,
}

const SHADOW_SYNC: PassSync = PassSync {
    waits: &[],
    signals: &[FrameSemaphore::ShadowToWorld, FrameSemaphore::ShadowToFoveated],
    signal_frame_fence: false,
};

const WORLD_SYNC: PassSync = PassSync {
    waits: &[fragment_wait(FrameSemaphore::ShadowToWorld)],
    signals: &[FrameSemaphore::WorldFinished],
    signal_frame_fence: false,
};

const FOVEATED_SYNC: PassSync = PassSync {
    waits: &[fragment_wait(FrameSemaphore::ShadowToFoveated)],
    signals: &[FrameSemaphore::FoveatedFinished],
    signal_frame_fence: false,
};

const UI_SYNC: PassSync = PassSync {
    waits: &[
        fragment_wait(FrameSemaphore::WorldFinished),
        fragment_wait(FrameSemaphore::FoveatedFinished),
    ],
    signals: &[FrameSemaphore::UiFinished],
    signal_frame_fence: false,
};

const PRESENT_SYNC: PassSync = PassSync {
    waits: &[
        fragment_wait(FrameSemaphore::UiFinished),
        SemaphoreWait {
            semaphore: FrameSemaphore::ImageAvailable,
            stage: WaitStage::COLOR_ATTACHMENT_OUTPUT,
        },
    ],
    signals: &[FrameSemaphore::RenderFinished],
    signal_frame_fence: true,
};

impl PassSync {
    /// The fixed synchronization of a pass
    pub fn for_pass(pass: Pass) -> PassSync {
        match pass {
            Pass::Shadow => SHADOW_SYNC,
            Pass::World => WORLD_SYNC,
            Pass::Foveated => FOVEATED_SYNC,
            Pass::Ui => UI_SYNC,
            Pass::Present => PRESENT_SYNC,
        }
    }
}

// ===== PASS RECORDING =====

/// Texture bound to set 1 for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundTexture {
    /// Leave whatever set 1 currently holds
    Unbound,
    /// 2x2 black placeholder
    Dummy,
    Texture(TextureHandle),
    /// First color attachment of another pass's framebuffer
    Framebuffer(Pass),
}

/// Geometry draws push their transform; composite quads do not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Geometry,
    Composite,
}

/// One indexed draw inside a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    /// Pipeline to bind; `None` keeps the pass pipeline bound
    pub shader: Option<ShaderHandle>,
    pub model: ModelHandle,
    pub texture: BoundTexture,
    pub transform: Mat4,
    pub index_count: u32,
    pub kind: DrawKind,
}

/// Everything the device needs to record and submit one pass
#[derive(Debug, Clone)]
pub struct PassRecording {
    pub pass: Pass,
    /// Clear values in attachment order (colors first, then depth)
    pub clear: Vec<ClearValue>,
    pub viewport: Viewport,
    pub scissor: Rect2D,
    /// Pipeline bound once at the start of the pass (shadow pass)
    pub pass_shader: Option<ShaderHandle>,
    /// Bind the per-frame set (camera, light, shadow map, user data)
    pub bind_frame_set: bool,
    pub draws: Vec<DrawCall>,
    /// Swapchain image to render into (Present only)
    pub swapchain_image: Option<u32>,
}

impl PassRecording {
    pub fn geometry_draw_count(&self) -> usize {
        self.draws.iter().filter(|d| d.kind == DrawKind::Geometry).count()
    }

    pub fn composite_draw_count(&self) -> usize {
        self.draws.iter().filter(|d| d.kind == DrawKind::Composite).count()
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
