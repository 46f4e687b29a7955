/// Renderer module - the foveated pass pipeline above the device seam

pub mod backend;
pub mod drawable;
pub mod foveated_renderer;
pub mod light;
pub mod passes;
pub mod resolution;
pub mod scissor;
pub mod settings;

pub use backend::*;
pub use drawable::*;
pub use foveated_renderer::*;
pub use light::{frame_uniforms, DirectionalLight};
pub use resolution::{scaled_extent, ResolutionScale, SCALE_EPSILON};
pub use scissor::{
    clamp_box_size, gaze_scissor, DEFAULT_FOVEATED_BOX_SIZE, MAX_FOVEATED_BOX_SIZE,
    MIN_FOVEATED_BOX_SIZE,
};
pub use settings::*;
