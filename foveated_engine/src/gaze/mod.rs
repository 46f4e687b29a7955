/// Gaze module - tracker plugins and the mouse fallback

pub mod gaze_device;
pub mod mouse;
pub mod registry;

pub use gaze_device::*;
pub use mouse::*;
pub use registry::*;
