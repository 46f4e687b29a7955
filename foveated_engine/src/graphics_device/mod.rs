/// Graphics device module - the GPU seam and the types that cross it

// Module declarations
pub mod graphics_device;
pub mod command_list;
pub mod resource;
pub mod pass;
pub mod uniforms;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use command_list::*;
pub use resource::*;
pub use pass::*;
pub use uniforms::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
