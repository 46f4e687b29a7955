/*!
# Foveated Engine

Core of a real-time renderer that draws full resolution only around the
viewer's gaze point.

Each frame runs five passes on one graphics queue:

```text
Shadow ──┬──> World (base resolution) ────┐
         └──> Foveated (gaze scissor) ────┴──> Ui ──> Present
```

This crate is platform-agnostic. A backend crate implements
[`GraphicsDevice`](graphics_device::GraphicsDevice) for one graphics API;
[`FoveatedRenderer`](renderer::FoveatedRenderer) drives it through the pass
graph and is what the Frontend talks to, as a
[`RenderBackend`](renderer::RenderBackend).

## Architecture

- **GraphicsDevice**: resources, framebuffers and pass submission of one API
- **FoveatedRenderer**: pass recording, resolution scaling, frame sync
- **Frontend**: asset caches, model flattening, sprite and text queues
- **GazeRegistry**: tracker plugins feeding the foveated scissor
- **EngineContext**: owns all of the above for the lifetime of the app
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod renderer;
pub mod frontend;
pub mod gaze;

// Main foveated namespace module
pub mod foveated {
    // Error types and the fatal policy
    pub use crate::error::{fatal, Error, Result};

    // Engine state owner
    pub use crate::engine::EngineContext;

    // Frontend-facing renderer trait
    pub use crate::renderer::RenderBackend;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    pub mod config {
        pub use crate::config::*;
    }

    // Device seam implemented by backend crates
    pub mod device {
        pub use crate::graphics_device::*;
    }

    pub mod render {
        pub use crate::renderer::*;
    }

    pub mod frontend {
        pub use crate::frontend::*;
    }

    pub mod gaze {
        pub use crate::gaze::*;
    }
}

// Re-export math library at crate root
pub use glam;
