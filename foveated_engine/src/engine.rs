/// EngineContext - the single owner of all engine state
///
/// Built once at startup and passed by `&mut` to whatever needs it: there
/// is no global engine state besides the logger slot.
///
/// # Example
///
/// ```no_run
/// use foveated_engine::foveated::{EngineContext, Result};
/// use foveated_engine::foveated::config::EngineConfig;
/// use foveated_engine::foveated::frontend::AssetSource;
/// use foveated_engine::foveated::RenderBackend;
///
/// fn run(backend: Box<dyn RenderBackend>, assets: Box<dyn AssetSource>) -> Result<()> {
///     let mut engine = EngineContext::new(EngineConfig::default(), backend, assets)?;
///     engine.frame(|frontend| {
///         // queue models and sprites
///         let _ = frontend;
///         Ok(())
///     })?;
///     engine.shutdown()
/// }
/// ```

use crate::config::EngineConfig;
use crate::error::Result;
use crate::frontend::{AssetSource, Frontend};
use crate::gaze::GazeRegistry;
use crate::renderer::RenderBackend;
use crate::engine_info;

pub struct EngineContext {
    config: EngineConfig,
    gaze: GazeRegistry,
    frontend: Frontend,
    shut_down: bool,
}

impl EngineContext {
    /// Initialize the Frontend over `backend`
    ///
    /// The gaze registry starts empty; fill it through [`EngineContext::gaze_mut`].
    pub fn new(config: EngineConfig, backend: Box<dyn RenderBackend>, assets: Box<dyn AssetSource>) -> Result<Self> {
        let frontend = Frontend::init(backend, &config, assets)?;
        engine_info!(
            "foveated::engine",
            "Engine context ready (data: {}, hardware: {})",
            config.data_path.display(),
            config.hardware_path.display()
        );
        Ok(Self {
            config,
            gaze: GazeRegistry::new(),
            frontend,
            shut_down: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gaze(&self) -> &GazeRegistry {
        &self.gaze
    }

    pub fn gaze_mut(&mut self) -> &mut GazeRegistry {
        &mut self.gaze
    }

    pub fn frontend(&self) -> &Frontend {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut Frontend {
        &mut self.frontend
    }

    /// Run one frame: sample the gaze, queue the scene through `build`, draw
    ///
    /// # Arguments
    ///
    /// * `build` - Queues this frame's models and sprites on the Frontend
    pub fn frame<F>(&mut self, build: F) -> Result<()>
    where
        F: FnOnce(&mut Frontend) -> Result<()>,
    {
        self.frontend.set_gaze_point(self.gaze.gaze_point());
        self.frontend.begin_frame();
        build(&mut self.frontend)?;
        self.frontend.end_frame()
    }

    /// Stop the gaze device, then release every GPU resource
    ///
    /// A second call does nothing.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.gaze.shutdown();
        self.frontend.shutdown()
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
