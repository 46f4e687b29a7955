//! GazeRegistry - hardware modules discovered at startup, one active at a time
//!
//! Modules are registered as factories under a name. [`GazeRegistry::scan`]
//! walks the hardware directory and instantiates the factory whose name
//! matches each file stem (`libtobii.so`, `tobii.dll` and `tobii` all match
//! "tobii"). Files with no matching factory, and factories that fail, are
//! logged and skipped: a missing tracker is never fatal on its own.

use std::path::Path;
use glam::Vec2;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::gaze::{GazeDevice, GazeFactory};
use crate::{engine_debug, engine_info, engine_warn};

/// Gaze point reported when no device is selected
pub const CENTER_GAZE: Vec2 = Vec2::new(0.5, 0.5);

pub struct GazeRegistry {
    factories: FxHashMap<String, GazeFactory>,
    devices: Vec<Box<dyn GazeDevice>>,
    current: Option<usize>,
}

impl GazeRegistry {
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
            devices: Vec::new(),
            current: None,
        }
    }

    /// Register the factory scanned files named `name` resolve to
    pub fn register_factory<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn GazeDevice>> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Add an already-built device
    pub fn add_device(&mut self, device: Box<dyn GazeDevice>) -> usize {
        engine_info!("foveated::gaze", "Gaze device '{}' available", device.name());
        self.devices.push(device);
        self.devices.len() - 1
    }

    /// Instantiate a device for every module file in `dir`
    ///
    /// # Returns
    ///
    /// The number of devices added. An unreadable directory adds none.
    pub fn scan(&mut self, dir: &Path) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                engine_warn!("foveated::gaze", "Cannot read hardware folder {}: {}", dir.display(), e);
                return 0;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = stem.strip_prefix("lib").unwrap_or(stem);

            let Some(factory) = self.factories.get(name) else {
                engine_warn!("foveated::gaze", "No gaze module named '{}' ({})", name, path.display());
                continue;
            };
            match factory() {
                Ok(device) => {
                    self.add_device(device);
                    added += 1;
                }
                Err(e) => {
                    engine_warn!("foveated::gaze", "Gaze module '{}' failed to load: {}", name, e);
                }
            }
        }
        engine_debug!("foveated::gaze", "Scanned {}: {} devices", dir.display(), added);
        added
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device_name(&self, index: usize) -> Option<&str> {
        self.devices.get(index).map(|d| d.name())
    }

    /// Index of the active device
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Make device `index` the active one
    ///
    /// The previous device is deactivated first. If activation fails no
    /// device is active afterwards.
    pub fn select_device(&mut self, index: usize) -> Result<()> {
        if self.devices.is_empty() {
            return Err(Error::InvalidResource("no gaze devices are available".to_string()));
        }
        if index >= self.devices.len() {
            return Err(Error::InvalidResource(format!(
                "gaze device {} out of range ({} devices)",
                index,
                self.devices.len()
            )));
        }

        if let Some(previous) = self.current.take() {
            self.devices[previous].deactivate();
        }
        let device = &mut self.devices[index];
        device.activate()?;
        engine_info!("foveated::gaze", "Gaze device '{}' selected", device.name());
        self.current = Some(index);
        Ok(())
    }

    /// Activate the device after the current one, wrapping to the first
    ///
    /// Starts from device 0 when none is active.
    pub fn select_next_device(&mut self) -> Result<usize> {
        let next = match self.current {
            Some(current) if !self.devices.is_empty() => (current + 1) % self.devices.len(),
            _ => 0,
        };
        self.select_device(next)?;
        Ok(next)
    }

    /// Gaze of the active device, or the center without one
    pub fn gaze_point(&self) -> Vec2 {
        self.current
            .and_then(|i| self.devices.get(i))
            .map_or(CENTER_GAZE, |d| d.current_position().clamp(Vec2::ZERO, Vec2::ONE))
    }

    /// Deactivate the active device and drop every device
    pub fn shutdown(&mut self) {
        if let Some(current) = self.current.take() {
            self.devices[current].deactivate();
        }
        self.devices.clear();
    }
}

impl Default for GazeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
