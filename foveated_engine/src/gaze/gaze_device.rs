/// GazeDevice trait - a source of normalized gaze points

use glam::Vec2;
use crate::error::Result;

/// Eye tracker, or anything standing in for one
///
/// A device is only polled between `activate` and `deactivate`.
pub trait GazeDevice {
    fn name(&self) -> &str;

    /// Start tracking
    fn activate(&mut self) -> Result<()>;

    /// Stop tracking; calling it on an inactive device does nothing
    fn deactivate(&mut self);

    /// Current gaze in [0, 1] x [0, 1], origin at the top-left
    fn current_position(&self) -> Vec2;
}

/// Builds one device; registered in a [`crate::gaze::GazeRegistry`] by module name
pub type GazeFactory = Box<dyn Fn() -> Result<Box<dyn GazeDevice>>>;
