/// MouseGaze - the cursor standing in for an eye tracker
///
/// The window loop feeds winit events into a [`CursorTracker`]; every
/// `MouseGaze` built from a clone of that tracker reads the same cursor.

use std::sync::{Arc, Mutex, MutexGuard};
use glam::Vec2;
use winit::event::WindowEvent;
use crate::error::Result;
use crate::gaze::{GazeDevice, CENTER_GAZE};

/// Module name the mouse device is registered under
pub const MOUSE_GAZE_NAME: &str = "mouse";

#[derive(Debug, Default)]
struct CursorState {
    /// Pixels from the top-left of the window
    position: Vec2,
    window_size: Vec2,
}

#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    state: Arc<Mutex<CursorState>>,
}

impl CursorTracker {
    pub fn new(width: u32, height: u32) -> Self {
        let tracker = Self::default();
        tracker.set_window_size(width, height);
        tracker
    }

    fn lock(&self) -> MutexGuard<'_, CursorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Track cursor motion and window resizes; other events are ignored
    pub fn handle_event(&self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.set_cursor(position.x as f32, position.y as f32),
            WindowEvent::Resized(size) => self.set_window_size(size.width, size.height),
            _ => {}
        }
    }

    pub fn set_cursor(&self, x: f32, y: f32) {
        self.lock().position = Vec2::new(x, y);
    }

    pub fn set_window_size(&self, width: u32, height: u32) {
        self.lock().window_size = Vec2::new(width as f32, height as f32);
    }

    /// Cursor over window size, clamped to [0, 1]; the center while the window has no size
    pub fn normalized(&self) -> Vec2 {
        let state = self.lock();
        if state.window_size.x <= 0.0 || state.window_size.y <= 0.0 {
            return CENTER_GAZE;
        }
        (state.position / state.window_size).clamp(Vec2::ZERO, Vec2::ONE)
    }
}

pub struct MouseGaze {
    tracker: CursorTracker,
    active: bool,
}

impl MouseGaze {
    pub fn new(tracker: CursorTracker) -> Self {
        Self { tracker, active: false }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl GazeDevice for MouseGaze {
    fn name(&self) -> &str {
        MOUSE_GAZE_NAME
    }

    fn activate(&mut self) -> Result<()> {
        self.active = true;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn current_position(&self) -> Vec2 {
        if !self.active {
            return CENTER_GAZE;
        }
        self.tracker.normalized()
    }
}

#[cfg(test)]
#[path = "mouse_tests.rs"]
mod tests;
