//! Application context passed to handlers.

use std::sync::Arc;

use framelight_graphics::{DeviceContext, GraphicsDevice, SurfaceManager};

/// Per-application state handed to every [`AppHandler`](crate::AppHandler)
/// callback.
///
/// Owns the surface of the window. Timing values are updated once per frame
/// before [`on_update`](crate::AppHandler::on_update).
pub struct AppContext {
    pub(crate) surface: SurfaceManager,
    pub(crate) frame_number: u64,
    pub(crate) delta_time: f32,
    pub(crate) elapsed_time: f32,
}

impl AppContext {
    pub(crate) fn new(surface: SurfaceManager) -> Self {
        Self {
            surface,
            frame_number: 0,
            delta_time: 0.0,
            elapsed_time: 0.0,
        }
    }

    /// The window's surface.
    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    /// Mutable access to the window's surface.
    pub fn surface_mut(&mut self) -> &mut SurfaceManager {
        &mut self.surface
    }

    /// The graphics device.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        self.surface.device()
    }

    /// The device context that draws into the surface.
    pub fn context(&self) -> &DeviceContext {
        self.surface.context()
    }

    /// Current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.surface.dimensions().0
    }

    /// Current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.surface.dimensions().1
    }

    /// Number of frames presented so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Seconds since the previous frame.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Seconds since the application started.
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }
}
