//! # Framelight App
//!
//! Windowed host for Framelight surfaces.
//!
//! This crate owns the winit event loop and turns window notifications into
//! [`SurfaceManager`](framelight_graphics::SurfaceManager) calls: the window
//! is created, the surface follows its size, every frame is drawn by an
//! [`AppHandler`] and presented, and the surface is shut down when the
//! window goes away.
//!
//! ## Overview
//!
//! - [`AppHandler`] - Trait for handling window events and draw requests
//! - [`AppArgs`] - Trait for parsing command line arguments
//! - [`App`] - Main application struct that manages the window and surface
//!
//! ## Example
//!
//! ```ignore
//! use framelight_app::{App, AppArgs, AppContext, AppHandler, DefaultAppArgs};
//!
//! struct MyApp;
//!
//! impl AppHandler for MyApp {
//!     fn on_draw(&mut self, ctx: &mut AppContext) -> framelight_graphics::Result<()> {
//!         ctx.surface_mut().bind_display_target()
//!     }
//! }
//!
//! fn main() -> Result<(), framelight_app::AppError> {
//!     App::run(MyApp, DefaultAppArgs::parse())
//! }
//! ```

mod app;
mod args;
mod context;
mod handler;

pub use app::{App, AppError};
pub use args::{AppArgs, CliBackend, DefaultAppArgs, parse_format};
pub use context::AppContext;
pub use handler::AppHandler;

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the app subsystem.
///
/// This should be called before using any app functionality.
pub fn init() {
    log::info!("Framelight App v{} initialized", VERSION);
}
