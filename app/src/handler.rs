//! Application handler trait.

use framelight_graphics::Result;
use winit::event::KeyEvent;

use crate::context::AppContext;

/// Trait for handling application events and draw requests.
///
/// Implement this trait to create custom application logic.
///
/// # Lifecycle
///
/// 1. `on_init` - Called once the window and its surface exist
/// 2. `on_resize` - Called after the surface followed a window resize
/// 3. `on_update` - Called every frame before drawing
/// 4. `on_draw` - Called every frame to render; the app presents afterwards
/// 5. `on_shutdown` - Called before the surface is shut down
///
/// # Example
///
/// ```ignore
/// use framelight_app::{AppContext, AppHandler};
///
/// struct MyApp;
///
/// impl AppHandler for MyApp {
///     fn on_draw(&mut self, ctx: &mut AppContext) -> framelight_graphics::Result<()> {
///         ctx.surface_mut().bind_display_target()?;
///         let target = ctx.surface().display_target().cloned();
///         if let Some(view) = target {
///             ctx.context().clear_render_target(&view, [0.1, 0.2, 0.3, 1.0])?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait AppHandler {
    /// Called once when the application initializes.
    ///
    /// Use this to create textures, load assets, etc.
    fn on_init(&mut self, _ctx: &mut AppContext) {}

    /// Called when the surface was resized.
    ///
    /// The new size is available in `ctx.width()` and `ctx.height()`.
    fn on_resize(&mut self, _ctx: &mut AppContext) {}

    /// Called every frame before drawing.
    ///
    /// Returns `true` to continue running, `false` to exit.
    fn on_update(&mut self, _ctx: &mut AppContext) -> bool {
        true
    }

    /// Called every frame to render.
    ///
    /// Views cloned from the surface must be dropped before returning; a
    /// view held across a resize keeps the back buffer alive and the resize
    /// fails.
    fn on_draw(&mut self, ctx: &mut AppContext) -> Result<()>;

    /// Called when a key is pressed or released.
    fn on_key(&mut self, _ctx: &mut AppContext, _event: &KeyEvent) {}

    /// Called when the user requests to close the window.
    ///
    /// Return `true` to allow the window to close (the default).
    fn on_close_requested(&mut self, _ctx: &mut AppContext) -> bool {
        true
    }

    /// Called when the application is closing.
    ///
    /// Drop every resource created from the device here.
    fn on_shutdown(&mut self, _ctx: &mut AppContext) {}
}
