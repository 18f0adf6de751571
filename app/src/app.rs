//! Main application struct and event loop.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;
use winit::window::{Window, WindowId};

use framelight_graphics::{GraphicsError, SurfaceManager};

use crate::args::AppArgs;
use crate::context::AppContext;
use crate::handler::AppHandler;

/// Errors that end the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The event loop could not be created or failed while running.
    #[error("event loop error: {0}")]
    EventLoop(#[from] EventLoopError),

    /// The window could not be created.
    #[error("failed to create window: {0}")]
    Window(String),

    /// The surface hit an unrecoverable graphics error.
    #[error("graphics error: {0}")]
    Graphics(#[from] GraphicsError),
}

/// Main application struct that manages the window and its surface.
///
/// The `App` struct is generic over:
/// - `H`: The handler type that implements [`AppHandler`]
/// - `A`: The arguments type that implements [`AppArgs`]
///
/// Window notifications map onto the surface as follows:
///
/// | Notification       | Surface call                                   |
/// |--------------------|------------------------------------------------|
/// | window created     | [`SurfaceManager::init`] then a first resize   |
/// | resized            | [`SurfaceManager::handle_resize_notification`] |
/// | redraw requested   | handler draw, then [`SurfaceManager::present`] |
/// | close / destroyed  | [`SurfaceManager::shutdown`]                   |
///
/// Fatal graphics errors stop the event loop and are returned from
/// [`App::run`].
pub struct App<H, A>
where
    H: AppHandler,
    A: AppArgs,
{
    handler: H,
    args: A,
    window: Option<Arc<Window>>,
    context: Option<AppContext>,
    start_time: Instant,
    last_frame_time: Instant,
    running: bool,
    error: Option<AppError>,
}

impl<H, A> App<H, A>
where
    H: AppHandler + 'static,
    A: AppArgs + 'static,
{
    /// Create a new application.
    pub fn new(handler: H, args: A) -> Self {
        Self {
            handler,
            args,
            window: None,
            context: None,
            start_time: Instant::now(),
            last_frame_time: Instant::now(),
            running: true,
            error: None,
        }
    }

    /// Run the application with the given handler and arguments.
    ///
    /// Creates the event loop, the window and its surface, then runs the
    /// main loop until the window closes, the handler asks to exit, the
    /// frame limit is reached or a fatal error occurs.
    pub fn run(handler: H, args: A) -> Result<(), AppError> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        framelight_graphics::init();
        crate::init();

        #[cfg(target_os = "windows")]
        let event_loop = EventLoop::builder().with_any_thread(true).build()?;

        #[cfg(not(target_os = "windows"))]
        let event_loop = EventLoop::new()?;

        let mut app = Self::new(handler, args);
        event_loop.run_app(&mut app)?;
        app.finish()
    }

    /// Shut down what is left and report the first fatal error.
    fn finish(mut self) -> Result<(), AppError> {
        self.shutdown_surface();
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Record a fatal error and stop the loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        self.running = false;
        event_loop.exit();
    }

    /// Create the surface for the new window and size it.
    fn init_surface(&mut self, window: Arc<Window>) -> Result<(), GraphicsError> {
        let config = self.args.surface_config();
        let size = window.inner_size();

        let mut surface = SurfaceManager::init(window, config)?;
        surface.handle_resize_notification(size.width, size.height)?;

        log::info!(
            "Surface initialized: {} ({}x{}, {}, {} buffer(s))",
            surface.device().name(),
            surface.dimensions().0,
            surface.dimensions().1,
            surface.format(),
            surface.buffer_count()
        );

        let mut context = AppContext::new(surface);
        self.handler.on_init(&mut context);
        self.context = Some(context);
        Ok(())
    }

    /// Forward a window size notification to the surface.
    fn handle_resize(&mut self, width: u32, height: u32) -> Result<(), GraphicsError> {
        let Some(ctx) = &mut self.context else {
            return Ok(());
        };
        match ctx.surface.handle_resize_notification(width, height) {
            Ok(true) => {
                self.handler.on_resize(ctx);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::warn!("Ignoring resize to {}x{}: {}", width, height, e);
                Ok(())
            }
        }
    }

    /// Render and present a frame.
    fn render_frame(&mut self) -> Result<(), GraphicsError> {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let Some(ctx) = &mut self.context else {
            return Ok(());
        };

        ctx.delta_time = delta_time;
        ctx.elapsed_time = now.duration_since(self.start_time).as_secs_f32();

        if !self.handler.on_update(ctx) {
            self.running = false;
            return Ok(());
        }

        match self.handler.on_draw(ctx) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => log::warn!("Frame {} draw failed: {}", ctx.frame_number, e),
        }
        ctx.surface.present()?;
        ctx.frame_number += 1;

        if let Some(max_frames) = self.args.max_frames()
            && ctx.frame_number >= max_frames
        {
            log::info!("Reached max frames limit ({}), exiting", max_frames);
            self.running = false;
        }
        Ok(())
    }

    fn shutdown_surface(&mut self) {
        if let Some(mut ctx) = self.context.take() {
            self.handler.on_shutdown(&mut ctx);
            ctx.surface.shutdown();
        }
    }
}

impl<H, A> ApplicationHandler for App<H, A>
where
    H: AppHandler + 'static,
    A: AppArgs + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.args.window_title())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.args.window_width(),
                self.args.window_height(),
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, AppError::Window(e.to_string()));
                return;
            }
        };
        log::info!("Window created");
        self.window = Some(Arc::clone(&window));

        if let Err(e) = self.init_surface(window) {
            self.fail(event_loop, e.into());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                let allow = match &mut self.context {
                    Some(ctx) => self.handler.on_close_requested(ctx),
                    None => true,
                };
                if allow {
                    log::info!("Close requested");
                    self.running = false;
                    self.shutdown_surface();
                    event_loop.exit();
                }
            }

            WindowEvent::Destroyed => {
                log::info!("Window destroyed");
                self.running = false;
                self.shutdown_surface();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Err(e) = self.handle_resize(size.width, size.height) {
                    self.fail(event_loop, e.into());
                }
            }

            WindowEvent::RedrawRequested => {
                if self.running
                    && let Err(e) = self.render_frame()
                {
                    self.fail(event_loop, e.into());
                    return;
                }

                if !self.running {
                    event_loop.exit();
                } else if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(ctx) = &mut self.context {
                    self.handler.on_key(ctx, &event);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown_surface();
    }
}
