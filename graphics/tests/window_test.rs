//! Window and surface integration test.
//!
//! This test verifies that the surface manager works with a real window. It
//! creates a window, initializes a surface for it, follows resize
//! notifications and presents 5 frames.
//!
//! # CI Compatibility
//!
//! If window creation fails (e.g., on headless CI systems) or no device is
//! compatible with the window, the test passes gracefully. The test harness
//! runs tests off the main thread, so the event loop is built with
//! `with_any_thread` on Windows and on X11/Wayland.
//!
//! # Running This Test
//!
//! ```bash
//! cargo test --test window_test
//! ```

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;
#[cfg(any(
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
use winit::platform::x11::EventLoopBuilderExtX11;
use winit::window::{Window, WindowId};

use framelight_graphics::{BackendType, DeviceParameters, SurfaceConfig, SurfaceManager};

/// Number of frames to render before exiting.
const FRAMES_TO_RENDER: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestResult {
    Running,
    Passed,
    /// Window or device not available.
    Skipped,
    Failed,
}

struct WindowTestApp {
    result: TestResult,
    config: SurfaceConfig,
    window: Option<Arc<Window>>,
    surface: Option<SurfaceManager>,
    frame_count: u32,
    window_size: (u32, u32),
}

impl WindowTestApp {
    fn new(config: SurfaceConfig) -> Self {
        Self {
            result: TestResult::Running,
            config,
            window: None,
            surface: None,
            frame_count: 0,
            window_size: (320, 240),
        }
    }

    fn init_graphics(&mut self, window: Arc<Window>) -> bool {
        let mut surface = match SurfaceManager::init(window, self.config.clone()) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to initialize surface: {}", e);
                return false;
            }
        };
        if let Err(e) = surface.resize(self.window_size.0, self.window_size.1) {
            log::warn!("Failed to size surface: {}", e);
            return false;
        }

        log::info!(
            "Graphics initialized: {} ({}x{})",
            surface.device().name(),
            self.window_size.0,
            self.window_size.1
        );
        self.surface = Some(surface);
        true
    }

    fn render_frame(&mut self) -> bool {
        let Some(surface) = &mut self.surface else {
            return false;
        };

        let hue = (self.frame_count as f32 / FRAMES_TO_RENDER as f32) * 360.0;
        let (r, g, b) = hue_to_rgb(hue);

        if let Err(e) = surface.bind_display_target() {
            log::warn!("Failed to bind display target: {}", e);
            return false;
        }
        let target = surface.display_target().cloned();
        let cleared = target
            .as_ref()
            .map(|view| surface.context().clear_render_target(view, [r, g, b, 1.0]));
        drop(target);
        if let Some(Err(e)) = cleared {
            log::warn!("Failed to clear: {}", e);
            return false;
        }

        if let Err(e) = surface.present() {
            log::warn!("Failed to present: {}", e);
            return false;
        }

        log::info!(
            "Frame {} rendered (clear color: RGB({:.2}, {:.2}, {:.2}))",
            self.frame_count,
            r,
            g,
            b
        );
        self.frame_count += 1;
        true
    }

    fn is_complete(&self) -> bool {
        !matches!(self.result, TestResult::Running)
    }
}

impl ApplicationHandler for WindowTestApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title("Framelight Window Test")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.window_size.0,
                self.window_size.1,
            ))
            .with_visible(true);

        match event_loop.create_window(window_attributes) {
            Ok(window) => {
                log::info!("Test window created successfully");
                let window = Arc::new(window);
                self.window = Some(Arc::clone(&window));
                if !self.init_graphics(window) {
                    log::info!("Graphics initialization failed, skipping test");
                    self.result = TestResult::Skipped;
                    event_loop.exit();
                }
            }
            Err(e) => {
                log::info!("Window creation failed (expected on CI): {}", e);
                self.result = TestResult::Skipped;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.result = TestResult::Failed;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(surface) = &mut self.surface {
                    match surface.handle_resize_notification(size.width, size.height) {
                        Ok(_) => {
                            if size.width > 0 && size.height > 0 {
                                self.window_size = (size.width, size.height);
                            }
                        }
                        Err(e) => {
                            log::error!("Resize failed: {}", e);
                            self.result = TestResult::Failed;
                            event_loop.exit();
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if self.surface.is_some() {
                    if !self.render_frame() {
                        log::warn!("Frame rendering failed");
                        self.result = TestResult::Failed;
                        event_loop.exit();
                        return;
                    }

                    if self.frame_count >= FRAMES_TO_RENDER {
                        log::info!(
                            "Successfully rendered {} frames, test passed!",
                            FRAMES_TO_RENDER
                        );
                        self.result = TestResult::Passed;
                        if let Some(surface) = &self.surface {
                            surface.context().flush();
                        }
                        event_loop.exit();
                        return;
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
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
}

/// Convert hue (0-360) to RGB (0-1).
fn hue_to_rgb(hue: f32) -> (f32, f32, f32) {
    let h = hue / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();

    match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    }
}

/// Run the window test with event pumping.
///
/// Returns true if the test passed or was skipped.
fn run_window_test(config: SurfaceConfig) -> bool {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    log::info!(
        "Starting window integration test with backend: {:?}",
        config.device.backend
    );

    // Tests run on a worker thread.
    #[cfg(target_os = "windows")]
    let event_loop = EventLoop::builder().with_any_thread(true).build();
    #[cfg(target_os = "macos")]
    let event_loop = match std::panic::catch_unwind(EventLoop::new) {
        Ok(result) => result,
        Err(_) => {
            log::error!("Event loop creation panicked on macOS (non-main thread)");
            return false;
        }
    };
    // Sets the flag for both X11 and Wayland.
    #[cfg(any(
        target_os = "linux",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd"
    ))]
    let event_loop = EventLoop::builder().with_any_thread(true).build();
    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd"
    )))]
    let event_loop = EventLoop::new();

    let mut event_loop = match event_loop {
        Ok(el) => el,
        Err(e) => {
            log::info!("Event loop creation failed (expected on CI): {}", e);
            return true;
        }
    };

    let mut app = WindowTestApp::new(config);
    let max_iterations = 1000;
    let mut iterations = 0;

    loop {
        match event_loop.pump_app_events(None, &mut app) {
            PumpStatus::Exit(_code) => {
                log::info!("Event loop exited");
                break;
            }
            PumpStatus::Continue => {
                if app.is_complete() {
                    break;
                }
                iterations += 1;
                if iterations >= max_iterations {
                    log::warn!("Test timed out after {} iterations", max_iterations);
                    app.result = TestResult::Failed;
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        }
    }

    if let Some(surface) = app.surface.take() {
        surface.shutdown();
    }

    match app.result {
        TestResult::Passed => {
            log::info!("Window test PASSED");
            true
        }
        TestResult::Skipped => {
            log::info!("Window test SKIPPED (no display available)");
            true
        }
        TestResult::Failed => {
            log::error!("Window test FAILED");
            false
        }
        TestResult::Running => {
            log::warn!("Window test ended in Running state (timeout)");
            false
        }
    }
}

#[test]
fn test_window_surface_5_frames() {
    let config = SurfaceConfig::new()
        .with_label("window test")
        .with_device_parameters(DeviceParameters::new().with_backend(BackendType::Auto));
    assert!(
        run_window_test(config),
        "Window surface test failed - see log for details"
    );
}
