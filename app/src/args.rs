//! Command line arguments trait and default implementation.
//!
//! Uses clap for CLI parsing with:
//! - Help text (`--help`)
//! - Validation and clear error messages
//! - Format names checked against the format catalog

use std::path::{Path, PathBuf};

use framelight_graphics::format::catalog;
use framelight_graphics::{BackendType, DeviceParameters, SurfaceConfig, TextureFormat};

/// Trait for parsing command line arguments.
///
/// Implement this trait to customize how your application handles
/// command line arguments. Every method except [`parse`](Self::parse) has a
/// default, so only the options you need have to be overridden.
///
/// # Example
///
/// ```ignore
/// use framelight_app::AppArgs;
/// use framelight_graphics::BackendType;
///
/// struct MyArgs {
///     software: bool,
/// }
///
/// impl AppArgs for MyArgs {
///     fn parse() -> Self {
///         Self {
///             software: std::env::args().any(|arg| arg == "--software"),
///         }
///     }
///
///     fn backend(&self) -> BackendType {
///         if self.software {
///             BackendType::Software
///         } else {
///             BackendType::Auto
///         }
///     }
/// }
/// ```
pub trait AppArgs: Sized {
    /// Parse command line arguments.
    fn parse() -> Self;

    /// Get the graphics backend to use.
    ///
    /// Default: `BackendType::Auto` (wgpu when available, else software)
    fn backend(&self) -> BackendType {
        BackendType::Auto
    }

    /// Get the initial window width.
    ///
    /// Default: 1280
    fn window_width(&self) -> u32 {
        1280
    }

    /// Get the initial window height.
    ///
    /// Default: 720
    fn window_height(&self) -> u32 {
        720
    }

    /// Get the window title.
    ///
    /// Default: "Framelight App"
    fn window_title(&self) -> &str {
        "Framelight App"
    }

    /// Number of back buffers.
    ///
    /// Default: 2
    fn buffer_count(&self) -> u32 {
        2
    }

    /// Back-buffer format.
    ///
    /// Default: `R8G8B8A8_UNORM`
    fn format(&self) -> TextureFormat {
        TextureFormat::R8G8B8A8_UNORM
    }

    /// Whether the surface carries a depth buffer.
    ///
    /// Default: true
    fn depth_buffer(&self) -> bool {
        true
    }

    /// Whether vsync is enabled.
    ///
    /// Default: true
    fn vsync(&self) -> bool {
        true
    }

    /// Maximum number of frames to render (for testing).
    ///
    /// Default: None (unlimited)
    fn max_frames(&self) -> Option<u64> {
        None
    }

    /// Whether to enable validation layers.
    ///
    /// Default: true in debug builds, false in release
    fn validation(&self) -> bool {
        cfg!(debug_assertions)
    }

    /// Texture to show, if any.
    ///
    /// Default: None
    fn texture(&self) -> Option<&Path> {
        None
    }

    /// Surface configuration assembled from the other options.
    fn surface_config(&self) -> SurfaceConfig {
        SurfaceConfig::new()
            .with_label(self.window_title())
            .with_buffer_count(self.buffer_count())
            .with_format(self.format())
            .with_depth_buffer(self.depth_buffer())
            .with_vsync(self.vsync())
            .with_device_parameters(
                DeviceParameters::new()
                    .with_backend(self.backend())
                    .with_validation(self.validation()),
            )
    }
}

// ============================================================================
// CLI Value Types
// ============================================================================

/// Graphics backend selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliBackend {
    /// Use wgpu when compiled in and an adapter is found, else software.
    #[default]
    Auto,
    /// Host-memory software backend. Renders headless.
    Software,
    /// wgpu GPU backend.
    Wgpu,
}

impl From<CliBackend> for BackendType {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Auto => BackendType::Auto,
            CliBackend::Software => BackendType::Software,
            CliBackend::Wgpu => BackendType::Wgpu,
        }
    }
}

/// Look up a catalog format by name, ignoring case.
///
/// Used as the clap value parser of `--format`.
pub fn parse_format(value: &str) -> Result<TextureFormat, String> {
    catalog()
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(value))
        .map(|info| TextureFormat::from_raw(info.id))
        .ok_or_else(|| format!("unknown texture format '{value}'"))
}

// ============================================================================
// Default App Args
// ============================================================================

/// Default command line arguments implementation.
///
/// # Examples
///
/// ```bash
/// # Show help
/// ./surface_viewer --help
///
/// # Show an image with the software backend
/// ./surface_viewer --backend software --texture sky.png
///
/// # Triple buffering, BGRA back buffer, no depth
/// ./surface_viewer --buffers 3 --format B8G8R8A8_UNORM --no-depth
///
/// # Run for 100 frames then exit (useful for testing)
/// ./surface_viewer --max-frames 100
/// ```
#[derive(Debug, Clone)]
pub struct DefaultAppArgs {
    backend: BackendType,
    width: u32,
    height: u32,
    title: String,
    buffer_count: u32,
    format: TextureFormat,
    depth_buffer: bool,
    vsync: bool,
    max_frames: Option<u64>,
    validation: bool,
    texture: Option<PathBuf>,
}

impl Default for DefaultAppArgs {
    fn default() -> Self {
        Self {
            backend: BackendType::Auto,
            width: 1280,
            height: 720,
            title: "Framelight App".to_string(),
            buffer_count: 2,
            format: TextureFormat::R8G8B8A8_UNORM,
            depth_buffer: true,
            vsync: true,
            max_frames: None,
            validation: cfg!(debug_assertions),
            texture: None,
        }
    }
}

impl DefaultAppArgs {
    /// Create new default args with a custom title.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the graphics backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the maximum number of frames.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Set the window title.
    pub fn with_title_str(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the texture to show.
    pub fn with_texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture = Some(path.into());
        self
    }
}

mod native {
    use super::*;
    use clap::Parser;

    /// Framelight surface viewer arguments.
    #[derive(Parser, Debug)]
    #[command(
        name = "Framelight App",
        about = "Framelight surface viewer",
        long_about = "Opens a window, follows its size with a presentation surface and \
            draws every frame into it.\n\n\
            BACKEND SELECTION:\n\
            \n\
            • wgpu: GPU backend presenting to the window. Requires the \
              'wgpu-backend' feature.\n\
            \n\
            • software: Host-memory backend. Renders headless; the window stays empty.\n\
            \n\
            • auto: wgpu when available, otherwise software.\n\
            \n\
            EXAMPLES:\n\
              # Show an image\n\
              ./surface_viewer --texture sky.png\n\
            \n\
              # Run headless test\n\
              ./surface_viewer --backend software --max-frames 10",
        version
    )]
    pub(super) struct ClapArgs {
        /// Graphics backend to use.
        #[arg(long, default_value = "auto", value_enum)]
        pub backend: CliBackend,

        /// Number of back buffers.
        #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..))]
        pub buffers: u32,

        /// Back-buffer format, by catalog name.
        #[arg(long, default_value = "R8G8B8A8_UNORM", value_parser = parse_format)]
        pub format: TextureFormat,

        /// Do not allocate a depth buffer.
        #[arg(long)]
        pub no_depth: bool,

        /// Initial window width in pixels.
        #[arg(long, default_value = "1280")]
        pub width: u32,

        /// Initial window height in pixels.
        #[arg(long, default_value = "720")]
        pub height: u32,

        /// Disable vertical sync (may cause tearing).
        #[arg(long)]
        pub no_vsync: bool,

        /// Exit after rendering N frames (useful for testing).
        #[arg(long)]
        pub max_frames: Option<u64>,

        /// Enable GPU validation layers (slower but helps catch bugs).
        #[arg(long, conflicts_with = "no_validation")]
        pub validation: bool,

        /// Disable GPU validation layers.
        #[arg(long, conflicts_with = "validation")]
        pub no_validation: bool,

        /// Image to draw over the whole window.
        #[arg(long)]
        pub texture: Option<PathBuf>,
    }

    impl From<ClapArgs> for DefaultAppArgs {
        fn from(args: ClapArgs) -> Self {
            if args.buffers == 1 {
                log::warn!("--buffers 1 presents a single buffer and may tear");
            }

            let validation = args.validation || (!args.no_validation && cfg!(debug_assertions));

            Self {
                backend: args.backend.into(),
                width: args.width,
                height: args.height,
                title: "Framelight App".to_string(),
                buffer_count: args.buffers,
                format: args.format,
                depth_buffer: !args.no_depth,
                vsync: !args.no_vsync,
                max_frames: args.max_frames,
                validation,
                texture: args.texture,
            }
        }
    }
}

impl AppArgs for DefaultAppArgs {
    fn parse() -> Self {
        use clap::Parser;
        native::ClapArgs::parse().into()
    }

    fn backend(&self) -> BackendType {
        self.backend
    }

    fn window_width(&self) -> u32 {
        self.width
    }

    fn window_height(&self) -> u32 {
        self.height
    }

    fn window_title(&self) -> &str {
        &self.title
    }

    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn depth_buffer(&self) -> bool {
        self.depth_buffer
    }

    fn vsync(&self) -> bool {
        self.vsync
    }

    fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    fn validation(&self) -> bool {
        self.validation
    }

    fn texture(&self) -> Option<&Path> {
        self.texture.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse_from(args: &[&str]) -> DefaultAppArgs {
        native::ClapArgs::try_parse_from(args).unwrap().into()
    }

    #[test]
    fn test_defaults() {
        let args = parse_from(&["app"]);
        assert_eq!(args.backend(), BackendType::Auto);
        assert_eq!(args.buffer_count(), 2);
        assert_eq!(args.format(), TextureFormat::R8G8B8A8_UNORM);
        assert!(args.depth_buffer());
        assert_eq!(args.max_frames(), None);
        assert!(args.texture().is_none());
        assert_eq!((args.window_width(), args.window_height()), (1280, 720));
    }

    #[test]
    fn test_surface_options() {
        let args = parse_from(&[
            "app",
            "--backend",
            "software",
            "--buffers",
            "3",
            "--format",
            "b8g8r8a8_unorm",
            "--no-depth",
            "--width",
            "320",
            "--height",
            "200",
            "--max-frames",
            "10",
            "--texture",
            "sky.png",
        ]);

        let config = args.surface_config();
        assert_eq!(config.device.backend, BackendType::Software);
        assert_eq!(config.buffer_count, 3);
        assert_eq!(config.format, TextureFormat::B8G8R8A8_UNORM);
        assert!(!config.depth_buffer);
        assert_eq!((args.window_width(), args.window_height()), (320, 200));
        assert_eq!(args.max_frames(), Some(10));
        assert_eq!(args.texture(), Some(Path::new("sky.png")));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(native::ClapArgs::try_parse_from(["app", "--buffers", "0"]).is_err());
        assert!(native::ClapArgs::try_parse_from(["app", "--format", "NOT_A_FORMAT"]).is_err());
        assert!(native::ClapArgs::try_parse_from(["app", "--backend", "vulkan"]).is_err());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(
            parse_format("R16G16B16A16_FLOAT"),
            Ok(TextureFormat::R16G16B16A16_FLOAT)
        );
        assert_eq!(parse_format("d32_float"), Ok(TextureFormat::D32_FLOAT));
        assert!(parse_format("UNKNOWN_FORMAT").is_err());
    }

    #[test]
    fn test_validation_flags() {
        assert!(parse_from(&["app", "--validation"]).validation());
        assert!(!parse_from(&["app", "--no-validation"]).validation());
    }
}
