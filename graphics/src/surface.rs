//! Window surface management.
//!
//! A [`SurfaceManager`] owns the graphics device, the device context, the
//! back-buffer chain and every view derived from the current back buffer:
//!
//! - a display render target, reading the back buffer as sRGB
//! - a linear render target over the same bytes
//! - optionally a depth texture with a depth-stencil view and a sampled view
//!
//! The derived views exist as one aggregate. A resize drops the whole
//! aggregate, resizes the chain and builds a new one; nothing observes a
//! partially rebuilt surface.
//!
//! # Example
//!
//! ```ignore
//! let config = SurfaceConfig::new().with_format(TextureFormat::R8G8B8A8_UNORM);
//! let mut surface = SurfaceManager::init(window.clone(), config)?;
//!
//! // On every resize notification from the windowing system:
//! surface.handle_resize_notification(width, height)?;
//!
//! // Per frame:
//! surface.bind_display_target()?;
//! // ... draw, blit ...
//! surface.present()?;
//! ```

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::{GpuSwapChain, GpuTexture, PresentTarget, SwapChainDescriptor};
use crate::context::DeviceContext;
use crate::device::{DeviceParameters, GraphicsDevice};
use crate::error::{GraphicsError, Result};
use crate::format::TextureFormat;
use crate::types::{
    Box2, Box3, TextureDescriptor, TextureUsage, ViewDescriptor, ViewDimension, Viewport,
};
use crate::view::{DepthStencilView, RenderTargetView, ShaderResourceView};

/// Storage format of the depth buffer.
const DEPTH_TEXTURE_FORMAT: TextureFormat = TextureFormat::R32_TYPELESS;
/// Format the depth buffer is written as.
const DEPTH_TARGET_FORMAT: TextureFormat = TextureFormat::D32_FLOAT;
/// Format the depth buffer is sampled as.
const DEPTH_SAMPLED_FORMAT: TextureFormat = TextureFormat::R32_FLOAT;

/// Size the chain is created at before the first resize notification.
const PLACEHOLDER_SIZE: u32 = 1;

// ============================================================================
// Configuration
// ============================================================================

/// Construction-time options of a [`SurfaceManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// Back buffers in the chain. Two or more avoids tearing.
    pub buffer_count: u32,
    /// Back-buffer format.
    pub format: TextureFormat,
    /// Allocate a depth buffer matching the back buffer.
    pub depth_buffer: bool,
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
    /// Device creation parameters.
    pub device: DeviceParameters,
    /// Debug label.
    pub label: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            buffer_count: 2,
            format: TextureFormat::R8G8B8A8_UNORM,
            depth_buffer: true,
            vsync: true,
            device: DeviceParameters::default(),
            label: "surface".to_string(),
        }
    }
}

impl SurfaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_depth_buffer(mut self, enabled: bool) -> Self {
        self.depth_buffer = enabled;
        self
    }

    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.vsync = enabled;
        self
    }

    pub fn with_device_parameters(mut self, params: DeviceParameters) -> Self {
        self.device = params;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn swap_chain_descriptor(&self, width: u32, height: u32) -> SwapChainDescriptor {
        SwapChainDescriptor::new(self.format, width, height)
            .with_buffer_count(self.buffer_count)
            .with_vsync(self.vsync)
    }
}

// ============================================================================
// Surface
// ============================================================================

/// Lifecycle state of a [`SurfaceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceState {
    /// Derived views exist and match the current dimensions.
    Ready,
    /// A resize failed. No derived views exist and binds fail.
    Lost,
}

struct DepthViews {
    texture: GpuTexture,
    target: DepthStencilView,
    sampled: ShaderResourceView,
}

/// Everything derived from the current back buffer.
struct SurfaceViews {
    back_buffer: GpuTexture,
    display: RenderTargetView,
    linear: RenderTargetView,
    depth: Option<DepthViews>,
}

/// Owner of a presentation surface and its device.
pub struct SurfaceManager {
    // Field order is drop order: bindings and views go before the chain.
    context: DeviceContext,
    views: Option<SurfaceViews>,
    chain: GpuSwapChain,
    device: Arc<GraphicsDevice>,
    config: SurfaceConfig,
    width: u32,
    height: u32,
    state: SurfaceState,
}

impl SurfaceManager {
    /// Create the device and a chain presenting to `window`.
    ///
    /// The chain starts at a 1x1 placeholder size; the real size arrives
    /// with the first resize notification.
    pub fn init<W>(window: W, config: SurfaceConfig) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let (device, target) = GraphicsDevice::with_window(config.device.clone(), window)?;
        Self::create(device, target, config)
    }

    /// Create the device and a chain that renders off-screen.
    pub fn init_headless(config: SurfaceConfig) -> Result<Self> {
        let device = GraphicsDevice::new(config.device.clone())?;
        Self::create(device, PresentTarget::Headless, config)
    }

    fn create(
        device: Arc<GraphicsDevice>,
        target: PresentTarget,
        config: SurfaceConfig,
    ) -> Result<Self> {
        if config.buffer_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "surface needs at least one buffer".into(),
            ));
        }
        if config.buffer_count < 2 {
            log::warn!(
                "Surface '{}' uses a single buffer; presentation may tear",
                config.label
            );
        }

        let descriptor = config.swap_chain_descriptor(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE);
        let chain = device.create_swap_chain(target, &descriptor)?;
        let context = DeviceContext::new(Arc::clone(&device));
        let views = build_views(&device, &config, &chain, PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)?;

        log::info!(
            "Initialized surface '{}' on {}: {}, {} buffer(s), depth {}",
            config.label,
            device.backend_name(),
            config.format,
            config.buffer_count,
            if config.depth_buffer { "on" } else { "off" }
        );
        Ok(Self {
            context,
            views: Some(views),
            chain,
            device,
            config,
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            state: SurfaceState::Ready,
        })
    }

    // ------------------------------------------------------------------------
    // Resize
    // ------------------------------------------------------------------------

    /// React to a window size notification.
    ///
    /// Minimised windows (a zero dimension) and unchanged sizes are skipped.
    /// Returns whether the surface was resized.
    pub fn handle_resize_notification(&mut self, width: u32, height: u32) -> Result<bool> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize of '{}' to {width}x{height}", self.config.label);
            return Ok(false);
        }
        if self.state == SurfaceState::Ready && (width, height) == self.dimensions() {
            return Ok(false);
        }
        self.resize(width, height)?;
        Ok(true)
    }

    /// Resize the chain and rebuild every derived view.
    ///
    /// Resizing to the current size is a no-op. Dimensions must be non-zero
    /// and within the device limits. Any failure after the old views are
    /// released leaves the surface [`Lost`](SurfaceState::Lost) and returns
    /// a fatal error.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let limit = self.device.capabilities().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > limit || height > limit {
            return Err(GraphicsError::InvalidParameter(format!(
                "surface size {width}x{height} outside 1..={limit}"
            )));
        }
        if self.state == SurfaceState::Ready && (width, height) == self.dimensions() {
            return Ok(());
        }

        log::debug!(
            "Resizing surface '{}' from {}x{} to {width}x{height}",
            self.config.label,
            self.width,
            self.height
        );
        // Nothing may reference the old back buffer once the chain resizes.
        self.context.unbind_render_targets();
        self.views = None;

        match self.rebuild(width, height) {
            Ok(views) => {
                self.views = Some(views);
                self.width = width;
                self.height = height;
                self.state = SurfaceState::Ready;
                Ok(())
            }
            Err(err) => {
                log::error!("Surface '{}' lost during resize: {err}", self.config.label);
                self.state = SurfaceState::Lost;
                Err(if err.is_fatal() {
                    err
                } else {
                    GraphicsError::ResourceCreationFailed(err.to_string())
                })
            }
        }
    }

    fn rebuild(&mut self, width: u32, height: u32) -> Result<SurfaceViews> {
        let descriptor = self.config.swap_chain_descriptor(width, height);
        self.device.resize_swap_chain(&mut self.chain, &descriptor)?;
        log::debug!("Resized chain of '{}'", self.config.label);
        build_views(&self.device, &self.config, &self.chain, width, height)
    }

    // ------------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------------

    /// Draw to the display (sRGB) target and the depth buffer, over the
    /// whole surface.
    pub fn bind_display_target(&mut self) -> Result<()> {
        let views = self.views.as_ref().ok_or(GraphicsError::DeviceLost)?;
        self.context
            .set_render_targets(Some(&views.display), views.depth.as_ref().map(|d| &d.target));
        self.context
            .set_viewport(Viewport::from_dimensions(self.width, self.height));
        Ok(())
    }

    /// Draw to the linear target and the depth buffer, over the whole
    /// surface.
    pub fn bind_linear_target(&mut self) -> Result<()> {
        let views = self.views.as_ref().ok_or(GraphicsError::DeviceLost)?;
        self.context
            .set_render_targets(Some(&views.linear), views.depth.as_ref().map(|d| &d.target));
        self.context
            .set_viewport(Viewport::from_dimensions(self.width, self.height));
        Ok(())
    }

    /// Restrict drawing to `region`, in pixels.
    pub fn set_viewport(&mut self, region: Box2) {
        self.context.set_viewport(Viewport::from_box(region));
    }

    /// Restrict drawing to `region`; its z range becomes the depth range.
    pub fn set_viewport_3d(&mut self, region: Box3) {
        self.context.set_viewport(Viewport::from_box3(region));
    }

    // ------------------------------------------------------------------------
    // Presentation
    // ------------------------------------------------------------------------

    /// Show the back buffer.
    pub fn present(&mut self) -> Result<()> {
        if self.state == SurfaceState::Lost {
            return Err(GraphicsError::DeviceLost);
        }
        self.device.present(&mut self.chain)
    }

    /// Tear down the surface. Views are released before the chain.
    pub fn shutdown(mut self) {
        self.context.unbind_render_targets();
        self.views = None;
        log::info!("Shut down surface '{}'", self.config.label);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Back-buffer format.
    pub fn format(&self) -> TextureFormat {
        self.config.format
    }

    pub fn buffer_count(&self) -> u32 {
        self.config.buffer_count
    }

    pub fn has_depth_buffer(&self) -> bool {
        self.config.depth_buffer
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn display_target(&self) -> Option<&RenderTargetView> {
        self.views.as_ref().map(|views| &views.display)
    }

    pub fn linear_target(&self) -> Option<&RenderTargetView> {
        self.views.as_ref().map(|views| &views.linear)
    }

    pub fn depth_stencil_view(&self) -> Option<&DepthStencilView> {
        self.views
            .as_ref()
            .and_then(|views| views.depth.as_ref())
            .map(|depth| &depth.target)
    }

    /// The depth buffer as a sampled `R32_FLOAT` view.
    pub fn depth_shader_view(&self) -> Option<&ShaderResourceView> {
        self.views
            .as_ref()
            .and_then(|views| views.depth.as_ref())
            .map(|depth| &depth.sampled)
    }

    pub fn depth_texture(&self) -> Option<&GpuTexture> {
        self.views
            .as_ref()
            .and_then(|views| views.depth.as_ref())
            .map(|depth| &depth.texture)
    }

    pub fn back_buffer(&self) -> Option<&GpuTexture> {
        self.views.as_ref().map(|views| &views.back_buffer)
    }

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    pub fn context(&self) -> &DeviceContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut DeviceContext {
        &mut self.context
    }
}

impl std::fmt::Debug for SurfaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceManager")
            .field("label", &self.config.label)
            .field("dimensions", &self.dimensions())
            .field("format", &self.config.format)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Create the render-target and depth views for the chain's back buffer.
fn build_views(
    device: &GraphicsDevice,
    config: &SurfaceConfig,
    chain: &GpuSwapChain,
    width: u32,
    height: u32,
) -> Result<SurfaceViews> {
    let back_buffer = chain.back_buffer();
    let display = device.create_render_target_view(
        &back_buffer,
        &ViewDescriptor::new(config.format.srgb_variant(), ViewDimension::D2)
            .with_label("display target"),
    )?;
    let linear = device.create_render_target_view(
        &back_buffer,
        &ViewDescriptor::new(config.format.linear_variant(), ViewDimension::D2)
            .with_label("linear target"),
    )?;

    let depth = if config.depth_buffer {
        let texture = device.create_texture(
            &TextureDescriptor::new_2d(
                width,
                height,
                DEPTH_TEXTURE_FORMAT,
                TextureUsage::DEPTH_STENCIL | TextureUsage::SHADER_RESOURCE,
            )
            .with_label("depth buffer"),
            &[],
        )?;
        let target = device.create_depth_stencil_view(
            &texture,
            &ViewDescriptor::new(DEPTH_TARGET_FORMAT, ViewDimension::D2).with_label("depth target"),
        )?;
        let sampled = device.create_shader_resource_view(
            &texture,
            &ViewDescriptor::new(DEPTH_SAMPLED_FORMAT, ViewDimension::D2).with_label("depth srv"),
        )?;
        Some(DepthViews {
            texture,
            target,
            sampled,
        })
    } else {
        None
    };

    log::debug!("Created views for {width}x{height} back buffer");
    Ok(SurfaceViews {
        back_buffer,
        display,
        linear,
        depth,
    })
}
