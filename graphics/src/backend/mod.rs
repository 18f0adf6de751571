//! GPU backend abstraction layer.
//!
//! Backends are selected at device creation and dispatched through enums
//! rather than trait objects, so each backend keeps its own concrete handle
//! types.
//!
//! # Available Backends
//!
//! - `software` (always built): host-memory textures for tests and headless tools
//! - `wgpu-backend`: cross-platform GPU backend using wgpu
//!
//! # Architecture
//!
//! Every resource handle is an enum with one variant per backend:
//! - [`GpuTexture`] for textures and back buffers
//! - [`GpuView`] for shader-resource, render-target, depth and UAV views
//! - [`GpuStaging`] for CPU-readable readback resources
//! - [`GpuSwapChain`] for back-buffer chains

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

pub mod software;

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::device::DeviceParameters;
#[cfg(not(feature = "wgpu-backend"))]
use crate::error::GraphicsError;
use crate::error::Result;
use crate::format::TextureFormat;
use crate::types::{TextureDescriptor, TextureUsage};

use software::{SoftSwapChain, SoftTexture, SoftwareBackend};

#[cfg(feature = "wgpu-backend")]
use wgpu_impl::{WgpuBackend, WgpuStaging, WgpuSwapChain, WgpuTexture};

/// Which backend a device should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Use wgpu when it is compiled in and an adapter is found, otherwise
    /// fall back to the software backend.
    #[default]
    Auto,
    /// Host-memory software backend.
    Software,
    /// wgpu GPU backend.
    Wgpu,
}

impl BackendType {
    /// Human-readable backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Software => "Software",
            Self::Wgpu => "wgpu",
        }
    }
}

/// A live backend.
pub enum GpuBackend {
    Software(SoftwareBackend),
    #[cfg(feature = "wgpu-backend")]
    Wgpu(WgpuBackend),
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software(backend) => f.debug_tuple("GpuBackend::Software").field(backend).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(backend) => f.debug_tuple("GpuBackend::Wgpu").field(backend).finish(),
        }
    }
}

/// Handle to a texture resource.
///
/// Cloning shares the underlying resource. Back buffers can only be resized
/// once every clone has been dropped.
#[derive(Clone)]
pub enum GpuTexture {
    Software(Arc<SoftTexture>),
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<WgpuTexture>),
}

impl GpuTexture {
    /// Creation descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        match self {
            Self::Software(texture) => texture.descriptor(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(texture) => texture.descriptor(),
        }
    }

    /// Number of live handles to the underlying resource.
    pub fn handle_count(&self) -> usize {
        match self {
            Self::Software(texture) => Arc::strong_count(texture),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(texture) => Arc::strong_count(texture),
        }
    }

    /// Whether both handles refer to the same resource.
    pub fn same_resource(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Software(a), Self::Software(b)) => Arc::ptr_eq(a, b),
            #[cfg(feature = "wgpu-backend")]
            (Self::Wgpu(a), Self::Wgpu(b)) => Arc::ptr_eq(a, b),
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }
}

impl std::fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software(texture) => f.debug_tuple("GpuTexture::Software").field(texture).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(texture) => f.debug_tuple("GpuTexture::Wgpu").field(texture).finish(),
        }
    }
}

/// Backend part of a texture view.
#[derive(Clone)]
pub enum GpuView {
    /// Software views need no backend object.
    Software,
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::TextureView>),
}

impl std::fmt::Debug for GpuView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software => write!(f, "GpuView::Software"),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(view) => f.debug_tuple("GpuView::Wgpu").field(view).finish(),
        }
    }
}

/// CPU-readable resource used for readback.
pub enum GpuStaging {
    Software(Arc<SoftTexture>),
    #[cfg(feature = "wgpu-backend")]
    Wgpu(WgpuStaging),
}

impl std::fmt::Debug for GpuStaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software(texture) => f.debug_tuple("GpuStaging::Software").field(texture).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(staging) => f.debug_tuple("GpuStaging::Wgpu").field(staging).finish(),
        }
    }
}

/// Back-buffer chain.
pub enum GpuSwapChain {
    Software(SoftSwapChain),
    #[cfg(feature = "wgpu-backend")]
    Wgpu(WgpuSwapChain),
}

impl std::fmt::Debug for GpuSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software(chain) => f.debug_tuple("GpuSwapChain::Software").field(chain).finish(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(chain) => f.debug_tuple("GpuSwapChain::Wgpu").field(chain).finish(),
        }
    }
}

impl GpuSwapChain {
    /// Handle to the current back buffer.
    pub fn back_buffer(&self) -> GpuTexture {
        match self {
            Self::Software(chain) => chain.back_buffer(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(chain) => chain.back_buffer(),
        }
    }
}

/// What the swap chain presents to.
pub enum PresentTarget {
    /// No window; frames are kept in the back buffer.
    Headless,
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu::Surface<'static>),
}

impl std::fmt::Debug for PresentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headless => write!(f, "PresentTarget::Headless"),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(_) => write!(f, "PresentTarget::Wgpu"),
        }
    }
}

/// Back-buffer chain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDescriptor {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Buffers in flight, including the one being drawn.
    pub buffer_count: u32,
    pub vsync: bool,
}

impl SwapChainDescriptor {
    pub fn new(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            buffer_count: 2,
            vsync: true,
        }
    }

    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Descriptor of the back buffer texture.
    pub fn back_buffer_descriptor(&self) -> TextureDescriptor {
        TextureDescriptor::new_2d(
            self.width,
            self.height,
            self.format,
            TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE,
        )
        .with_label("back buffer")
    }
}

/// Create the backend requested by `params`.
///
/// With [`BackendType::Auto`] a wgpu failure is logged and the software
/// backend is used instead. When `window` is given and the chosen backend can
/// present, the returned target presents to it.
pub(crate) fn create_backend<W>(
    params: &DeviceParameters,
    window: Option<W>,
) -> Result<(GpuBackend, PresentTarget)>
where
    W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
{
    match params.backend {
        BackendType::Software => {
            if window.is_some() {
                log::info!("Software backend renders headless; window output is disabled");
            }
            log::info!("Using software backend");
            Ok((GpuBackend::Software(SoftwareBackend::new()), PresentTarget::Headless))
        }
        BackendType::Wgpu => {
            #[cfg(feature = "wgpu-backend")]
            {
                let (backend, target) = WgpuBackend::new(params, window)?;
                log::info!("Using wgpu backend");
                Ok((GpuBackend::Wgpu(backend), target))
            }
            #[cfg(not(feature = "wgpu-backend"))]
            {
                let _ = window;
                Err(GraphicsError::InitializationFailed(
                    "wgpu backend is not compiled in (enable the `wgpu-backend` feature)".into(),
                ))
            }
        }
        BackendType::Auto => {
            #[cfg(feature = "wgpu-backend")]
            {
                match WgpuBackend::new(params, window) {
                    Ok((backend, target)) => {
                        log::info!("Using wgpu backend");
                        return Ok((GpuBackend::Wgpu(backend), target));
                    }
                    Err(e) => {
                        log::warn!("Failed to create wgpu backend: {}", e);
                    }
                }
            }
            #[cfg(not(feature = "wgpu-backend"))]
            let _ = window;

            log::info!("Using software backend");
            Ok((GpuBackend::Software(SoftwareBackend::new()), PresentTarget::Headless))
        }
    }
}

/// Whether a hardware backend is compiled in.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "wgpu-backend")
}
