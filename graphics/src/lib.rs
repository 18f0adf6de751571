//! # Framelight Graphics
//!
//! Surface and texture resource layer between a window and a graphics device.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`SurfaceManager`] - Owns the device, the back-buffer chain and the views
//!   derived from it, and rebuilds them on resize
//! - [`Texture2d`], [`TextureCube`], [`Texture3d`] - Texture resources with
//!   sampled and read-write views, creation helpers and CPU readback
//! - [`format`] - The pixel format catalog
//! - [`BlitPipeline`] - Textured rectangle copies into the bound target
//! - Multiple backend support: wgpu and a host-memory software backend
//!
//! ## Example
//!
//! ```ignore
//! use framelight_graphics::{SurfaceConfig, SurfaceManager, Texture2d, TextureFormat};
//!
//! let mut surface = SurfaceManager::init_headless(SurfaceConfig::new())?;
//! surface.resize(640, 480)?;
//!
//! let red = Texture2d::from_solid_color(
//!     surface.device(),
//!     [1.0, 0.0, 0.0, 1.0],
//!     TextureFormat::R8G8B8A8_UNORM_SRGB,
//! )?;
//! let mut pixel = [0u8; 4];
//! red.readback(surface.context(), 0, &mut pixel)?;
//! assert_eq!(pixel, [255, 0, 0, 255]);
//! ```

pub mod backend;
pub mod blit;
pub mod context;
pub mod device;
pub mod error;
pub mod format;
pub mod staging;
pub mod surface;
pub mod texture;
pub mod types;
pub mod view;

// Re-export main types for convenience
pub use backend::{BackendType, GpuTexture, SwapChainDescriptor};
pub use blit::{BlitFilter, BlitPipeline};
pub use context::DeviceContext;
pub use device::{DeviceCapabilities, DeviceParameters, GraphicsDevice};
pub use error::{GraphicsError, Result};
pub use format::TextureFormat;
pub use staging::{MappedSubresource, StagingTexture};
pub use surface::{SurfaceConfig, SurfaceManager, SurfaceState};
pub use texture::loader::{
    LoadError, LoadFlags, load_texture_2d, load_texture_2d_from_memory, load_texture_cube,
    load_texture_cube_from_memory,
};
pub use texture::{
    CubeExtent, CubeFace, Extent2d, Texture, Texture2d, Texture3d, TextureCube, TextureFlags,
    TextureShape,
};
pub use types::{
    Box2, Box3, Extent3d, SubresourceData, TextureDescriptor, TextureDimension, TextureUsage,
    ViewDescriptor, ViewDimension, Viewport, full_mip_count, mip_extent,
};
pub use view::{
    DepthStencilView, RenderTargetView, ShaderResourceView, TextureView, UnorderedAccessView,
    ViewId,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Framelight Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_headless_surface_round_trip() {
        let config = SurfaceConfig::new()
            .with_device_parameters(DeviceParameters::new().with_backend(BackendType::Software));
        let mut surface = SurfaceManager::init_headless(config).unwrap();
        surface.resize(64, 32).unwrap();

        let red = Texture2d::from_solid_color(
            surface.device(),
            [1.0, 0.0, 0.0, 1.0],
            TextureFormat::R8G8B8A8_UNORM_SRGB,
        )
        .unwrap();
        let mut pixel = [0u8; 4];
        red.readback(surface.context(), 0, &mut pixel).unwrap();
        assert_eq!(pixel, [255, 0, 0, 255]);
        surface.shutdown();
    }
}
