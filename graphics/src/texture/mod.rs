//! Texture resources.
//!
//! [`Texture`] owns a GPU texture together with its sampled view and an
//! optional read-write view. It is generic over its shape, giving the
//! [`Texture2d`], [`TextureCube`] and [`Texture3d`] variants one contract:
//!
//! - `init` allocates storage (optionally with a full mip chain)
//! - `release` drops everything and returns to the uninitialised state
//! - `readback` copies one subresource into a tightly packed CPU buffer
//!
//! # Example
//!
//! ```ignore
//! let mut texture = Texture2d::new();
//! texture.init(&device, Extent2d::new(256, 128), TextureFormat::R8G8B8A8_UNORM, TextureFlags::MIPMAPS)?;
//! assert_eq!(texture.mip_levels(), 9);
//!
//! let mut pixels = vec![0u8; texture.mip_byte_size(3)?];
//! texture.readback(&ctx, 3, &mut pixels)?;
//! ```

mod create;
pub mod loader;

use bitflags::bitflags;

use crate::backend::GpuTexture;
use crate::context::DeviceContext;
use crate::device::GraphicsDevice;
use crate::error::{GraphicsError, Result};
use crate::format::TextureFormat;
use crate::types::{
    Extent3d, SubresourceData, TextureDescriptor, TextureDimension, TextureUsage, ViewDescriptor,
    ViewDimension, CUBE_FACE_COUNT,
};
use crate::view::{ShaderResourceView, UnorderedAccessView};

bitflags! {
    /// Options for [`Texture::init`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureFlags: u32 {
        /// Allocate the full mip chain down to 1x1.
        const MIPMAPS = 1 << 0;
        /// Also create a read-write view of mip 0.
        const UNORDERED_ACCESS = 1 << 1;
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Size of a texture variant.
pub trait TextureShape: Copy + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Storage dimensionality.
    const DIMENSION: TextureDimension;
    /// Dimensionality of the sampled view.
    const SAMPLED_VIEW: ViewDimension;
    /// Dimensionality of the read-write view.
    const STORAGE_VIEW: ViewDimension;

    /// Descriptor of a single-mip texture of this shape.
    fn descriptor(&self, format: TextureFormat, usage: TextureUsage) -> TextureDescriptor;

    /// Shape of an existing texture, if its dimensionality matches.
    fn from_descriptor(descriptor: &TextureDescriptor) -> Option<Self>;
}

/// Width and height of a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Edge length of a cube texture's square faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CubeExtent {
    pub size: u32,
}

impl CubeExtent {
    pub const fn new(size: u32) -> Self {
        Self { size }
    }
}

impl TextureShape for Extent2d {
    const DIMENSION: TextureDimension = TextureDimension::D2;
    const SAMPLED_VIEW: ViewDimension = ViewDimension::D2;
    const STORAGE_VIEW: ViewDimension = ViewDimension::D2;

    fn descriptor(&self, format: TextureFormat, usage: TextureUsage) -> TextureDescriptor {
        TextureDescriptor::new_2d(self.width, self.height, format, usage)
    }

    fn from_descriptor(descriptor: &TextureDescriptor) -> Option<Self> {
        (descriptor.dimension == TextureDimension::D2)
            .then(|| Self::new(descriptor.size.width, descriptor.size.height))
    }
}

impl TextureShape for CubeExtent {
    const DIMENSION: TextureDimension = TextureDimension::Cube;
    const SAMPLED_VIEW: ViewDimension = ViewDimension::Cube;
    const STORAGE_VIEW: ViewDimension = ViewDimension::D2Array;

    fn descriptor(&self, format: TextureFormat, usage: TextureUsage) -> TextureDescriptor {
        TextureDescriptor::new_cube(self.size, format, usage)
    }

    fn from_descriptor(descriptor: &TextureDescriptor) -> Option<Self> {
        (descriptor.dimension == TextureDimension::Cube).then(|| Self::new(descriptor.size.width))
    }
}

impl TextureShape for Extent3d {
    const DIMENSION: TextureDimension = TextureDimension::D3;
    const SAMPLED_VIEW: ViewDimension = ViewDimension::D3;
    const STORAGE_VIEW: ViewDimension = ViewDimension::D3;

    fn descriptor(&self, format: TextureFormat, usage: TextureUsage) -> TextureDescriptor {
        TextureDescriptor::new_3d(self.width, self.height, self.depth, format, usage)
    }

    fn from_descriptor(descriptor: &TextureDescriptor) -> Option<Self> {
        (descriptor.dimension == TextureDimension::D3).then_some(descriptor.size)
    }
}

/// Cube face, in array-layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// All faces in array-layer order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of this face.
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

// ============================================================================
// Texture
// ============================================================================

struct TextureInner<S> {
    shape: S,
    mip_levels: u32,
    format: TextureFormat,
    texture: GpuTexture,
    srv: ShaderResourceView,
    uav: Option<UnorderedAccessView>,
}

/// A texture resource with its views.
///
/// An uninitialised or released texture owns nothing; every accessor then
/// reports the empty state (`None`, zero mips, `UNKNOWN` format).
pub struct Texture<S: TextureShape> {
    inner: Option<TextureInner<S>>,
}

/// A 2D texture.
pub type Texture2d = Texture<Extent2d>;
/// A cube texture.
pub type TextureCube = Texture<CubeExtent>;
/// A volume texture.
pub type Texture3d = Texture<Extent3d>;

impl<S: TextureShape> Default for Texture<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TextureShape> Texture<S> {
    /// An uninitialised texture.
    pub const fn new() -> Self {
        Self { inner: None }
    }

    /// Allocate storage and views, replacing any previous contents.
    ///
    /// With [`TextureFlags::MIPMAPS`] the full chain is allocated (contents
    /// are left zeroed). With [`TextureFlags::UNORDERED_ACCESS`] a read-write
    /// view of mip 0 is created as well.
    pub fn init(
        &mut self,
        device: &GraphicsDevice,
        shape: S,
        format: TextureFormat,
        flags: TextureFlags,
    ) -> Result<()> {
        let mut usage = TextureUsage::SHADER_RESOURCE;
        if flags.contains(TextureFlags::UNORDERED_ACCESS) {
            usage |= TextureUsage::UNORDERED_ACCESS;
        }
        let mut descriptor = shape.descriptor(format, usage);
        if flags.contains(TextureFlags::MIPMAPS) {
            descriptor = descriptor.with_full_mip_chain();
        }
        self.init_from_descriptor(device, shape, descriptor, &[])
    }

    /// Allocate from a full descriptor and per-subresource contents.
    pub(crate) fn init_from_descriptor(
        &mut self,
        device: &GraphicsDevice,
        shape: S,
        descriptor: TextureDescriptor,
        initial_data: &[SubresourceData<'_>],
    ) -> Result<()> {
        self.release();

        let texture = device.create_texture(&descriptor, initial_data)?;
        let srv = device.create_shader_resource_view(
            &texture,
            &ViewDescriptor::new(descriptor.format, S::SAMPLED_VIEW),
        )?;
        let uav = if descriptor.usage.contains(TextureUsage::UNORDERED_ACCESS) {
            Some(device.create_unordered_access_view(
                &texture,
                &ViewDescriptor::new(descriptor.format, S::STORAGE_VIEW).with_mips(0, 1),
            )?)
        } else {
            None
        };

        log::debug!(
            "Initialized {:?} texture {:?}: {:?}, {} mip(s), {}",
            S::DIMENSION,
            descriptor.label,
            shape,
            descriptor.mip_level_count,
            descriptor.format
        );
        self.inner = Some(TextureInner {
            shape,
            mip_levels: descriptor.mip_level_count,
            format: descriptor.format,
            texture,
            srv,
            uav,
        });
        Ok(())
    }

    /// Drop the texture and its views. Does nothing if already released.
    pub fn release(&mut self) {
        self.inner = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.is_some()
    }

    /// Shape of the allocated texture.
    pub fn shape(&self) -> Option<S> {
        self.inner.as_ref().map(|inner| inner.shape)
    }

    /// Mip level count, or 0 when uninitialised.
    pub fn mip_levels(&self) -> u32 {
        self.inner.as_ref().map_or(0, |inner| inner.mip_levels)
    }

    /// Pixel format, or `UNKNOWN` when uninitialised.
    pub fn format(&self) -> TextureFormat {
        self.inner
            .as_ref()
            .map_or(TextureFormat::UNKNOWN, |inner| inner.format)
    }

    pub fn gpu_texture(&self) -> Option<&GpuTexture> {
        self.inner.as_ref().map(|inner| &inner.texture)
    }

    /// View for sampling every mip.
    pub fn shader_resource_view(&self) -> Option<&ShaderResourceView> {
        self.inner.as_ref().map(|inner| &inner.srv)
    }

    /// Read-write view, if requested at creation.
    pub fn unordered_access_view(&self) -> Option<&UnorderedAccessView> {
        self.inner.as_ref().and_then(|inner| inner.uav.as_ref())
    }

    /// Size of mip `mip` of one layer.
    pub fn mip_extent(&self, mip: u32) -> Option<Extent3d> {
        let inner = self.inner.as_ref()?;
        (mip < inner.mip_levels).then(|| inner.texture.descriptor().mip_size(mip))
    }

    /// Bytes [`readback`](Texture2d::readback) writes for mip `mip` of one layer.
    pub fn mip_byte_size(&self, mip: u32) -> Result<usize> {
        let inner = self.initialized()?;
        let bytes_per_pixel = inner
            .format
            .bytes_per_pixel()
            .ok_or(GraphicsError::UnsupportedFormat(inner.format))?;
        let extent = self.checked_extent(inner, mip)?;
        Ok(packed_size(extent, bytes_per_pixel))
    }

    fn initialized(&self) -> Result<&TextureInner<S>> {
        self.inner.as_ref().ok_or_else(|| {
            GraphicsError::InvalidParameter("texture is not initialized".into())
        })
    }

    fn checked_extent(&self, inner: &TextureInner<S>, mip: u32) -> Result<Extent3d> {
        if mip >= inner.mip_levels {
            return Err(GraphicsError::InvalidParameter(format!(
                "mip level {mip} out of range (texture has {})",
                inner.mip_levels
            )));
        }
        Ok(inner.texture.descriptor().mip_size(mip))
    }

    /// Copy mip `mip` of array layer `layer` into `out`, tightly packed.
    ///
    /// Blocks until the GPU has finished writing the subresource. Rows (and
    /// for volumes, slices) are copied one at a time since the mapped pitch
    /// can be larger than the packed size.
    fn readback_layer(
        &self,
        ctx: &DeviceContext,
        mip: u32,
        layer: u32,
        out: &mut [u8],
    ) -> Result<()> {
        let inner = self.initialized()?;
        let extent = self.checked_extent(inner, mip)?;
        let bytes_per_pixel = inner
            .format
            .bytes_per_pixel()
            .ok_or(GraphicsError::UnsupportedFormat(inner.format))?;

        let row_size = (extent.width * bytes_per_pixel) as usize;
        let slice_size = row_size * extent.height as usize;
        let expected = packed_size(extent, bytes_per_pixel);
        if out.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "readback buffer holds {} bytes, mip {mip} needs {expected}",
                out.len()
            )));
        }

        let staging = ctx
            .device()
            .create_staging_texture(inner.format, extent)?;
        ctx.copy_subresource(&staging, &inner.texture, mip, layer)?;
        let mapped = ctx.map_read(&staging)?;

        if (mapped.row_pitch() as usize) < row_size
            || (extent.depth > 1 && (mapped.depth_pitch() as usize) < slice_size)
        {
            return Err(GraphicsError::Internal(format!(
                "mapped pitches {}/{} smaller than packed row {row_size}",
                mapped.row_pitch(),
                mapped.depth_pitch()
            )));
        }
        for z in 0..extent.depth {
            for y in 0..extent.height {
                let start = z as usize * slice_size + y as usize * row_size;
                out[start..start + row_size].copy_from_slice(mapped.row(z, y, row_size));
            }
        }
        Ok(())
    }
}

fn packed_size(extent: Extent3d, bytes_per_pixel: u32) -> usize {
    extent.width as usize * bytes_per_pixel as usize * extent.height as usize * extent.depth as usize
}

impl<S: TextureShape> std::fmt::Debug for Texture<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("Texture")
                .field("shape", &inner.shape)
                .field("mip_levels", &inner.mip_levels)
                .field("format", &inner.format)
                .field("srv", &inner.srv.id())
                .field("uav", &inner.uav.as_ref().map(|uav| uav.id()))
                .finish(),
            None => write!(f, "Texture(uninitialized)"),
        }
    }
}

impl Texture2d {
    pub fn width(&self) -> u32 {
        self.shape().map_or(0, |shape| shape.width)
    }

    pub fn height(&self) -> u32 {
        self.shape().map_or(0, |shape| shape.height)
    }

    /// Copy mip `mip` into `out` as tightly packed rows.
    pub fn readback(&self, ctx: &DeviceContext, mip: u32, out: &mut [u8]) -> Result<()> {
        self.readback_layer(ctx, mip, 0, out)
    }
}

impl TextureCube {
    /// Edge length of mip 0.
    pub fn size(&self) -> u32 {
        self.shape().map_or(0, |shape| shape.size)
    }

    /// Copy mip `mip` of `face` into `out` as tightly packed rows.
    pub fn readback(
        &self,
        ctx: &DeviceContext,
        face: CubeFace,
        mip: u32,
        out: &mut [u8],
    ) -> Result<()> {
        debug_assert!(face.index() < CUBE_FACE_COUNT);
        self.readback_layer(ctx, mip, face.index(), out)
    }
}

impl Texture3d {
    pub fn width(&self) -> u32 {
        self.shape().map_or(0, |shape| shape.width)
    }

    pub fn height(&self) -> u32 {
        self.shape().map_or(0, |shape| shape.height)
    }

    pub fn depth(&self) -> u32 {
        self.shape().map_or(0, |shape| shape.depth)
    }

    /// Copy mip `mip` into `out` as tightly packed rows, slice after slice.
    pub fn readback(&self, ctx: &DeviceContext, mip: u32, out: &mut [u8]) -> Result<()> {
        self.readback_layer(ctx, mip, 0, out)
    }
}

static_assertions::assert_impl_all!(Texture2d: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::BackendType;
    use crate::device::DeviceParameters;

    fn device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(DeviceParameters::new().with_backend(BackendType::Software)).unwrap()
    }

    #[test]
    fn test_uninitialized_state() {
        let texture = Texture2d::new();
        assert!(!texture.is_initialized());
        assert_eq!(texture.mip_levels(), 0);
        assert_eq!(texture.format(), TextureFormat::UNKNOWN);
        assert_eq!(texture.width(), 0);
        assert!(texture.shader_resource_view().is_none());
    }

    #[test]
    fn test_init_with_mips_and_uav() {
        let device = device();
        let mut texture = Texture2d::new();
        texture
            .init(
                &device,
                Extent2d::new(256, 100),
                TextureFormat::R8G8B8A8_UNORM,
                TextureFlags::MIPMAPS | TextureFlags::UNORDERED_ACCESS,
            )
            .unwrap();
        assert_eq!(texture.mip_levels(), 9);
        assert_eq!(texture.shader_resource_view().unwrap().range().mip_level_count, 9);
        assert!(texture.unordered_access_view().is_some());
        assert_eq!(texture.mip_extent(8), Some(Extent3d::new_2d(1, 1)));
    }

    #[test]
    fn test_release_is_idempotent() {
        let device = device();
        let mut texture = TextureCube::new();
        texture
            .init(
                &device,
                CubeExtent::new(8),
                TextureFormat::R8G8B8A8_UNORM,
                TextureFlags::empty(),
            )
            .unwrap();
        assert_eq!(texture.size(), 8);
        texture.release();
        texture.release();
        assert!(!texture.is_initialized());
        assert_eq!(texture.size(), 0);
    }

    #[test]
    fn test_readback_preconditions() {
        let device = device();
        let ctx = DeviceContext::new(device.clone());
        let mut texture = Texture2d::new();
        let mut out = vec![0u8; 16];
        assert!(texture.readback(&ctx, 0, &mut out).is_err());

        texture
            .init(
                &device,
                Extent2d::new(2, 2),
                TextureFormat::R8G8B8A8_UNORM,
                TextureFlags::empty(),
            )
            .unwrap();
        assert!(texture.readback(&ctx, 1, &mut out).is_err());
        assert!(texture.readback(&ctx, 0, &mut out[..15]).is_err());
        assert!(texture.readback(&ctx, 0, &mut out).is_ok());
    }

    #[test]
    fn test_cube_face_indices() {
        assert_eq!(CubeFace::PositiveX.index(), 0);
        assert_eq!(CubeFace::NegativeZ.index(), 5);
        assert_eq!(CubeFace::from_index(3), Some(CubeFace::NegativeY));
        assert_eq!(CubeFace::from_index(6), None);
    }
}
