//! Textures created from constant colors or caller-supplied pixels.

use crate::device::GraphicsDevice;
use crate::error::{GraphicsError, Result};
use crate::format::TextureFormat;
use crate::types::{
    Extent3d, SubresourceData, TextureDescriptor, TextureUsage, CUBE_FACE_COUNT,
};

use super::{CubeExtent, Extent2d, Texture2d, Texture3d, TextureCube};

/// Quantize `color` into one texel of an 8-bit four-channel `format`.
///
/// Channels are stored as `round(255 * clamp(c, 0, 1))` without any
/// transfer function, so an sRGB format receives the values as encoded.
fn solid_texel(color: [f32; 4], format: TextureFormat) -> Result<[u8; 4]> {
    let [r, g, b, a] = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    match format {
        TextureFormat::R8G8B8A8_TYPELESS
        | TextureFormat::R8G8B8A8_UNORM
        | TextureFormat::R8G8B8A8_UNORM_SRGB
        | TextureFormat::R8G8B8A8_UINT => Ok([r, g, b, a]),
        TextureFormat::B8G8R8A8_TYPELESS
        | TextureFormat::B8G8R8A8_UNORM
        | TextureFormat::B8G8R8A8_UNORM_SRGB => Ok([b, g, r, a]),
        _ => Err(GraphicsError::UnsupportedFormat(format)),
    }
}

/// Bytes of a tightly packed `extent` image in `format`.
fn packed_len(format: TextureFormat, extent: Extent3d) -> Result<usize> {
    let bytes_per_pixel = format
        .bytes_per_pixel()
        .ok_or(GraphicsError::UnsupportedFormat(format))?;
    Ok(extent.width as usize
        * extent.height as usize
        * extent.depth as usize
        * bytes_per_pixel as usize)
}

fn check_len(pixels: &[u8], expected: usize) -> Result<()> {
    if pixels.len() != expected {
        return Err(GraphicsError::InvalidParameter(format!(
            "pixel buffer holds {} bytes, expected {expected}",
            pixels.len()
        )));
    }
    Ok(())
}

impl Texture2d {
    /// A 1x1 texture holding `color`, for use as a placeholder.
    ///
    /// `format` must be an 8-bit RGBA or BGRA format; the usual choice is
    /// `R8G8B8A8_UNORM_SRGB`.
    pub fn from_solid_color(
        device: &GraphicsDevice,
        color: [f32; 4],
        format: TextureFormat,
    ) -> Result<Self> {
        let texel = solid_texel(color, format)?;
        let descriptor = TextureDescriptor::new_2d(1, 1, format, TextureUsage::SHADER_RESOURCE)
            .with_label("solid color")
            .immutable();
        let data = [SubresourceData::packed(&texel, format, 1, 1)];
        let mut texture = Self::new();
        texture.init_from_descriptor(device, Extent2d::new(1, 1), descriptor, &data)?;
        Ok(texture)
    }

    /// An immutable single-mip texture from tightly packed rows.
    pub fn from_memory(
        device: &GraphicsDevice,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) -> Result<Self> {
        check_len(pixels, packed_len(format, Extent3d::new_2d(width, height))?)?;
        let descriptor =
            TextureDescriptor::new_2d(width, height, format, TextureUsage::SHADER_RESOURCE)
                .immutable();
        let data = [SubresourceData::packed(pixels, format, width, height)];
        let mut texture = Self::new();
        texture.init_from_descriptor(device, Extent2d::new(width, height), descriptor, &data)?;
        Ok(texture)
    }
}

impl TextureCube {
    /// A 1x1 cube texture with `color` on every face.
    pub fn from_solid_color(
        device: &GraphicsDevice,
        color: [f32; 4],
        format: TextureFormat,
    ) -> Result<Self> {
        let texel = solid_texel(color, format)?;
        let faces = texel.repeat(CUBE_FACE_COUNT as usize);
        Self::from_faces(device, 1, format, &faces)
    }

    /// An immutable single-mip cube texture from six tightly packed faces.
    ///
    /// `pixels` holds the faces back to back in [`CubeFace`](super::CubeFace)
    /// order.
    pub fn from_faces(
        device: &GraphicsDevice,
        size: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) -> Result<Self> {
        let face_len = packed_len(format, Extent3d::new_2d(size, size))?;
        check_len(pixels, face_len * CUBE_FACE_COUNT as usize)?;
        let descriptor = TextureDescriptor::new_cube(size, format, TextureUsage::SHADER_RESOURCE)
            .immutable();
        let data: Vec<_> = pixels
            .chunks_exact(face_len)
            .map(|face| SubresourceData::packed(face, format, size, size))
            .collect();
        let mut texture = Self::new();
        texture.init_from_descriptor(device, CubeExtent::new(size), descriptor, &data)?;
        Ok(texture)
    }
}

impl Texture3d {
    /// An immutable single-mip volume texture from tightly packed slices.
    pub fn from_memory(
        device: &GraphicsDevice,
        extent: Extent3d,
        format: TextureFormat,
        pixels: &[u8],
    ) -> Result<Self> {
        check_len(pixels, packed_len(format, extent)?)?;
        let descriptor = TextureDescriptor::new_3d(
            extent.width,
            extent.height,
            extent.depth,
            format,
            TextureUsage::SHADER_RESOURCE,
        )
        .immutable();
        let data = [SubresourceData::packed(pixels, format, extent.width, extent.height)];
        let mut texture = Self::new();
        texture.init_from_descriptor(device, extent, descriptor, &data)?;
        Ok(texture)
    }
}
