//! Texture loading from encoded images.
//!
//! PNG, JPEG and Radiance HDR files are decoded with the `image` crate and
//! uploaded as immutable textures. The storage format follows the
//! [`LoadFlags`]:
//!
//! | flags  | format                |
//! |--------|-----------------------|
//! | `HDR`  | `R16G16B16A16_FLOAT`  |
//! | `SRGB` | `R8G8B8A8_UNORM_SRGB` |
//! | none   | `R8G8B8A8_UNORM`      |
//!
//! Failures are returned as [`LoadError`] so the caller can substitute a
//! placeholder such as [`Texture2d::from_solid_color`].

use std::path::Path;

use bitflags::bitflags;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba32FImage};

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::format::{TextureFormat, linear_to_srgb, srgb_to_linear};
use crate::types::{
    SubresourceData, TextureDescriptor, TextureUsage, full_mip_count, mip_extent,
};

use super::{CubeExtent, Extent2d, Texture2d, TextureCube, TextureShape};

bitflags! {
    /// Options for the texture loaders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LoadFlags: u32 {
        /// Generate the full mip chain.
        const MIPMAPS = 1 << 0;
        /// Pixels are sRGB-encoded.
        const SRGB = 1 << 1;
        /// Pixels are linear high dynamic range values.
        const HDR = 1 << 2;
    }
}

/// Why a texture could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("couldn't read texture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't decode texture {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("texture {path} ({width}x{height}) does not have the requested shape")]
    ShapeMismatch {
        path: String,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Graphics(#[from] GraphicsError),
}

/// Label used for textures decoded from memory.
const MEMORY_SOURCE: &str = "<memory>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Unorm,
    Srgb,
    Hdr,
}

impl Encoding {
    fn from_flags(flags: LoadFlags) -> Self {
        if flags.contains(LoadFlags::HDR) {
            if flags.contains(LoadFlags::SRGB) {
                log::warn!("HDR textures are stored linear; ignoring the sRGB flag");
            }
            Self::Hdr
        } else if flags.contains(LoadFlags::SRGB) {
            Self::Srgb
        } else {
            Self::Unorm
        }
    }

    fn format(self) -> TextureFormat {
        match self {
            Self::Unorm => TextureFormat::R8G8B8A8_UNORM,
            Self::Srgb => TextureFormat::R8G8B8A8_UNORM_SRGB,
            Self::Hdr => TextureFormat::R16G16B16A16_FLOAT,
        }
    }

    /// Pixels of `image` in this encoding.
    fn encode_base(self, image: &DynamicImage) -> Vec<u8> {
        match self {
            Self::Unorm | Self::Srgb => image.to_rgba8().into_raw(),
            Self::Hdr => encode_half(image.to_rgba32f().as_raw()),
        }
    }

    /// Pixels of a filtered level, stored as linear floats.
    fn encode_filtered(self, level: &Rgba32FImage) -> Vec<u8> {
        let unorm8 = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        match self {
            Self::Unorm => level.as_raw().iter().map(|&c| unorm8(c)).collect(),
            Self::Srgb => level
                .pixels()
                .flat_map(|pixel| {
                    let [r, g, b, a] = pixel.0;
                    [
                        unorm8(linear_to_srgb(r)),
                        unorm8(linear_to_srgb(g)),
                        unorm8(linear_to_srgb(b)),
                        unorm8(a),
                    ]
                })
                .collect(),
            Self::Hdr => encode_half(level.as_raw()),
        }
    }
}

fn encode_half(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&c| half::f16::from_f32(c).to_le_bytes())
        .collect()
}

/// Every mip of `image`, tightly packed, largest first.
///
/// Level 0 keeps the decoded pixels. Smaller levels are filtered with a
/// triangle kernel from the previous level, in linear space.
fn build_mip_chain(image: &DynamicImage, encoding: Encoding, mip_levels: u32) -> Vec<Vec<u8>> {
    let mut levels = Vec::with_capacity(mip_levels as usize);
    levels.push(encoding.encode_base(image));
    if mip_levels == 1 {
        return levels;
    }

    let mut current = image.to_rgba32f();
    if encoding == Encoding::Srgb {
        for pixel in current.pixels_mut() {
            for channel in &mut pixel.0[..3] {
                *channel = srgb_to_linear(*channel);
            }
        }
    }
    for level in 1..mip_levels {
        let width = mip_extent(image.width(), level);
        let height = mip_extent(image.height(), level);
        current = image::imageops::resize(&current, width, height, FilterType::Triangle);
        levels.push(encoding.encode_filtered(&current));
    }
    levels
}

fn decode(bytes: &[u8], path: &str) -> Result<DynamicImage, LoadError> {
    image::load_from_memory(bytes).map_err(|source| LoadError::Decode {
        path: path.to_string(),
        source,
    })
}

fn read(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Log the outcome of a load.
fn report<S: TextureShape>(
    result: Result<super::Texture<S>, LoadError>,
    path: &str,
) -> Result<super::Texture<S>, LoadError> {
    match &result {
        Ok(texture) => {
            let extent = texture.mip_extent(0).unwrap_or_default();
            log::info!(
                "Loaded {:?} texture {} - {}x{}, format {}, {} mip levels",
                S::DIMENSION,
                path,
                extent.width,
                extent.height,
                texture.format(),
                texture.mip_levels()
            );
        }
        Err(err) => log::warn!("{err}"),
    }
    result
}

// ============================================================================
// 2D
// ============================================================================

/// Load a 2D texture from an image file.
pub fn load_texture_2d(
    device: &GraphicsDevice,
    path: impl AsRef<Path>,
    flags: LoadFlags,
) -> Result<Texture2d, LoadError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let result = read(path).and_then(|bytes| texture_2d_from_bytes(device, &bytes, &name, flags));
    report(result, &name)
}

/// Load a 2D texture from an encoded image in memory.
pub fn load_texture_2d_from_memory(
    device: &GraphicsDevice,
    bytes: &[u8],
    flags: LoadFlags,
) -> Result<Texture2d, LoadError> {
    report(
        texture_2d_from_bytes(device, bytes, MEMORY_SOURCE, flags),
        MEMORY_SOURCE,
    )
}

fn texture_2d_from_bytes(
    device: &GraphicsDevice,
    bytes: &[u8],
    name: &str,
    flags: LoadFlags,
) -> Result<Texture2d, LoadError> {
    let image = decode(bytes, name)?;
    let encoding = Encoding::from_flags(flags);
    let format = encoding.format();
    let (width, height) = (image.width(), image.height());
    let mip_levels = if flags.contains(LoadFlags::MIPMAPS) {
        full_mip_count(width.max(height))
    } else {
        1
    };

    let levels = build_mip_chain(&image, encoding, mip_levels);
    let data: Vec<_> = levels
        .iter()
        .zip(0..)
        .map(|(pixels, level)| {
            SubresourceData::packed(
                pixels,
                format,
                mip_extent(width, level),
                mip_extent(height, level),
            )
        })
        .collect();
    let descriptor = TextureDescriptor::new_2d(width, height, format, TextureUsage::SHADER_RESOURCE)
        .with_label(name)
        .with_mip_levels(mip_levels)
        .immutable();

    let mut texture = Texture2d::new();
    texture.init_from_descriptor(device, Extent2d::new(width, height), descriptor, &data)?;
    Ok(texture)
}

// ============================================================================
// Cube
// ============================================================================

/// Load a cube texture from an image file.
///
/// The image is a horizontal (6:1) or vertical (1:6) strip of square faces
/// in +X, -X, +Y, -Y, +Z, -Z order.
pub fn load_texture_cube(
    device: &GraphicsDevice,
    path: impl AsRef<Path>,
    flags: LoadFlags,
) -> Result<TextureCube, LoadError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let result =
        read(path).and_then(|bytes| texture_cube_from_bytes(device, &bytes, &name, flags));
    report(result, &name)
}

/// Load a cube texture from an encoded face strip in memory.
pub fn load_texture_cube_from_memory(
    device: &GraphicsDevice,
    bytes: &[u8],
    flags: LoadFlags,
) -> Result<TextureCube, LoadError> {
    report(
        texture_cube_from_bytes(device, bytes, MEMORY_SOURCE, flags),
        MEMORY_SOURCE,
    )
}

/// Origins of the six faces in a strip, or `None` if the image is not one.
fn strip_faces(width: u32, height: u32) -> Option<(u32, [(u32, u32); 6])> {
    if width == 0 || height == 0 {
        return None;
    }
    let horizontal = width == height * 6;
    let vertical = height == width * 6;
    let size = if horizontal {
        height
    } else if vertical {
        width
    } else {
        return None;
    };
    let origins = std::array::from_fn(|face| {
        let offset = face as u32 * size;
        if horizontal { (offset, 0) } else { (0, offset) }
    });
    Some((size, origins))
}

fn texture_cube_from_bytes(
    device: &GraphicsDevice,
    bytes: &[u8],
    name: &str,
    flags: LoadFlags,
) -> Result<TextureCube, LoadError> {
    let image = decode(bytes, name)?;
    let (size, origins) =
        strip_faces(image.width(), image.height()).ok_or_else(|| LoadError::ShapeMismatch {
            path: name.to_string(),
            width: image.width(),
            height: image.height(),
        })?;
    let encoding = Encoding::from_flags(flags);
    let format = encoding.format();
    let mip_levels = if flags.contains(LoadFlags::MIPMAPS) {
        full_mip_count(size)
    } else {
        1
    };

    let faces: Vec<Vec<Vec<u8>>> = origins
        .iter()
        .map(|&(x, y)| build_mip_chain(&image.crop_imm(x, y, size, size), encoding, mip_levels))
        .collect();
    let data: Vec<_> = faces
        .iter()
        .flat_map(|levels| {
            levels.iter().zip(0..).map(|(pixels, level)| {
                let extent = mip_extent(size, level);
                SubresourceData::packed(pixels, format, extent, extent)
            })
        })
        .collect();
    let descriptor = TextureDescriptor::new_cube(size, format, TextureUsage::SHADER_RESOURCE)
        .with_label(name)
        .with_mip_levels(mip_levels)
        .immutable();

    let mut texture = TextureCube::new();
    texture.init_from_descriptor(device, CubeExtent::new(size), descriptor, &data)?;
    Ok(texture)
}
