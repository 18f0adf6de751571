//! Type conversions between Framelight types and wgpu types.

use crate::format::TextureFormat;
use crate::types::{TextureDescriptor, TextureDimension, TextureUsage, ViewDimension};

/// Convert a format to the wgpu format it is stored or viewed as.
///
/// Typeless formats map to their unsigned-normalized or float member.
/// Formats wgpu has no equivalent for return `None`.
pub fn convert_texture_format(format: TextureFormat) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as W;

    let converted = match format {
        // 128-bit formats
        TextureFormat::R32G32B32A32_TYPELESS | TextureFormat::R32G32B32A32_FLOAT => {
            W::Rgba32Float
        }
        TextureFormat::R32G32B32A32_UINT => W::Rgba32Uint,
        TextureFormat::R32G32B32A32_SINT => W::Rgba32Sint,

        // 64-bit formats
        TextureFormat::R16G16B16A16_TYPELESS | TextureFormat::R16G16B16A16_FLOAT => {
            W::Rgba16Float
        }
        TextureFormat::R16G16B16A16_UNORM => W::Rgba16Unorm,
        TextureFormat::R16G16B16A16_UINT => W::Rgba16Uint,
        TextureFormat::R16G16B16A16_SNORM => W::Rgba16Snorm,
        TextureFormat::R16G16B16A16_SINT => W::Rgba16Sint,
        TextureFormat::R32G32_TYPELESS | TextureFormat::R32G32_FLOAT => W::Rg32Float,
        TextureFormat::R32G32_UINT => W::Rg32Uint,
        TextureFormat::R32G32_SINT => W::Rg32Sint,
        TextureFormat::R32G8X24_TYPELESS | TextureFormat::D32_FLOAT_S8X24_UINT => {
            W::Depth32FloatStencil8
        }

        // 32-bit formats
        TextureFormat::R10G10B10A2_TYPELESS | TextureFormat::R10G10B10A2_UNORM => {
            W::Rgb10a2Unorm
        }
        TextureFormat::R10G10B10A2_UINT => W::Rgb10a2Uint,
        TextureFormat::R11G11B10_FLOAT => W::Rg11b10Ufloat,
        TextureFormat::R8G8B8A8_TYPELESS | TextureFormat::R8G8B8A8_UNORM => W::Rgba8Unorm,
        TextureFormat::R8G8B8A8_UNORM_SRGB => W::Rgba8UnormSrgb,
        TextureFormat::R8G8B8A8_UINT => W::Rgba8Uint,
        TextureFormat::R8G8B8A8_SNORM => W::Rgba8Snorm,
        TextureFormat::R8G8B8A8_SINT => W::Rgba8Sint,
        TextureFormat::R16G16_TYPELESS | TextureFormat::R16G16_FLOAT => W::Rg16Float,
        TextureFormat::R16G16_UNORM => W::Rg16Unorm,
        TextureFormat::R16G16_UINT => W::Rg16Uint,
        TextureFormat::R16G16_SNORM => W::Rg16Snorm,
        TextureFormat::R16G16_SINT => W::Rg16Sint,
        TextureFormat::R32_TYPELESS | TextureFormat::R32_FLOAT => W::R32Float,
        TextureFormat::D32_FLOAT => W::Depth32Float,
        TextureFormat::R32_UINT => W::R32Uint,
        TextureFormat::R32_SINT => W::R32Sint,
        TextureFormat::R24G8_TYPELESS | TextureFormat::D24_UNORM_S8_UINT => {
            W::Depth24PlusStencil8
        }
        TextureFormat::R9G9B9E5_SHAREDEXP => W::Rgb9e5Ufloat,
        TextureFormat::B8G8R8A8_TYPELESS | TextureFormat::B8G8R8A8_UNORM => W::Bgra8Unorm,
        TextureFormat::B8G8R8A8_UNORM_SRGB => W::Bgra8UnormSrgb,

        // 16-bit formats
        TextureFormat::R8G8_TYPELESS | TextureFormat::R8G8_UNORM => W::Rg8Unorm,
        TextureFormat::R8G8_UINT => W::Rg8Uint,
        TextureFormat::R8G8_SNORM => W::Rg8Snorm,
        TextureFormat::R8G8_SINT => W::Rg8Sint,
        TextureFormat::R16_TYPELESS | TextureFormat::R16_FLOAT => W::R16Float,
        TextureFormat::D16_UNORM => W::Depth16Unorm,
        TextureFormat::R16_UNORM => W::R16Unorm,
        TextureFormat::R16_UINT => W::R16Uint,
        TextureFormat::R16_SNORM => W::R16Snorm,
        TextureFormat::R16_SINT => W::R16Sint,

        // 8-bit formats
        TextureFormat::R8_TYPELESS | TextureFormat::R8_UNORM => W::R8Unorm,
        TextureFormat::R8_UINT => W::R8Uint,
        TextureFormat::R8_SNORM => W::R8Snorm,
        TextureFormat::R8_SINT => W::R8Sint,

        // Block-compressed formats
        TextureFormat::BC1_TYPELESS | TextureFormat::BC1_UNORM => W::Bc1RgbaUnorm,
        TextureFormat::BC1_UNORM_SRGB => W::Bc1RgbaUnormSrgb,
        TextureFormat::BC2_TYPELESS | TextureFormat::BC2_UNORM => W::Bc2RgbaUnorm,
        TextureFormat::BC2_UNORM_SRGB => W::Bc2RgbaUnormSrgb,
        TextureFormat::BC3_TYPELESS | TextureFormat::BC3_UNORM => W::Bc3RgbaUnorm,
        TextureFormat::BC3_UNORM_SRGB => W::Bc3RgbaUnormSrgb,
        TextureFormat::BC4_TYPELESS | TextureFormat::BC4_UNORM => W::Bc4RUnorm,
        TextureFormat::BC4_SNORM => W::Bc4RSnorm,
        TextureFormat::BC5_TYPELESS | TextureFormat::BC5_UNORM => W::Bc5RgUnorm,
        TextureFormat::BC5_SNORM => W::Bc5RgSnorm,
        TextureFormat::BC6H_TYPELESS | TextureFormat::BC6H_UF16 => W::Bc6hRgbUfloat,
        TextureFormat::BC6H_SF16 => W::Bc6hRgbFloat,
        TextureFormat::BC7_TYPELESS | TextureFormat::BC7_UNORM => W::Bc7RgbaUnorm,
        TextureFormat::BC7_UNORM_SRGB => W::Bc7RgbaUnormSrgb,

        _ => return None,
    };
    Some(converted)
}

/// Storage format of a texture.
///
/// Typeless textures with depth usage are stored in the depth format their
/// depth views use.
pub fn storage_format(descriptor: &TextureDescriptor) -> Option<wgpu::TextureFormat> {
    if descriptor.usage.contains(TextureUsage::DEPTH_STENCIL) {
        let depth = match descriptor.format {
            TextureFormat::R32_TYPELESS => Some(wgpu::TextureFormat::Depth32Float),
            TextureFormat::R16_TYPELESS => Some(wgpu::TextureFormat::Depth16Unorm),
            _ => None,
        };
        if depth.is_some() {
            return depth;
        }
    }
    convert_texture_format(descriptor.format)
}

/// The sRGB or linear twin of `format`, if it has one.
pub fn srgb_twin(format: wgpu::TextureFormat) -> Option<wgpu::TextureFormat> {
    let srgb = format.add_srgb_suffix();
    if srgb != format {
        return Some(srgb);
    }
    let linear = format.remove_srgb_suffix();
    (linear != format).then_some(linear)
}

/// Convert TextureUsage flags to wgpu texture usages.
///
/// Every texture can be copied from and to, for uploads and readback.
pub fn convert_texture_usage(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut result = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;

    if usage.contains(TextureUsage::SHADER_RESOURCE) {
        result |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(TextureUsage::UNORDERED_ACCESS) {
        result |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if usage.contains(TextureUsage::RENDER_TARGET) || usage.contains(TextureUsage::DEPTH_STENCIL)
    {
        result |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }

    result
}

/// Convert a texture dimension to wgpu's dimension and layer count.
pub fn convert_texture_dimension(descriptor: &TextureDescriptor) -> (wgpu::TextureDimension, u32) {
    match descriptor.dimension {
        TextureDimension::D2 => (wgpu::TextureDimension::D2, 1),
        TextureDimension::Cube => (wgpu::TextureDimension::D2, descriptor.array_layers()),
        TextureDimension::D3 => (wgpu::TextureDimension::D3, descriptor.size.depth),
    }
}

/// Convert ViewDimension to wgpu view dimension.
pub fn convert_view_dimension(dimension: ViewDimension) -> wgpu::TextureViewDimension {
    match dimension {
        ViewDimension::D2 => wgpu::TextureViewDimension::D2,
        ViewDimension::D2Array => wgpu::TextureViewDimension::D2Array,
        ViewDimension::Cube => wgpu::TextureViewDimension::Cube,
        ViewDimension::D3 => wgpu::TextureViewDimension::D3,
    }
}

/// Present mode for a vsync setting.
pub fn convert_present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_formats() {
        assert_eq!(
            convert_texture_format(TextureFormat::R8G8B8A8_UNORM_SRGB),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(
            convert_texture_format(TextureFormat::D32_FLOAT),
            Some(wgpu::TextureFormat::Depth32Float)
        );
        assert_eq!(convert_texture_format(TextureFormat::NV12), None);
    }

    #[test]
    fn test_typeless_depth_storage() {
        let descriptor = TextureDescriptor::new_2d(
            4,
            4,
            TextureFormat::R32_TYPELESS,
            TextureUsage::DEPTH_STENCIL | TextureUsage::SHADER_RESOURCE,
        );
        assert_eq!(
            storage_format(&descriptor),
            Some(wgpu::TextureFormat::Depth32Float)
        );
    }

    #[test]
    fn test_srgb_twin() {
        assert_eq!(
            srgb_twin(wgpu::TextureFormat::Bgra8Unorm),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(
            srgb_twin(wgpu::TextureFormat::Rgba8UnormSrgb),
            Some(wgpu::TextureFormat::Rgba8Unorm)
        );
        assert_eq!(srgb_twin(wgpu::TextureFormat::R32Float), None);
    }
}
