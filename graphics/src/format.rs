//! Texture format catalog.
//!
//! Formats are identified by their DXGI numbering, which is dense from `0`
//! (`UNKNOWN`) through `115` (`B4G4R4A4_UNORM`). Every catalogued format has a
//! canonical name and a bits-per-pixel value; block-compressed formats report
//! their per-texel average and video formats report zero.
//!
//! Lookups for identifiers outside the catalog log a warning and fall back to
//! `"UNKNOWN"` and `0` rather than failing.

use std::fmt;

/// A texture format identifier.
///
/// This is a thin newtype over the numeric identifier so that values arriving
/// from outside the catalog (file headers, serialized settings) can still be
/// represented and reported.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureFormat(u32);

/// One row of the format catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Numeric identifier.
    pub id: u32,
    /// Canonical name, e.g. `"R8G8B8A8_UNORM_SRGB"`.
    pub name: &'static str,
    /// Bits per pixel. Zero for formats without a per-pixel size.
    pub bits_per_pixel: u32,
}

macro_rules! format_catalog {
    ($($id:literal => $ident:ident, $name:literal, $bits:literal;)*) => {
        #[allow(missing_docs)]
        impl TextureFormat {
            $(pub const $ident: Self = Self($id);)*
        }

        static CATALOG: &[FormatInfo] = &[
            $(FormatInfo { id: $id, name: $name, bits_per_pixel: $bits },)*
        ];
    };
}

format_catalog! {
    0 => UNKNOWN, "UNKNOWN", 0;
    1 => R32G32B32A32_TYPELESS, "R32G32B32A32_TYPELESS", 128;
    2 => R32G32B32A32_FLOAT, "R32G32B32A32_FLOAT", 128;
    3 => R32G32B32A32_UINT, "R32G32B32A32_UINT", 128;
    4 => R32G32B32A32_SINT, "R32G32B32A32_SINT", 128;
    5 => R32G32B32_TYPELESS, "R32G32B32_TYPELESS", 96;
    6 => R32G32B32_FLOAT, "R32G32B32_FLOAT", 96;
    7 => R32G32B32_UINT, "R32G32B32_UINT", 96;
    8 => R32G32B32_SINT, "R32G32B32_SINT", 96;
    9 => R16G16B16A16_TYPELESS, "R16G16B16A16_TYPELESS", 64;
    10 => R16G16B16A16_FLOAT, "R16G16B16A16_FLOAT", 64;
    11 => R16G16B16A16_UNORM, "R16G16B16A16_UNORM", 64;
    12 => R16G16B16A16_UINT, "R16G16B16A16_UINT", 64;
    13 => R16G16B16A16_SNORM, "R16G16B16A16_SNORM", 64;
    14 => R16G16B16A16_SINT, "R16G16B16A16_SINT", 64;
    15 => R32G32_TYPELESS, "R32G32_TYPELESS", 64;
    16 => R32G32_FLOAT, "R32G32_FLOAT", 64;
    17 => R32G32_UINT, "R32G32_UINT", 64;
    18 => R32G32_SINT, "R32G32_SINT", 64;
    19 => R32G8X24_TYPELESS, "R32G8X24_TYPELESS", 64;
    20 => D32_FLOAT_S8X24_UINT, "D32_FLOAT_S8X24_UINT", 64;
    21 => R32_FLOAT_X8X24_TYPELESS, "R32_FLOAT_X8X24_TYPELESS", 64;
    22 => X32_TYPELESS_G8X24_UINT, "X32_TYPELESS_G8X24_UINT", 64;
    23 => R10G10B10A2_TYPELESS, "R10G10B10A2_TYPELESS", 32;
    24 => R10G10B10A2_UNORM, "R10G10B10A2_UNORM", 32;
    25 => R10G10B10A2_UINT, "R10G10B10A2_UINT", 32;
    26 => R11G11B10_FLOAT, "R11G11B10_FLOAT", 32;
    27 => R8G8B8A8_TYPELESS, "R8G8B8A8_TYPELESS", 32;
    28 => R8G8B8A8_UNORM, "R8G8B8A8_UNORM", 32;
    29 => R8G8B8A8_UNORM_SRGB, "R8G8B8A8_UNORM_SRGB", 32;
    30 => R8G8B8A8_UINT, "R8G8B8A8_UINT", 32;
    31 => R8G8B8A8_SNORM, "R8G8B8A8_SNORM", 32;
    32 => R8G8B8A8_SINT, "R8G8B8A8_SINT", 32;
    33 => R16G16_TYPELESS, "R16G16_TYPELESS", 32;
    34 => R16G16_FLOAT, "R16G16_FLOAT", 32;
    35 => R16G16_UNORM, "R16G16_UNORM", 32;
    36 => R16G16_UINT, "R16G16_UINT", 32;
    37 => R16G16_SNORM, "R16G16_SNORM", 32;
    38 => R16G16_SINT, "R16G16_SINT", 32;
    39 => R32_TYPELESS, "R32_TYPELESS", 32;
    40 => D32_FLOAT, "D32_FLOAT", 32;
    41 => R32_FLOAT, "R32_FLOAT", 32;
    42 => R32_UINT, "R32_UINT", 32;
    43 => R32_SINT, "R32_SINT", 32;
    44 => R24G8_TYPELESS, "R24G8_TYPELESS", 32;
    45 => D24_UNORM_S8_UINT, "D24_UNORM_S8_UINT", 32;
    46 => R24_UNORM_X8_TYPELESS, "R24_UNORM_X8_TYPELESS", 32;
    47 => X24_TYPELESS_G8_UINT, "X24_TYPELESS_G8_UINT", 32;
    48 => R8G8_TYPELESS, "R8G8_TYPELESS", 16;
    49 => R8G8_UNORM, "R8G8_UNORM", 16;
    50 => R8G8_UINT, "R8G8_UINT", 16;
    51 => R8G8_SNORM, "R8G8_SNORM", 16;
    52 => R8G8_SINT, "R8G8_SINT", 16;
    53 => R16_TYPELESS, "R16_TYPELESS", 16;
    54 => R16_FLOAT, "R16_FLOAT", 16;
    55 => D16_UNORM, "D16_UNORM", 16;
    56 => R16_UNORM, "R16_UNORM", 16;
    57 => R16_UINT, "R16_UINT", 16;
    58 => R16_SNORM, "R16_SNORM", 16;
    59 => R16_SINT, "R16_SINT", 16;
    60 => R8_TYPELESS, "R8_TYPELESS", 8;
    61 => R8_UNORM, "R8_UNORM", 8;
    62 => R8_UINT, "R8_UINT", 8;
    63 => R8_SNORM, "R8_SNORM", 8;
    64 => R8_SINT, "R8_SINT", 8;
    65 => A8_UNORM, "A8_UNORM", 8;
    66 => R1_UNORM, "R1_UNORM", 1;
    67 => R9G9B9E5_SHAREDEXP, "R9G9B9E5_SHAREDEXP", 32;
    68 => R8G8_B8G8_UNORM, "R8G8_B8G8_UNORM", 16;
    69 => G8R8_G8B8_UNORM, "G8R8_G8B8_UNORM", 16;
    70 => BC1_TYPELESS, "BC1_TYPELESS", 4;
    71 => BC1_UNORM, "BC1_UNORM", 4;
    72 => BC1_UNORM_SRGB, "BC1_UNORM_SRGB", 4;
    73 => BC2_TYPELESS, "BC2_TYPELESS", 8;
    74 => BC2_UNORM, "BC2_UNORM", 8;
    75 => BC2_UNORM_SRGB, "BC2_UNORM_SRGB", 8;
    76 => BC3_TYPELESS, "BC3_TYPELESS", 8;
    77 => BC3_UNORM, "BC3_UNORM", 8;
    78 => BC3_UNORM_SRGB, "BC3_UNORM_SRGB", 8;
    79 => BC4_TYPELESS, "BC4_TYPELESS", 4;
    80 => BC4_UNORM, "BC4_UNORM", 4;
    81 => BC4_SNORM, "BC4_SNORM", 4;
    82 => BC5_TYPELESS, "BC5_TYPELESS", 8;
    83 => BC5_UNORM, "BC5_UNORM", 8;
    84 => BC5_SNORM, "BC5_SNORM", 8;
    85 => B5G6R5_UNORM, "B5G6R5_UNORM", 16;
    86 => B5G5R5A1_UNORM, "B5G5R5A1_UNORM", 16;
    87 => B8G8R8A8_UNORM, "B8G8R8A8_UNORM", 32;
    88 => B8G8R8X8_UNORM, "B8G8R8X8_UNORM", 32;
    89 => R10G10B10_XR_BIAS_A2_UNORM, "R10G10B10_XR_BIAS_A2_UNORM", 32;
    90 => B8G8R8A8_TYPELESS, "B8G8R8A8_TYPELESS", 32;
    91 => B8G8R8A8_UNORM_SRGB, "B8G8R8A8_UNORM_SRGB", 32;
    92 => B8G8R8X8_TYPELESS, "B8G8R8X8_TYPELESS", 32;
    93 => B8G8R8X8_UNORM_SRGB, "B8G8R8X8_UNORM_SRGB", 32;
    94 => BC6H_TYPELESS, "BC6H_TYPELESS", 8;
    95 => BC6H_UF16, "BC6H_UF16", 8;
    96 => BC6H_SF16, "BC6H_SF16", 8;
    97 => BC7_TYPELESS, "BC7_TYPELESS", 8;
    98 => BC7_UNORM, "BC7_UNORM", 8;
    99 => BC7_UNORM_SRGB, "BC7_UNORM_SRGB", 8;
    100 => AYUV, "AYUV", 0;
    101 => Y410, "Y410", 0;
    102 => Y416, "Y416", 0;
    103 => NV12, "NV12", 0;
    104 => P010, "P010", 0;
    105 => P016, "P016", 0;
    106 => OPAQUE_420, "420_OPAQUE", 0;
    107 => YUY2, "YUY2", 0;
    108 => Y210, "Y210", 0;
    109 => Y216, "Y216", 0;
    110 => NV11, "NV11", 0;
    111 => AI44, "AI44", 0;
    112 => IA44, "IA44", 0;
    113 => P8, "P8", 8;
    114 => A8P8, "A8P8", 16;
    115 => B4G4R4A4_UNORM, "B4G4R4A4_UNORM", 16;
}

/// Linear and sRGB-encoded formats that share a storage layout.
const SRGB_PAIRS: &[(TextureFormat, TextureFormat)] = &[
    (TextureFormat::R8G8B8A8_UNORM, TextureFormat::R8G8B8A8_UNORM_SRGB),
    (TextureFormat::BC1_UNORM, TextureFormat::BC1_UNORM_SRGB),
    (TextureFormat::BC2_UNORM, TextureFormat::BC2_UNORM_SRGB),
    (TextureFormat::BC3_UNORM, TextureFormat::BC3_UNORM_SRGB),
    (TextureFormat::B8G8R8A8_UNORM, TextureFormat::B8G8R8A8_UNORM_SRGB),
    (TextureFormat::B8G8R8X8_UNORM, TextureFormat::B8G8R8X8_UNORM_SRGB),
    (TextureFormat::BC7_UNORM, TextureFormat::BC7_UNORM_SRGB),
];

/// The full catalog in identifier order.
pub fn catalog() -> &'static [FormatInfo] {
    CATALOG
}

/// Canonical name of `format`.
///
/// Unknown identifiers log a warning and return `"UNKNOWN"`.
pub fn name_of(format: TextureFormat) -> &'static str {
    match format.info() {
        Some(info) => info.name,
        None => {
            log::warn!("Unexpected texture format {}", format.0);
            "UNKNOWN"
        }
    }
}

/// Bits per pixel of `format`.
///
/// Unknown identifiers log a warning and return `0`.
pub fn bits_per_pixel(format: TextureFormat) -> u32 {
    match format.info() {
        Some(info) => info.bits_per_pixel,
        None => {
            log::warn!("Unexpected texture format {}", format.0);
            0
        }
    }
}

impl TextureFormat {
    /// Wrap a raw identifier. Values outside the catalog are allowed.
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// The raw identifier.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Catalog row for this format, if it is catalogued.
    pub fn info(self) -> Option<&'static FormatInfo> {
        CATALOG.get(self.0 as usize)
    }

    /// Whether the identifier is inside the catalog.
    pub fn is_known(self) -> bool {
        self.info().is_some()
    }

    /// See [`name_of`].
    pub fn name(self) -> &'static str {
        name_of(self)
    }

    /// See [`bits_per_pixel`].
    pub fn bits_per_pixel(self) -> u32 {
        bits_per_pixel(self)
    }

    /// Whether the format stores 4x4 compressed blocks.
    pub fn is_block_compressed(self) -> bool {
        matches!(self.0, 70..=84 | 94..=99)
    }

    /// Whether the format packs pixel pairs or planes (video and `*_B8G8` layouts).
    pub fn is_packed(self) -> bool {
        matches!(self.0, 68 | 69 | 100..=112)
    }

    /// Whether the format is a depth or depth-stencil format.
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Self::D32_FLOAT_S8X24_UINT | Self::D32_FLOAT | Self::D24_UNORM_S8_UINT | Self::D16_UNORM
        )
    }

    /// Whether values are sRGB-encoded.
    pub fn is_srgb(self) -> bool {
        SRGB_PAIRS.iter().any(|&(_, srgb)| srgb == self)
    }

    /// The sRGB-encoded sibling, or `self` when there is none.
    pub fn srgb_variant(self) -> Self {
        SRGB_PAIRS
            .iter()
            .find(|&&(linear, _)| linear == self)
            .map_or(self, |&(_, srgb)| srgb)
    }

    /// The linear sibling, or `self` when there is none.
    pub fn linear_variant(self) -> Self {
        SRGB_PAIRS
            .iter()
            .find(|&&(_, srgb)| srgb == self)
            .map_or(self, |&(linear, _)| linear)
    }

    /// Whole bytes per pixel for formats that store one pixel per element.
    ///
    /// Returns `None` for block-compressed, packed, sub-byte, zero-size and
    /// unknown formats. Those formats cannot be read back row by row.
    pub fn bytes_per_pixel(self) -> Option<u32> {
        let bits = self.info()?.bits_per_pixel;
        if bits == 0 || bits % 8 != 0 || self.is_block_compressed() || self.is_packed() {
            return None;
        }
        Some(bits / 8)
    }

    /// Bytes in one row of storage and the number of rows for a `width` x `height` image.
    ///
    /// Block-compressed formats count rows of 4x4 blocks.
    pub fn row_layout(self, width: u32, height: u32) -> (u32, u32) {
        let bits = self.info().map_or(0, |info| info.bits_per_pixel);
        if self.is_block_compressed() {
            let block_bytes = bits * 16 / 8;
            (width.div_ceil(4) * block_bytes, height.div_ceil(4))
        } else {
            ((width * bits).div_ceil(8), height)
        }
    }
}

/// Decode an sRGB-encoded channel value in `[0, 1]` to linear.
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode a linear channel value in `[0, 1]` as sRGB.
pub fn linear_to_srgb(value: f32) -> f32 {
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

impl fmt::Debug for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info() {
            Some(info) => write!(f, "TextureFormat({})", info.name),
            None => write!(f, "TextureFormat(#{})", self.0),
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info() {
            Some(info) => f.write_str(info.name),
            None => write!(f, "UNKNOWN({})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_dense() {
        assert_eq!(catalog().len(), 116);
        for (index, info) in catalog().iter().enumerate() {
            assert_eq!(info.id as usize, index);
        }
    }

    #[test]
    fn test_catalog_values() {
        assert_eq!(name_of(TextureFormat::from_raw(29)), "R8G8B8A8_UNORM_SRGB");
        assert_eq!(bits_per_pixel(TextureFormat::from_raw(29)), 32);
        assert_eq!(bits_per_pixel(TextureFormat::from_raw(2)), 128);
        assert_eq!(bits_per_pixel(TextureFormat::BC1_UNORM), 4);
        assert_eq!(bits_per_pixel(TextureFormat::BC7_UNORM_SRGB), 8);
        assert_eq!(bits_per_pixel(TextureFormat::NV12), 0);
        assert_eq!(name_of(TextureFormat::OPAQUE_420), "420_OPAQUE");
        assert_eq!(name_of(TextureFormat::B4G4R4A4_UNORM), "B4G4R4A4_UNORM");
    }

    #[test]
    fn test_unknown_fallback() {
        let bogus = TextureFormat::from_raw(200);
        assert!(!bogus.is_known());
        assert_eq!(name_of(bogus), "UNKNOWN");
        assert_eq!(bits_per_pixel(bogus), 0);
        assert_eq!(bogus.bytes_per_pixel(), None);
        assert_eq!(format!("{bogus:?}"), "TextureFormat(#200)");
    }

    #[test]
    fn test_srgb_pairs() {
        let rgba = TextureFormat::R8G8B8A8_UNORM;
        assert_eq!(rgba.srgb_variant(), TextureFormat::R8G8B8A8_UNORM_SRGB);
        assert_eq!(rgba.srgb_variant().linear_variant(), rgba);
        assert!(rgba.srgb_variant().is_srgb());
        assert!(!rgba.is_srgb());
        assert_eq!(TextureFormat::R32_FLOAT.srgb_variant(), TextureFormat::R32_FLOAT);
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(TextureFormat::R8_UNORM.bytes_per_pixel(), Some(1));
        assert_eq!(TextureFormat::R16G16B16A16_FLOAT.bytes_per_pixel(), Some(8));
        assert_eq!(TextureFormat::R32G32B32_FLOAT.bytes_per_pixel(), Some(12));
        assert_eq!(TextureFormat::BC3_UNORM.bytes_per_pixel(), None);
        assert_eq!(TextureFormat::R1_UNORM.bytes_per_pixel(), None);
        assert_eq!(TextureFormat::YUY2.bytes_per_pixel(), None);
    }

    #[test]
    fn test_srgb_transfer_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((linear_to_srgb(srgb_to_linear(0.5)) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_row_layout() {
        assert_eq!(TextureFormat::R8G8B8A8_UNORM.row_layout(3, 5), (12, 5));
        assert_eq!(TextureFormat::BC1_UNORM.row_layout(5, 5), (16, 2));
        assert_eq!(TextureFormat::BC7_UNORM.row_layout(4, 4), (16, 1));
    }
}
