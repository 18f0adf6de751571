//! Texture descriptor types.

use bitflags::bitflags;

use super::common::{full_mip_count, mip_extent, Extent3d};
use crate::format::TextureFormat;

/// Number of faces in a cube texture.
pub const CUBE_FACE_COUNT: u32 = 6;

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// A single 2D image.
    #[default]
    D2,
    /// Six square 2D faces.
    Cube,
    /// A volume of depth slices.
    D3,
}

bitflags! {
    /// Ways a texture can be bound to the pipeline.
    ///
    /// Copies to and from a texture are always allowed unless the texture is
    /// immutable, in which case it may only be a copy source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be sampled in a shader.
        const SHADER_RESOURCE = 1 << 0;
        /// Texture can be written from compute shaders.
        const UNORDERED_ACCESS = 1 << 1;
        /// Texture can be bound as a color render target.
        const RENDER_TARGET = 1 << 2;
        /// Texture can be bound as a depth-stencil target.
        const DEPTH_STENCIL = 1 << 3;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Dimensionality.
    pub dimension: TextureDimension,
    /// Size of the texture. `depth` is 6 for cubes and 1 for 2D textures.
    pub size: Extent3d,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
    /// Contents are fixed at creation.
    pub immutable: bool,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            dimension: TextureDimension::D2,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            format,
            usage,
            immutable: false,
        }
    }

    /// Create a new cube texture descriptor with square faces of edge `size`.
    pub fn new_cube(size: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            dimension: TextureDimension::Cube,
            size: Extent3d::new_3d(size, size, CUBE_FACE_COUNT),
            ..Self::new_2d(size, size, format, usage)
        }
    }

    /// Create a new volume texture descriptor.
    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            dimension: TextureDimension::D3,
            size: Extent3d::new_3d(width, height, depth),
            ..Self::new_2d(width, height, format, usage)
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Request the full mip chain down to 1x1.
    pub fn with_full_mip_chain(mut self) -> Self {
        self.mip_level_count = self.max_mip_levels();
        self
    }

    /// Mark the texture contents as fixed at creation.
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Array layers: 6 for cubes, 1 otherwise.
    pub fn array_layers(&self) -> u32 {
        match self.dimension {
            TextureDimension::Cube => CUBE_FACE_COUNT,
            TextureDimension::D2 | TextureDimension::D3 => 1,
        }
    }

    /// Total subresources (`array_layers * mip_level_count`).
    pub fn subresource_count(&self) -> u32 {
        self.array_layers() * self.mip_level_count
    }

    /// Length of the longest mip chain this size allows.
    pub fn max_mip_levels(&self) -> u32 {
        let largest = match self.dimension {
            TextureDimension::D3 => self.size.width.max(self.size.height).max(self.size.depth),
            TextureDimension::D2 | TextureDimension::Cube => self.size.width.max(self.size.height),
        };
        full_mip_count(largest)
    }

    /// Size of one layer at `level`. Depth is 1 except for volumes.
    pub fn mip_size(&self, level: u32) -> Extent3d {
        let depth = match self.dimension {
            TextureDimension::D3 => mip_extent(self.size.depth, level),
            TextureDimension::D2 | TextureDimension::Cube => 1,
        };
        Extent3d::new_3d(
            mip_extent(self.size.width, level),
            mip_extent(self.size.height, level),
            depth,
        )
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            dimension: TextureDimension::D2,
            size: Extent3d::default(),
            mip_level_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
            immutable: false,
        }
    }
}

/// Flat subresource index for `mip` in array layer `layer`.
///
/// Subresources are ordered layer-major: all mips of layer 0, then layer 1.
pub fn subresource_index(mip: u32, layer: u32, mip_level_count: u32) -> u32 {
    layer * mip_level_count + mip
}

/// Initial contents for one subresource.
#[derive(Debug, Clone, Copy)]
pub struct SubresourceData<'a> {
    /// Pixel bytes. Rows start every `row_pitch` bytes.
    pub data: &'a [u8],
    /// Byte distance between rows.
    pub row_pitch: u32,
    /// Byte distance between depth slices.
    pub slice_pitch: u32,
}

impl<'a> SubresourceData<'a> {
    /// Tightly packed data for a `width` x `height` image in `format`.
    pub fn packed(data: &'a [u8], format: TextureFormat, width: u32, height: u32) -> Self {
        let (row_bytes, rows) = format.row_layout(width, height);
        Self {
            data,
            row_pitch: row_bytes,
            slice_pitch: row_bytes * rows,
        }
    }
}

// ============================================================================
// Views
// ============================================================================

/// What a view binds its texture as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    ShaderResource,
    UnorderedAccess,
    RenderTarget,
    DepthStencil,
}

impl ViewKind {
    /// Usage flag the texture must carry for this kind of view.
    pub fn required_usage(self) -> TextureUsage {
        match self {
            Self::ShaderResource => TextureUsage::SHADER_RESOURCE,
            Self::UnorderedAccess => TextureUsage::UNORDERED_ACCESS,
            Self::RenderTarget => TextureUsage::RENDER_TARGET,
            Self::DepthStencil => TextureUsage::DEPTH_STENCIL,
        }
    }
}

/// How a view interprets its texture's layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewDimension {
    D2,
    D2Array,
    Cube,
    D3,
}

/// Descriptor for creating a texture view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewDescriptor {
    /// Debug label for the view.
    pub label: Option<String>,
    /// Format the view reinterprets the texture as. Must have the texture's
    /// bits per pixel.
    pub format: TextureFormat,
    pub dimension: ViewDimension,
    pub base_mip_level: u32,
    /// Mip levels covered. `None` covers every level from the base.
    pub mip_level_count: Option<u32>,
    pub base_array_layer: u32,
    /// Layers covered. `None` covers every layer from the base.
    pub array_layer_count: Option<u32>,
}

impl ViewDescriptor {
    /// View of every subresource in `format`.
    pub fn new(format: TextureFormat, dimension: ViewDimension) -> Self {
        Self {
            label: None,
            format,
            dimension,
            base_mip_level: 0,
            mip_level_count: None,
            base_array_layer: 0,
            array_layer_count: None,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Restrict the view to `count` mips starting at `base`.
    pub fn with_mips(mut self, base: u32, count: u32) -> Self {
        self.base_mip_level = base;
        self.mip_level_count = Some(count);
        self
    }

    /// Restrict the view to `count` layers starting at `base`.
    pub fn with_layers(mut self, base: u32, count: u32) -> Self {
        self.base_array_layer = base;
        self.array_layer_count = Some(count);
        self
    }
}

/// The subresources a view covers, resolved against its texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
}

impl SubresourceRange {
    /// Resolve the optional counts of `view` against `texture`.
    pub fn resolve(view: &ViewDescriptor, texture: &TextureDescriptor) -> Self {
        let mip_level_count = view
            .mip_level_count
            .unwrap_or_else(|| texture.mip_level_count.saturating_sub(view.base_mip_level));
        let array_layer_count = view
            .array_layer_count
            .unwrap_or_else(|| texture.array_layers().saturating_sub(view.base_array_layer));
        Self {
            base_mip_level: view.base_mip_level,
            mip_level_count,
            base_array_layer: view.base_array_layer,
            array_layer_count,
        }
    }

    /// Whether the range lies inside `texture` and is non-empty.
    pub fn fits(&self, texture: &TextureDescriptor) -> bool {
        self.mip_level_count > 0
            && self.array_layer_count > 0
            && self.base_mip_level + self.mip_level_count <= texture.mip_level_count
            && self.base_array_layer + self.array_layer_count <= texture.array_layers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_descriptor() {
        let desc = TextureDescriptor::new_cube(
            32,
            TextureFormat::R8G8B8A8_UNORM,
            TextureUsage::SHADER_RESOURCE,
        )
        .with_full_mip_chain();
        assert_eq!(desc.array_layers(), 6);
        assert_eq!(desc.mip_level_count, 6);
        assert_eq!(desc.subresource_count(), 36);
        assert_eq!(desc.mip_size(5), Extent3d::new_2d(1, 1));
    }

    #[test]
    fn test_volume_mip_size() {
        let desc = TextureDescriptor::new_3d(
            16,
            8,
            4,
            TextureFormat::R8_UNORM,
            TextureUsage::SHADER_RESOURCE,
        );
        assert_eq!(desc.max_mip_levels(), 5);
        assert_eq!(desc.mip_size(2), Extent3d::new_3d(4, 2, 1));
        assert_eq!(desc.array_layers(), 1);
    }

    #[test]
    fn test_subresource_index_is_layer_major() {
        assert_eq!(subresource_index(0, 0, 4), 0);
        assert_eq!(subresource_index(3, 0, 4), 3);
        assert_eq!(subresource_index(0, 1, 4), 4);
        assert_eq!(subresource_index(2, 5, 4), 22);
    }

    #[test]
    fn test_range_resolution() {
        let texture = TextureDescriptor::new_cube(
            8,
            TextureFormat::R8G8B8A8_UNORM,
            TextureUsage::SHADER_RESOURCE,
        )
        .with_mip_levels(4);
        let view = ViewDescriptor::new(TextureFormat::R8G8B8A8_UNORM, ViewDimension::Cube)
            .with_mips(1, 2);
        let range = SubresourceRange::resolve(&view, &texture);
        assert_eq!(range.mip_level_count, 2);
        assert_eq!(range.array_layer_count, 6);
        assert!(range.fits(&texture));

        let too_deep = ViewDescriptor::new(TextureFormat::R8G8B8A8_UNORM, ViewDimension::D2)
            .with_layers(5, 2);
        assert!(!SubresourceRange::resolve(&too_deep, &texture).fits(&texture));
    }
}
