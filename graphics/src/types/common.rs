//! Common types shared across the graphics system.

// ============================================================================
// Viewport
// ============================================================================

/// Viewport configuration for rendering.
///
/// Defines the rectangular region of the bound render target that draws and
/// blits map onto, along with the depth range mapping.
///
/// # Coordinate System
///
/// - **Depth range**: `[0, 1]`
/// - **Origin**: Top-left corner, +Y down
///
/// # Example
///
/// ```ignore
/// // Full-window viewport with standard depth range
/// let viewport = Viewport::new(0.0, 0.0, 1920.0, 1080.0);
///
/// // Restrict depth for a layered overlay
/// let viewport = Viewport::new(0.0, 0.0, 1920.0, 1080.0)
///     .with_depth_range(0.0, 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// X coordinate of the viewport's top-left corner.
    pub x: f32,
    /// Y coordinate of the viewport's top-left corner.
    pub y: f32,
    /// Width of the viewport.
    pub width: f32,
    /// Height of the viewport.
    pub height: f32,
    /// Minimum depth value (default: 0.0).
    pub min_depth: f32,
    /// Maximum depth value (default: 1.0).
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport with standard `[0, 1]` depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Create a viewport from dimensions with origin at (0, 0).
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Viewport covering a pixel-space region.
    pub fn from_box(region: Box2) -> Self {
        Self::new(region.min[0], region.min[1], region.width(), region.height())
    }

    /// Viewport covering a pixel-space region whose z range is the depth range.
    pub fn from_box3(region: Box3) -> Self {
        Self::new(region.min[0], region.min[1], region.width(), region.height())
            .with_depth_range(region.min[2], region.max[2])
    }

    /// Set the depth range.
    ///
    /// Both `min_depth` and `max_depth` should be in the range `[0, 1]`.
    /// `min > max` is valid and gives reverse-Z.
    pub fn with_depth_range(mut self, min_depth: f32, max_depth: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }
}

// ============================================================================
// Boxes
// ============================================================================

/// Axis-aligned 2D box given by its min and max corners.
///
/// Used in pixel space for viewports and in normalized `[0, 1]` space for
/// blit source and destination regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box2 {
    /// Minimum corner (x, y).
    pub min: [f32; 2],
    /// Maximum corner (x, y).
    pub max: [f32; 2],
}

impl Box2 {
    /// The normalized unit square `[0, 1] x [0, 1]`.
    pub const UNIT: Self = Self {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };

    /// Create a box from its corners.
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: [min_x, min_y],
            max: [max_x, max_y],
        }
    }

    /// Box covering `width` x `height` from the origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }

    /// Whether the box has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

impl Default for Box2 {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Axis-aligned 3D box. The z range maps to a viewport's depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    /// Minimum corner (x, y, z).
    pub min: [f32; 3],
    /// Maximum corner (x, y, z).
    pub max: [f32; 3],
}

impl Box3 {
    /// Create a box from its corners.
    pub const fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }

    pub fn depth(&self) -> f32 {
        self.max[2] - self.min[2]
    }
}

// ============================================================================
// Extent3d
// ============================================================================

/// 3D extent for textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels for volumes, array layer count otherwise.
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Create a new 3D extent.
    pub fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Whether any dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

/// Size of a dimension at `level`: `max(1, size >> level)`.
pub fn mip_extent(size: u32, level: u32) -> u32 {
    size.checked_shr(level).unwrap_or(0).max(1)
}

/// Number of levels in a full mip chain for the largest dimension `size`.
///
/// The chain ends at the first 1-pixel level, giving `floor(log2(size)) + 1`.
pub fn full_mip_count(size: u32) -> u32 {
    u32::BITS - size.max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_extent() {
        assert_eq!(mip_extent(64, 0), 64);
        assert_eq!(mip_extent(64, 3), 8);
        assert_eq!(mip_extent(5, 1), 2);
        assert_eq!(mip_extent(5, 7), 1);
        assert_eq!(mip_extent(1, 40), 1);
    }

    #[test]
    fn test_full_mip_count() {
        assert_eq!(full_mip_count(1), 1);
        assert_eq!(full_mip_count(2), 2);
        assert_eq!(full_mip_count(5), 3);
        assert_eq!(full_mip_count(256), 9);
        assert_eq!(full_mip_count(300), 9);
    }

    #[test]
    fn test_viewport_from_box3() {
        let viewport = Viewport::from_box3(Box3::new([10.0, 20.0, 0.25], [110.0, 70.0, 0.75]));
        assert_eq!(viewport.x, 10.0);
        assert_eq!(viewport.width, 100.0);
        assert_eq!(viewport.height, 50.0);
        assert_eq!(viewport.min_depth, 0.25);
        assert_eq!(viewport.max_depth, 0.75);
    }

    #[test]
    fn test_box2_default_is_unit() {
        assert_eq!(Box2::default(), Box2::UNIT);
        assert!(!Box2::UNIT.is_empty());
        assert!(Box2::new(0.5, 0.5, 0.5, 1.0).is_empty());
    }
}
