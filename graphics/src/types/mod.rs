//! Common types and descriptors for graphics resources.
//!
//! This module contains geometry helpers, usage flags, and descriptor structs
//! used throughout the graphics system.

mod common;
mod texture;

pub use common::{full_mip_count, mip_extent, Box2, Box3, Extent3d, Viewport};
pub use texture::{
    subresource_index, SubresourceData, SubresourceRange, TextureDescriptor, TextureDimension,
    TextureUsage, ViewDescriptor, ViewDimension, ViewKind, CUBE_FACE_COUNT,
};
