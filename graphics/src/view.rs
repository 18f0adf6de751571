//! Texture views.
//!
//! A [`TextureView`] reinterprets a range of a texture's subresources in a
//! given format. The typed wrappers ([`ShaderResourceView`],
//! [`RenderTargetView`], [`DepthStencilView`], [`UnorderedAccessView`]) make
//! sure a view is only bound where its kind allows.
//!
//! Views keep their texture alive. A swap chain cannot be resized while any
//! view of its back buffer exists.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{GpuTexture, GpuView};
use crate::format::TextureFormat;
use crate::types::{Extent3d, SubresourceRange, ViewDescriptor, ViewDimension, ViewKind};

/// Process-unique view identifier.
///
/// A freshly created view always gets a new identifier, so comparing ids
/// tells whether a view was recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// An untyped texture view.
#[derive(Clone)]
pub struct TextureView {
    id: ViewId,
    kind: ViewKind,
    format: TextureFormat,
    dimension: ViewDimension,
    range: SubresourceRange,
    label: Option<String>,
    texture: GpuTexture,
    #[cfg_attr(not(feature = "wgpu-backend"), allow(dead_code))]
    raw: GpuView,
}

impl TextureView {
    pub(crate) fn new(
        texture: GpuTexture,
        kind: ViewKind,
        descriptor: &ViewDescriptor,
        range: SubresourceRange,
        raw: GpuView,
    ) -> Self {
        Self {
            id: ViewId::next(),
            kind,
            format: descriptor.format,
            dimension: descriptor.dimension,
            range,
            label: descriptor.label.clone(),
            texture,
            raw,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Format the view reads or writes as.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn dimension(&self) -> ViewDimension {
        self.dimension
    }

    /// Subresources covered.
    pub fn range(&self) -> SubresourceRange {
        self.range
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The viewed texture.
    pub fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    /// Size of the base mip level.
    pub fn size(&self) -> Extent3d {
        self.texture
            .descriptor()
            .mip_size(self.range.base_mip_level)
    }

    #[cfg_attr(not(feature = "wgpu-backend"), allow(dead_code))]
    pub(crate) fn raw(&self) -> &GpuView {
        &self.raw
    }
}

impl std::fmt::Debug for TextureView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureView")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("dimension", &self.dimension)
            .field("range", &self.range)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl PartialEq for TextureView {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TextureView {}

macro_rules! typed_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(TextureView);

        impl $name {
            pub(crate) fn from_view(view: TextureView) -> Self {
                Self(view)
            }

            /// The untyped view.
            pub fn as_view(&self) -> &TextureView {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = TextureView;

            fn deref(&self) -> &TextureView {
                &self.0
            }
        }
    };
}

typed_view!(
    /// A view bound for sampling.
    ShaderResourceView
);
typed_view!(
    /// A view bound for compute writes.
    UnorderedAccessView
);
typed_view!(
    /// A color render-target view.
    RenderTargetView
);
typed_view!(
    /// A depth-stencil target view.
    DepthStencilView
);

static_assertions::assert_impl_all!(ShaderResourceView: Send, Sync);
static_assertions::assert_impl_all!(RenderTargetView: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_ids_are_unique() {
        let a = ViewId::next();
        let b = ViewId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
