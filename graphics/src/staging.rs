//! CPU-readable staging resources.

use crate::backend::GpuStaging;
use crate::backend::software::SoftMapping;
use crate::format::TextureFormat;
use crate::types::Extent3d;

/// A transient resource that one subresource is copied into for readback.
///
/// Created by [`GraphicsDevice::create_staging_texture`](crate::GraphicsDevice::create_staging_texture),
/// filled by [`DeviceContext::copy_subresource`](crate::DeviceContext::copy_subresource)
/// and read through [`DeviceContext::map_read`](crate::DeviceContext::map_read).
#[derive(Debug)]
pub struct StagingTexture {
    format: TextureFormat,
    extent: Extent3d,
    raw: GpuStaging,
}

impl StagingTexture {
    pub(crate) fn new(format: TextureFormat, extent: Extent3d, raw: GpuStaging) -> Self {
        Self {
            format,
            extent,
            raw,
        }
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Size of the subresource this staging resource holds.
    pub fn extent(&self) -> Extent3d {
        self.extent
    }

    pub(crate) fn raw(&self) -> &GpuStaging {
        &self.raw
    }
}

pub(crate) enum MappedData<'a> {
    Software(SoftMapping<'a>),
    /// Bytes copied out of a mapped buffer, which is unmapped already.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Vec<u8>),
}

/// A mapped staging resource.
///
/// Rows start every [`row_pitch`](Self::row_pitch) bytes and depth slices
/// every [`depth_pitch`](Self::depth_pitch) bytes; both may exceed the tight
/// size. The resource is unmapped when this guard drops.
pub struct MappedSubresource<'a> {
    data: MappedData<'a>,
    row_pitch: u32,
    depth_pitch: u32,
}

impl<'a> MappedSubresource<'a> {
    pub(crate) fn new(data: MappedData<'a>, row_pitch: u32, depth_pitch: u32) -> Self {
        Self {
            data,
            row_pitch,
            depth_pitch,
        }
    }

    /// The mapped bytes.
    pub fn data(&self) -> &[u8] {
        match &self.data {
            MappedData::Software(mapping) => &mapping.data[..],
            #[cfg(feature = "wgpu-backend")]
            MappedData::Wgpu(bytes) => bytes.as_slice(),
        }
    }

    pub fn row_pitch(&self) -> u32 {
        self.row_pitch
    }

    pub fn depth_pitch(&self) -> u32 {
        self.depth_pitch
    }

    /// `len` bytes of row `row` in depth slice `slice`.
    pub fn row(&self, slice: u32, row: u32, len: usize) -> &[u8] {
        let start = slice as usize * self.depth_pitch as usize + row as usize * self.row_pitch as usize;
        &self.data()[start..start + len]
    }
}

impl std::fmt::Debug for MappedSubresource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedSubresource")
            .field("len", &self.data().len())
            .field("row_pitch", &self.row_pitch)
            .field("depth_pitch", &self.depth_pitch)
            .finish()
    }
}
