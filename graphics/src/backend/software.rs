//! CPU software backend.
//!
//! Stores every subresource in host memory with the same row and slice pitch
//! alignment a hardware driver would use, so readback code always deals with
//! padded rows. Presentation is a no-op; the back buffer is an ordinary
//! texture that can be read back like any other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::blit::BlitFilter;
use crate::error::{GraphicsError, Result};
use crate::format::{TextureFormat, linear_to_srgb, srgb_to_linear};
use crate::types::{
    Box2, Extent3d, SubresourceData, SubresourceRange, TextureDescriptor, TextureUsage, Viewport,
    subresource_index,
};

use super::{GpuTexture, SwapChainDescriptor};

/// Row pitch alignment of stored subresources, in bytes.
pub const ROW_PITCH_ALIGNMENT: u32 = 256;
/// Depth slice pitch alignment of stored subresources, in bytes.
pub const SLICE_PITCH_ALIGNMENT: u32 = 512;
/// Host memory one texture may occupy, all subresources included.
pub const MAX_TEXTURE_BYTES: u64 = 1 << 30;

// ============================================================================
// Storage
// ============================================================================

/// Host storage for one mip of one array layer.
#[derive(Debug, Clone)]
pub(crate) struct SoftSubresource {
    pub extent: Extent3d,
    pub row_bytes: u32,
    pub rows: u32,
    pub row_pitch: u32,
    pub slice_pitch: u32,
    pub data: Vec<u8>,
}

/// Pitches and byte size of one stored subresource.
#[derive(Debug, Clone, Copy)]
struct SoftLayout {
    row_bytes: u32,
    rows: u32,
    row_pitch: u32,
    slice_pitch: u32,
    size: u64,
}

impl SoftLayout {
    fn new(format: TextureFormat, extent: Extent3d) -> Result<Self> {
        let (row_bytes, rows) = format.row_layout(extent.width, extent.height);
        let row_pitch = (row_bytes.max(1) as u64).next_multiple_of(ROW_PITCH_ALIGNMENT as u64);
        let slice_pitch = row_pitch
            .checked_mul(rows as u64)
            .and_then(|bytes| bytes.checked_next_multiple_of(SLICE_PITCH_ALIGNMENT as u64))
            .ok_or(GraphicsError::OutOfMemory)?;
        let size = slice_pitch
            .checked_mul(extent.depth as u64)
            .ok_or(GraphicsError::OutOfMemory)?;
        Ok(Self {
            row_bytes,
            rows,
            row_pitch: u32::try_from(row_pitch).map_err(|_| GraphicsError::OutOfMemory)?,
            slice_pitch: u32::try_from(slice_pitch).map_err(|_| GraphicsError::OutOfMemory)?,
            size,
        })
    }
}

impl SoftSubresource {
    fn new(extent: Extent3d, layout: SoftLayout) -> Result<Self> {
        let size = usize::try_from(layout.size).map_err(|_| GraphicsError::OutOfMemory)?;
        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|_| GraphicsError::OutOfMemory)?;
        data.resize(size, 0);
        Ok(Self {
            extent,
            row_bytes: layout.row_bytes,
            rows: layout.rows,
            row_pitch: layout.row_pitch,
            slice_pitch: layout.slice_pitch,
            data,
        })
    }

    fn row_offset(&self, slice: u32, row: u32) -> usize {
        slice as usize * self.slice_pitch as usize + row as usize * self.row_pitch as usize
    }

    fn row(&self, slice: u32, row: u32) -> &[u8] {
        let start = self.row_offset(slice, row);
        &self.data[start..start + self.row_bytes as usize]
    }

    fn row_mut(&mut self, slice: u32, row: u32) -> &mut [u8] {
        let start = self.row_offset(slice, row);
        &mut self.data[start..start + self.row_bytes as usize]
    }

    fn upload(&mut self, source: &SubresourceData<'_>) -> Result<()> {
        if source.row_pitch < self.row_bytes {
            return Err(GraphicsError::InvalidParameter(format!(
                "row pitch {} is smaller than a row ({} bytes)",
                source.row_pitch, self.row_bytes
            )));
        }
        let required = (self.extent.depth - 1) as usize * source.slice_pitch as usize
            + (self.rows - 1) as usize * source.row_pitch as usize
            + self.row_bytes as usize;
        if source.data.len() < required {
            return Err(GraphicsError::InvalidParameter(format!(
                "initial data holds {} bytes, {} required",
                source.data.len(),
                required
            )));
        }
        for slice in 0..self.extent.depth {
            for row in 0..self.rows {
                let start = slice as usize * source.slice_pitch as usize
                    + row as usize * source.row_pitch as usize;
                let src = &source.data[start..start + self.row_bytes as usize];
                self.row_mut(slice, row).copy_from_slice(src);
            }
        }
        Ok(())
    }

    fn fill(&mut self, texel: &[u8]) {
        for slice in 0..self.extent.depth {
            for row in 0..self.rows {
                for pixel in self.row_mut(slice, row).chunks_exact_mut(texel.len()) {
                    pixel.copy_from_slice(texel);
                }
            }
        }
    }
}

/// One rectangle copy between subresources.
///
/// `source_box` is in normalized texture coordinates; `dest_box` is in
/// normalized coordinates of `viewport`, which is in pixels of the
/// destination subresource. The formats are those of the views, which may
/// differ from storage in sRGB-ness only.
#[derive(Clone, Copy)]
pub struct SoftBlitRequest<'a> {
    pub source: &'a SoftTexture,
    pub source_index: u32,
    pub source_format: TextureFormat,
    pub dest: &'a SoftTexture,
    pub dest_index: u32,
    pub dest_format: TextureFormat,
    pub viewport: Viewport,
    pub source_box: Box2,
    pub dest_box: Box2,
    pub filter: BlitFilter,
}

/// A texture held in host memory.
pub struct SoftTexture {
    desc: TextureDescriptor,
    subresources: Mutex<Vec<SoftSubresource>>,
    staging: bool,
    mapped: AtomicBool,
}

impl SoftTexture {
    /// Allocate zeroed storage for every subresource of `desc`.
    ///
    /// Fails with [`GraphicsError::OutOfMemory`] when the storage exceeds
    /// [`MAX_TEXTURE_BYTES`] or cannot be allocated.
    fn new(desc: TextureDescriptor, staging: bool) -> Result<Self> {
        let layouts = (0..desc.mip_level_count)
            .map(|mip| SoftLayout::new(desc.format, desc.mip_size(mip)))
            .collect::<Result<Vec<_>>>()?;
        let total = layouts
            .iter()
            .try_fold(0u64, |sum, layout| sum.checked_add(layout.size))
            .and_then(|per_layer| per_layer.checked_mul(desc.array_layers() as u64))
            .ok_or(GraphicsError::OutOfMemory)?;
        if total > MAX_TEXTURE_BYTES {
            log::warn!(
                "SoftwareBackend: texture {:?} needs {} bytes, limit is {}",
                desc.label,
                total,
                MAX_TEXTURE_BYTES
            );
            return Err(GraphicsError::OutOfMemory);
        }

        let mut subresources = Vec::with_capacity(desc.subresource_count() as usize);
        for _layer in 0..desc.array_layers() {
            for (mip, layout) in (0..desc.mip_level_count).zip(&layouts) {
                subresources.push(SoftSubresource::new(desc.mip_size(mip), *layout)?);
            }
        }
        Ok(Self {
            desc,
            subresources: Mutex::new(subresources),
            staging,
            mapped: AtomicBool::new(false),
        })
    }

    /// Creation descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }

    /// Copy of one subresource's storage.
    pub(crate) fn snapshot(&self, index: u32) -> Option<SoftSubresource> {
        self.subresources.lock().get(index as usize).cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if self.desc.immutable {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {:?} is immutable",
                self.desc.label
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SoftTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftTexture")
            .field("label", &self.desc.label)
            .field("size", &self.desc.size)
            .field("format", &self.desc.format)
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

/// A mapped staging texture. Unmaps when dropped.
pub struct SoftMapping<'a> {
    pub(crate) data: MappedMutexGuard<'a, [u8]>,
    pub(crate) row_pitch: u32,
    pub(crate) depth_pitch: u32,
    flag: &'a AtomicBool,
}

impl Drop for SoftMapping<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Software GPU backend.
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    textures_created: AtomicU64,
}

impl SoftwareBackend {
    /// Create a new software backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Software Backend"
    }

    /// Number of textures created so far, staging textures included.
    pub fn textures_created(&self) -> u64 {
        self.textures_created.load(Ordering::Relaxed)
    }

    /// Create a texture, uploading `initial_data` per subresource.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: &[SubresourceData<'_>],
    ) -> Result<GpuTexture> {
        log::trace!(
            "SoftwareBackend: creating texture {:?} ({}x{}x{}, {} mips, {})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth,
            descriptor.mip_level_count,
            descriptor.format
        );
        let texture = SoftTexture::new(descriptor.clone(), false)?;
        {
            let mut subresources = texture.subresources.lock();
            for (subresource, source) in subresources.iter_mut().zip(initial_data) {
                subresource.upload(source)?;
            }
        }
        self.textures_created.fetch_add(1, Ordering::Relaxed);
        Ok(GpuTexture::Software(Arc::new(texture)))
    }

    /// Create a CPU-readable staging texture holding one subresource of `extent`.
    pub fn create_staging(&self, format: TextureFormat, extent: Extent3d) -> Result<Arc<SoftTexture>> {
        let desc = if extent.depth > 1 {
            TextureDescriptor::new_3d(
                extent.width,
                extent.height,
                extent.depth,
                format,
                TextureUsage::empty(),
            )
        } else {
            TextureDescriptor::new_2d(extent.width, extent.height, format, TextureUsage::empty())
        }
        .with_label("staging");
        let staging = SoftTexture::new(desc, true)?;
        self.textures_created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(staging))
    }

    /// Copy subresource `index` of `source` into `staging`.
    pub fn copy_to_staging(
        &self,
        staging: &SoftTexture,
        source: &SoftTexture,
        index: u32,
    ) -> Result<()> {
        let src = source.snapshot(index).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("subresource {index} out of range"))
        })?;
        let mut dst_guard = staging.subresources.lock();
        let dst = dst_guard
            .first_mut()
            .ok_or_else(|| GraphicsError::Internal("staging texture has no storage".into()))?;
        if dst.extent != src.extent || dst.row_bytes != src.row_bytes {
            return Err(GraphicsError::InvalidParameter(format!(
                "staging extent {:?} does not match subresource extent {:?}",
                dst.extent, src.extent
            )));
        }
        for slice in 0..src.extent.depth {
            for row in 0..src.rows {
                dst.row_mut(slice, row).copy_from_slice(src.row(slice, row));
            }
        }
        Ok(())
    }

    /// Map a staging texture for reading.
    pub fn map<'a>(&self, staging: &'a SoftTexture) -> Result<SoftMapping<'a>> {
        if !staging.staging {
            return Err(GraphicsError::InvalidParameter(
                "only staging textures can be mapped".into(),
            ));
        }
        if staging.mapped.swap(true, Ordering::AcqRel) {
            return Err(GraphicsError::InvalidParameter(
                "staging texture is already mapped".into(),
            ));
        }
        let guard = staging.subresources.lock();
        let Some(first) = guard.first() else {
            staging.mapped.store(false, Ordering::Release);
            return Err(GraphicsError::Internal("staging texture has no storage".into()));
        };
        let (row_pitch, depth_pitch) = (first.row_pitch, first.slice_pitch);
        let data = MutexGuard::map(guard, |subresources| subresources[0].data.as_mut_slice());
        Ok(SoftMapping {
            data,
            row_pitch,
            depth_pitch,
            flag: &staging.mapped,
        })
    }

    /// Fill every subresource in `range` with `texel`.
    pub fn clear(&self, texture: &SoftTexture, range: SubresourceRange, texel: &[u8]) -> Result<()> {
        texture.check_writable()?;
        let mip_levels = texture.desc.mip_level_count;
        let mut subresources = texture.subresources.lock();
        for layer in range.base_array_layer..range.base_array_layer + range.array_layer_count {
            for mip in range.base_mip_level..range.base_mip_level + range.mip_level_count {
                let index = subresource_index(mip, layer, mip_levels) as usize;
                if let Some(subresource) = subresources.get_mut(index) {
                    subresource.fill(texel);
                }
            }
        }
        Ok(())
    }

    /// Draw `request.source_box` of the source into `request.dest_box` of
    /// the viewport on the destination.
    ///
    /// Byte-normalized texels are filtered in linear space. Channels are
    /// decoded when the source view is sRGB and encoded when the
    /// destination view is sRGB; alpha is never converted.
    pub fn blit(&self, request: &SoftBlitRequest<'_>) -> Result<()> {
        let SoftBlitRequest {
            source,
            source_index,
            source_format,
            dest,
            dest_index,
            dest_format,
            viewport,
            source_box,
            dest_box,
            filter,
        } = *request;
        dest.check_writable()?;
        let bytes_per_pixel = source_format
            .bytes_per_pixel()
            .ok_or(GraphicsError::UnsupportedFormat(source_format))?;
        if dest_format.bytes_per_pixel() != Some(bytes_per_pixel) {
            return Err(GraphicsError::UnsupportedFormat(dest_format));
        }
        let src = source.snapshot(source_index).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("subresource {source_index} out of range"))
        })?;

        let mut guard = dest.subresources.lock();
        let dst = guard.get_mut(dest_index as usize).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("subresource {dest_index} out of range"))
        })?;

        let x0 = viewport.x + dest_box.min[0] * viewport.width;
        let x1 = viewport.x + dest_box.max[0] * viewport.width;
        let y0 = viewport.y + dest_box.min[1] * viewport.height;
        let y1 = viewport.y + dest_box.max[1] * viewport.height;
        if x1 <= x0 || y1 <= y0 {
            return Ok(());
        }

        let normalized = is_byte_normalized(source_format);
        let bilinear = filter == BlitFilter::Linear && normalized;
        let decode = ChannelCodec::new(source_format);
        let encode = ChannelCodec::new(dest_format);
        let (sw, sh) = (src.extent.width as f32, src.extent.height as f32);
        let bpp = bytes_per_pixel as usize;
        let mut texel = vec![0u8; bpp];
        let mut linear = [0f32; 4];

        for py in 0..dst.extent.height {
            let cy = py as f32 + 0.5;
            if cy < y0 || cy >= y1 {
                continue;
            }
            let v = source_box.min[1] + (cy - y0) / (y1 - y0) * source_box.height();
            for px in 0..dst.extent.width {
                let cx = px as f32 + 0.5;
                if cx < x0 || cx >= x1 {
                    continue;
                }
                let u = source_box.min[0] + (cx - x0) / (x1 - x0) * source_box.width();
                if bilinear {
                    sample_bilinear(&src, decode, u * sw - 0.5, v * sh - 0.5, &mut linear[..bpp]);
                } else {
                    let sx = ((u * sw).floor() as i64).clamp(0, src.extent.width as i64 - 1);
                    let sy = ((v * sh).floor() as i64).clamp(0, src.extent.height as i64 - 1);
                    let start = sx as usize * bpp;
                    texel.copy_from_slice(&src.row(0, sy as u32)[start..start + bpp]);
                    if normalized {
                        for (channel, value) in linear[..bpp].iter_mut().enumerate() {
                            *value = decode.to_linear(channel, texel[channel]);
                        }
                    }
                }
                if normalized {
                    for (channel, byte) in texel.iter_mut().enumerate() {
                        *byte = encode.from_linear(channel, linear[channel]);
                    }
                }
                let start = px as usize * bpp;
                dst.row_mut(0, py)[start..start + bpp].copy_from_slice(&texel);
            }
        }
        Ok(())
    }

    /// Create a back buffer chain for headless presentation.
    pub fn create_swap_chain(&self, descriptor: &SwapChainDescriptor) -> Result<SoftSwapChain> {
        Ok(SoftSwapChain {
            format: descriptor.format,
            buffer: Arc::new(SoftTexture::new(descriptor.back_buffer_descriptor(), false)?),
            presented: 0,
        })
    }
}

fn is_byte_normalized(format: TextureFormat) -> bool {
    matches!(
        format.linear_variant(),
        TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B8G8R8X8_UNORM
            | TextureFormat::R8G8_UNORM
            | TextureFormat::R8_UNORM
            | TextureFormat::A8_UNORM
    )
}

/// Per-channel conversion between stored bytes and linear values.
#[derive(Debug, Clone, Copy)]
struct ChannelCodec {
    srgb: bool,
}

impl ChannelCodec {
    fn new(format: TextureFormat) -> Self {
        Self {
            srgb: format.is_srgb(),
        }
    }

    /// sRGB formats carry alpha in channel 3 for both RGBA and BGRA.
    fn converts(self, channel: usize) -> bool {
        self.srgb && channel < 3
    }

    fn to_linear(self, channel: usize, byte: u8) -> f32 {
        let value = byte as f32 / 255.0;
        if self.converts(channel) {
            srgb_to_linear(value)
        } else {
            value
        }
    }

    fn from_linear(self, channel: usize, value: f32) -> u8 {
        let value = value.clamp(0.0, 1.0);
        let value = if self.converts(channel) {
            linear_to_srgb(value)
        } else {
            value
        };
        (value * 255.0).round() as u8
    }
}

fn sample_bilinear(src: &SoftSubresource, codec: ChannelCodec, fx: f32, fy: f32, out: &mut [f32]) {
    let bpp = out.len();
    let max_x = src.extent.width as i64 - 1;
    let max_y = src.extent.height as i64 - 1;
    let (bx, by) = (fx.floor(), fy.floor());
    let (wx, wy) = (fx - bx, fy - by);
    let x0 = (bx as i64).clamp(0, max_x) as usize;
    let x1 = (bx as i64 + 1).clamp(0, max_x) as usize;
    let row0 = src.row(0, (by as i64).clamp(0, max_y) as u32);
    let row1 = src.row(0, (by as i64 + 1).clamp(0, max_y) as u32);
    for (channel, value) in out.iter_mut().enumerate() {
        let at = |row: &[u8], x: usize| codec.to_linear(channel, row[x * bpp + channel]);
        let top = at(row0, x0) * (1.0 - wx) + at(row0, x1) * wx;
        let bottom = at(row1, x0) * (1.0 - wx) + at(row1, x1) * wx;
        *value = top * (1.0 - wy) + bottom * wy;
    }
}

/// Bytes of one texel of `format` holding `color`.
///
/// Depth formats take the depth value from the first channel.
pub(crate) fn encode_clear_value(format: TextureFormat, color: [f32; 4]) -> Option<Vec<u8>> {
    let unorm8 = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    let srgb8 = |value: f32| unorm8(linear_to_srgb(value.clamp(0.0, 1.0)));
    let [r, g, b, a] = color;
    let bytes = match format {
        TextureFormat::R8G8B8A8_UNORM => vec![unorm8(r), unorm8(g), unorm8(b), unorm8(a)],
        TextureFormat::R8G8B8A8_UNORM_SRGB => vec![srgb8(r), srgb8(g), srgb8(b), unorm8(a)],
        TextureFormat::B8G8R8A8_UNORM => vec![unorm8(b), unorm8(g), unorm8(r), unorm8(a)],
        TextureFormat::B8G8R8A8_UNORM_SRGB => vec![srgb8(b), srgb8(g), srgb8(r), unorm8(a)],
        TextureFormat::R8G8_UNORM => vec![unorm8(r), unorm8(g)],
        TextureFormat::R8_UNORM => vec![unorm8(r)],
        TextureFormat::A8_UNORM => vec![unorm8(a)],
        TextureFormat::R16G16B16A16_FLOAT => [r, g, b, a]
            .iter()
            .flat_map(|&c| half::f16::from_f32(c).to_le_bytes())
            .collect(),
        TextureFormat::R16_FLOAT => half::f16::from_f32(r).to_le_bytes().to_vec(),
        TextureFormat::R32G32B32A32_FLOAT => bytemuck::cast_slice::<f32, u8>(&color).to_vec(),
        TextureFormat::R32_FLOAT | TextureFormat::D32_FLOAT => r.to_le_bytes().to_vec(),
        TextureFormat::D16_UNORM => ((r.clamp(0.0, 1.0) * 65535.0).round() as u16)
            .to_le_bytes()
            .to_vec(),
        _ => return None,
    };
    Some(bytes)
}

// ============================================================================
// Swap chain
// ============================================================================

/// Headless back-buffer chain.
pub struct SoftSwapChain {
    format: TextureFormat,
    buffer: Arc<SoftTexture>,
    presented: u64,
}

impl SoftSwapChain {
    /// Back-buffer format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Handle to the current back buffer.
    pub fn back_buffer(&self) -> GpuTexture {
        GpuTexture::Software(Arc::clone(&self.buffer))
    }

    /// Reallocate the back buffer at a new size.
    ///
    /// Fails with [`GraphicsError::SwapChainBusy`] while any handle returned
    /// by [`back_buffer`](Self::back_buffer) is still alive.
    pub fn resize(&mut self, descriptor: &SwapChainDescriptor) -> Result<()> {
        let outstanding = Arc::strong_count(&self.buffer) - 1;
        if outstanding > 0 {
            return Err(GraphicsError::SwapChainBusy(outstanding));
        }
        let buffer = SoftTexture::new(descriptor.back_buffer_descriptor(), false)?;
        self.format = descriptor.format;
        self.buffer = Arc::new(buffer);
        Ok(())
    }

    pub fn present(&mut self) {
        self.presented += 1;
        log::trace!("SoftSwapChain: presented frame {}", self.presented);
    }

    /// Frames presented since creation.
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }
}

impl std::fmt::Debug for SoftSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftSwapChain")
            .field("format", &self.format)
            .field("size", &self.buffer.desc.size)
            .field("presented", &self.presented)
            .finish()
    }
}
