//! Resource creation and readback for the wgpu backend.

use std::sync::Arc;

use crate::backend::{GpuTexture, GpuView};
use crate::error::{GraphicsError, Result};
use crate::format::TextureFormat;
use crate::types::{
    Extent3d, SubresourceData, SubresourceRange, TextureDescriptor, TextureDimension,
    ViewDescriptor, ViewKind, subresource_index,
};

use super::WgpuBackend;
use super::conversion::{
    convert_texture_dimension, convert_texture_format, convert_texture_usage,
    convert_view_dimension, srgb_twin, storage_format,
};

/// A texture owned by the wgpu backend.
pub struct WgpuTexture {
    desc: TextureDescriptor,
    texture: wgpu::Texture,
    format: wgpu::TextureFormat,
}

impl WgpuTexture {
    pub(super) fn new(desc: TextureDescriptor, texture: wgpu::Texture) -> Self {
        let format = texture.format();
        Self {
            desc,
            texture,
            format,
        }
    }

    /// Creation descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.desc
    }

    /// The wgpu texture.
    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Format the texture is stored in.
    pub fn storage_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

impl std::fmt::Debug for WgpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuTexture")
            .field("label", &self.desc.label)
            .field("size", &self.desc.size)
            .field("format", &self.format)
            .finish()
    }
}

/// CPU-readable buffer holding one subresource.
pub struct WgpuStaging {
    buffer: wgpu::Buffer,
    extent: Extent3d,
    row_pitch: u32,
    depth_pitch: u32,
    rows: u32,
}

impl std::fmt::Debug for WgpuStaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuStaging")
            .field("extent", &self.extent)
            .field("row_pitch", &self.row_pitch)
            .field("depth_pitch", &self.depth_pitch)
            .finish()
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Aspect that copies of a texture stored in `format` go through.
fn copy_aspect(format: wgpu::TextureFormat) -> wgpu::TextureAspect {
    if format.is_depth_stencil_format() {
        wgpu::TextureAspect::DepthOnly
    } else {
        wgpu::TextureAspect::All
    }
}

impl WgpuBackend {
    /// Create a texture and upload its initial contents.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: &[SubresourceData<'_>],
    ) -> Result<GpuTexture> {
        let format = storage_format(descriptor)
            .ok_or(GraphicsError::UnsupportedFormat(descriptor.format))?;
        let mut usage = convert_texture_usage(descriptor.usage);
        if format.is_depth_stencil_format() {
            // Depth is only written by rendering.
            usage.remove(wgpu::TextureUsages::COPY_DST);
        }

        if !self.device.features().contains(format.required_features()) {
            log::warn!("{} needs device features that are not enabled", descriptor.format);
            return Err(GraphicsError::UnsupportedFormat(descriptor.format));
        }
        let allowed = self
            .adapter
            .get_texture_format_features(format)
            .allowed_usages;
        if !allowed.contains(usage) {
            log::warn!(
                "{} does not support usage {:?} (allowed {:?})",
                descriptor.format,
                usage,
                allowed
            );
            return Err(GraphicsError::UnsupportedFormat(descriptor.format));
        }

        let (dimension, depth_or_array_layers) = convert_texture_dimension(descriptor);
        let view_formats: Vec<wgpu::TextureFormat> = srgb_twin(format).into_iter().collect();

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: wgpu::Extent3d {
                width: descriptor.size.width,
                height: descriptor.size.height,
                depth_or_array_layers,
            },
            mip_level_count: descriptor.mip_level_count,
            sample_count: 1,
            dimension,
            format,
            usage,
            view_formats: &view_formats,
        });

        for layer in 0..descriptor.array_layers() {
            for mip in 0..descriptor.mip_level_count {
                let index = subresource_index(mip, layer, descriptor.mip_level_count);
                let Some(data) = initial_data.get(index as usize) else {
                    continue;
                };
                self.upload_subresource(&texture, descriptor, data, mip, layer);
            }
        }

        log::trace!(
            "wgpu: created texture {:?} {:?} {:?}",
            descriptor.label,
            descriptor.size,
            format
        );
        Ok(GpuTexture::Wgpu(Arc::new(WgpuTexture::new(
            descriptor.clone(),
            texture,
        ))))
    }

    fn upload_subresource(
        &self,
        texture: &wgpu::Texture,
        descriptor: &TextureDescriptor,
        data: &SubresourceData<'_>,
        mip: u32,
        layer: u32,
    ) {
        let size = descriptor.mip_size(mip);
        let (block_width, block_height) = texture.format().block_dimensions();
        let (_, rows) = descriptor.format.row_layout(size.width, size.height);
        let (origin_z, depth) = match descriptor.dimension {
            TextureDimension::D3 => (0, size.depth),
            TextureDimension::D2 | TextureDimension::Cube => (layer, 1),
        };

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: mip,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: origin_z,
                },
                aspect: copy_aspect(texture.format()),
            },
            data.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.row_pitch),
                rows_per_image: Some(rows),
            },
            wgpu::Extent3d {
                width: align_to(size.width, block_width),
                height: align_to(size.height, block_height),
                depth_or_array_layers: depth,
            },
        );
    }

    /// Create the wgpu view for a validated view descriptor.
    pub fn create_view(
        &self,
        texture: &Arc<WgpuTexture>,
        kind: ViewKind,
        descriptor: &ViewDescriptor,
        range: &SubresourceRange,
    ) -> Result<GpuView> {
        let stored = texture.storage_format();
        let (format, aspect) = if stored.is_depth_stencil_format() {
            let aspect = match kind {
                ViewKind::DepthStencil => wgpu::TextureAspect::All,
                _ => wgpu::TextureAspect::DepthOnly,
            };
            (stored, aspect)
        } else {
            let requested = convert_texture_format(descriptor.format)
                .ok_or(GraphicsError::UnsupportedFormat(descriptor.format))?;
            if requested != stored && srgb_twin(stored) != Some(requested) {
                return Err(GraphicsError::UnsupportedFormat(descriptor.format));
            }
            (requested, wgpu::TextureAspect::All)
        };

        let view = texture.raw().create_view(&wgpu::TextureViewDescriptor {
            label: descriptor.label.as_deref(),
            format: Some(format),
            dimension: Some(convert_view_dimension(descriptor.dimension)),
            aspect,
            base_mip_level: range.base_mip_level,
            mip_level_count: Some(range.mip_level_count),
            base_array_layer: range.base_array_layer,
            array_layer_count: Some(range.array_layer_count),
            ..Default::default()
        });
        Ok(GpuView::Wgpu(Arc::new(view)))
    }

    /// Create a readback buffer for one subresource of `extent`.
    pub fn create_staging(&self, format: TextureFormat, extent: Extent3d) -> Result<WgpuStaging> {
        let bytes_per_pixel = format
            .bytes_per_pixel()
            .ok_or(GraphicsError::UnsupportedFormat(format))?;
        let row_pitch = align_to(
            extent.width * bytes_per_pixel,
            wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
        );
        let depth_pitch = row_pitch * extent.height;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: u64::from(depth_pitch) * u64::from(extent.depth),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Ok(WgpuStaging {
            buffer,
            extent,
            row_pitch,
            depth_pitch,
            rows: extent.height,
        })
    }

    /// Copy subresource (`mip`, `layer`) of `texture` into `staging`.
    pub fn copy_to_staging(
        &self,
        staging: &WgpuStaging,
        texture: &Arc<WgpuTexture>,
        mip: u32,
        layer: u32,
    ) -> Result<()> {
        let stored = texture.storage_format();
        // Combined depth-stencil storage has no copyable layout matching its size.
        if stored.has_stencil_aspect() {
            return Err(GraphicsError::UnsupportedFormat(texture.descriptor().format));
        }
        let origin_z = match texture.descriptor().dimension {
            TextureDimension::D3 => 0,
            TextureDimension::D2 | TextureDimension::Cube => layer,
        };

        let mut encoder = self.encoder("Readback Encoder");
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: texture.raw(),
                mip_level: mip,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: origin_z,
                },
                aspect: copy_aspect(stored),
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(staging.row_pitch),
                    rows_per_image: Some(staging.rows),
                },
            },
            wgpu::Extent3d {
                width: staging.extent.width,
                height: staging.extent.height,
                depth_or_array_layers: staging.extent.depth,
            },
        );
        self.submit(encoder);
        Ok(())
    }

    /// Wait for pending copies and read the staging buffer back.
    ///
    /// Returns the bytes with their row and depth pitch.
    pub fn map_staging(&self, staging: &WgpuStaging) -> Result<(Vec<u8>, u32, u32)> {
        let slice = staging.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(GraphicsError::Internal(format!(
                    "Failed to map staging buffer: {e}"
                )));
            }
            Err(_) => return Err(GraphicsError::DeviceLost),
        }

        let data = slice.get_mapped_range().to_vec();
        staging.buffer.unmap();
        Ok((data, staging.row_pitch, staging.depth_pitch))
    }
}
