//! Immediate device context.
//!
//! The [`DeviceContext`] holds the pipeline bindings (render targets and
//! viewport) and executes copies, clears and readback maps. Commands are
//! executed in submission order and `map_read` blocks until earlier work has
//! finished.

use std::sync::Arc;

use crate::backend::software::encode_clear_value;
use crate::backend::{GpuBackend, GpuStaging, GpuTexture};
use crate::device::GraphicsDevice;
use crate::error::{GraphicsError, Result};
use crate::staging::{MappedData, MappedSubresource, StagingTexture};
use crate::types::{Viewport, subresource_index};
use crate::view::{DepthStencilView, RenderTargetView};

/// Single-threaded command context of a [`GraphicsDevice`].
///
/// Bound views hold references to their textures. Unbind them before
/// resizing a swap chain whose back buffer they view.
pub struct DeviceContext {
    device: Arc<GraphicsDevice>,
    render_target: Option<RenderTargetView>,
    depth_stencil: Option<DepthStencilView>,
    viewport: Viewport,
}

impl DeviceContext {
    /// Create a context with nothing bound.
    pub fn new(device: Arc<GraphicsDevice>) -> Self {
        Self {
            device,
            render_target: None,
            depth_stencil: None,
            viewport: Viewport::default(),
        }
    }

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    // ------------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------------

    /// Bind a color target and optional depth target for draws and blits.
    pub fn set_render_targets(
        &mut self,
        render_target: Option<&RenderTargetView>,
        depth_stencil: Option<&DepthStencilView>,
    ) {
        self.render_target = render_target.cloned();
        self.depth_stencil = depth_stencil.cloned();
    }

    /// Release every bound target.
    pub fn unbind_render_targets(&mut self) {
        self.render_target = None;
        self.depth_stencil = None;
    }

    pub fn render_target(&self) -> Option<&RenderTargetView> {
        self.render_target.as_ref()
    }

    pub fn depth_stencil(&self) -> Option<&DepthStencilView> {
        self.depth_stencil.as_ref()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ------------------------------------------------------------------------
    // Clears
    // ------------------------------------------------------------------------

    /// Fill a render target with `color` (linear RGBA).
    pub fn clear_render_target(&self, view: &RenderTargetView, color: [f32; 4]) -> Result<()> {
        match (self.device.backend(), view.texture()) {
            (GpuBackend::Software(software), GpuTexture::Software(texture)) => {
                let texel = encode_clear_value(view.format(), color)
                    .ok_or(GraphicsError::UnsupportedFormat(view.format()))?;
                software.clear(texture, view.range(), &texel)
            }
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), GpuTexture::Wgpu(_)) => gpu.clear_color(view.raw(), color),
            #[allow(unreachable_patterns)]
            _ => Err(foreign_resource()),
        }
    }

    /// Fill a depth target with `depth`.
    pub fn clear_depth(&self, view: &DepthStencilView, depth: f32) -> Result<()> {
        match (self.device.backend(), view.texture()) {
            (GpuBackend::Software(software), GpuTexture::Software(texture)) => {
                let texel = encode_clear_value(view.format(), [depth, 0.0, 0.0, 0.0])
                    .ok_or(GraphicsError::UnsupportedFormat(view.format()))?;
                software.clear(texture, view.range(), &texel)
            }
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), GpuTexture::Wgpu(_)) => gpu.clear_depth(view.raw(), depth),
            #[allow(unreachable_patterns)]
            _ => Err(foreign_resource()),
        }
    }

    // ------------------------------------------------------------------------
    // Readback
    // ------------------------------------------------------------------------

    /// Copy mip `mip` of layer `layer` of `source` into `staging`.
    ///
    /// The staging resource must have been created with the subresource's
    /// extent and a format of the same pixel size.
    pub fn copy_subresource(
        &self,
        staging: &StagingTexture,
        source: &GpuTexture,
        mip: u32,
        layer: u32,
    ) -> Result<()> {
        let desc = source.descriptor();
        if mip >= desc.mip_level_count || layer >= desc.array_layers() {
            return Err(GraphicsError::InvalidParameter(format!(
                "subresource (mip {mip}, layer {layer}) outside {} mips x {} layers",
                desc.mip_level_count,
                desc.array_layers()
            )));
        }
        if staging.extent() != desc.mip_size(mip) {
            return Err(GraphicsError::InvalidParameter(format!(
                "staging extent {:?} does not match mip {mip} extent {:?}",
                staging.extent(),
                desc.mip_size(mip)
            )));
        }
        if staging.format().bits_per_pixel() != desc.format.bits_per_pixel() {
            return Err(GraphicsError::InvalidParameter(format!(
                "staging format {} does not match texture format {}",
                staging.format(),
                desc.format
            )));
        }

        match (self.device.backend(), staging.raw(), source) {
            (
                GpuBackend::Software(software),
                GpuStaging::Software(staging),
                GpuTexture::Software(texture),
            ) => software.copy_to_staging(
                staging,
                texture,
                subresource_index(mip, layer, desc.mip_level_count),
            ),
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), GpuStaging::Wgpu(staging), GpuTexture::Wgpu(texture)) => {
                gpu.copy_to_staging(staging, texture, mip, layer)
            }
            #[allow(unreachable_patterns)]
            _ => Err(foreign_resource()),
        }
    }

    /// Map `staging` for reading, waiting for pending copies.
    ///
    /// Only one mapping of a staging resource may be alive at a time.
    pub fn map_read<'a>(&self, staging: &'a StagingTexture) -> Result<MappedSubresource<'a>> {
        match (self.device.backend(), staging.raw()) {
            (GpuBackend::Software(software), GpuStaging::Software(texture)) => {
                let mapping = software.map(texture)?;
                let (row_pitch, depth_pitch) = (mapping.row_pitch, mapping.depth_pitch);
                Ok(MappedSubresource::new(
                    MappedData::Software(mapping),
                    row_pitch,
                    depth_pitch,
                ))
            }
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), GpuStaging::Wgpu(buffer)) => {
                let (bytes, row_pitch, depth_pitch) = gpu.map_staging(buffer)?;
                Ok(MappedSubresource::new(
                    MappedData::Wgpu(bytes),
                    row_pitch,
                    depth_pitch,
                ))
            }
            #[allow(unreachable_patterns)]
            _ => Err(foreign_resource()),
        }
    }

    /// Block until every submitted command has executed.
    pub fn flush(&self) {
        match self.device.backend() {
            GpuBackend::Software(_) => {}
            #[cfg(feature = "wgpu-backend")]
            GpuBackend::Wgpu(gpu) => gpu.wait_idle(),
        }
    }
}

impl std::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("device", &self.device.name())
            .field("render_target", &self.render_target.as_ref().map(|v| v.id()))
            .field("depth_stencil", &self.depth_stencil.as_ref().map(|v| v.id()))
            .field("viewport", &self.viewport)
            .finish()
    }
}

fn foreign_resource() -> GraphicsError {
    GraphicsError::Internal("resource belongs to a different backend".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendType;
    use crate::device::DeviceParameters;
    use crate::format::TextureFormat;
    use crate::types::{Extent3d, TextureDescriptor, TextureUsage, ViewDescriptor, ViewDimension};

    fn context() -> DeviceContext {
        let device =
            GraphicsDevice::new(DeviceParameters::new().with_backend(BackendType::Software))
                .unwrap();
        DeviceContext::new(device)
    }

    #[test]
    fn test_clear_and_read_back() {
        let ctx = context();
        let device = ctx.device().clone();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    3,
                    2,
                    TextureFormat::R8G8B8A8_UNORM,
                    TextureUsage::RENDER_TARGET,
                ),
                &[],
            )
            .unwrap();
        let rtv = device
            .create_render_target_view(
                &texture,
                &ViewDescriptor::new(TextureFormat::R8G8B8A8_UNORM, ViewDimension::D2),
            )
            .unwrap();
        ctx.clear_render_target(&rtv, [0.0, 1.0, 0.0, 1.0]).unwrap();

        let staging = device
            .create_staging_texture(TextureFormat::R8G8B8A8_UNORM, Extent3d::new_2d(3, 2))
            .unwrap();
        ctx.copy_subresource(&staging, &texture, 0, 0).unwrap();
        let mapped = ctx.map_read(&staging).unwrap();
        assert!(mapped.row_pitch() >= 12);
        for row in 0..2 {
            assert_eq!(mapped.row(0, row, 12), &[0, 255, 0, 255].repeat(3)[..]);
        }
    }

    #[test]
    fn test_copy_rejects_wrong_extent() {
        let ctx = context();
        let device = ctx.device().clone();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    4,
                    4,
                    TextureFormat::R8G8B8A8_UNORM,
                    TextureUsage::SHADER_RESOURCE,
                )
                .with_mip_levels(2),
                &[],
            )
            .unwrap();
        let staging = device
            .create_staging_texture(TextureFormat::R8G8B8A8_UNORM, Extent3d::new_2d(4, 4))
            .unwrap();
        assert!(ctx.copy_subresource(&staging, &texture, 1, 0).is_err());
        assert!(ctx.copy_subresource(&staging, &texture, 0, 1).is_err());
        assert!(ctx.copy_subresource(&staging, &texture, 0, 0).is_ok());
    }

    #[test]
    fn test_bindings_hold_references() {
        let mut ctx = context();
        let device = ctx.device().clone();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    2,
                    2,
                    TextureFormat::R8G8B8A8_UNORM,
                    TextureUsage::RENDER_TARGET,
                ),
                &[],
            )
            .unwrap();
        let rtv = device
            .create_render_target_view(
                &texture,
                &ViewDescriptor::new(TextureFormat::R8G8B8A8_UNORM, ViewDimension::D2),
            )
            .unwrap();
        ctx.set_render_targets(Some(&rtv), None);
        drop(rtv);
        assert_eq!(texture.handle_count(), 2);
        ctx.unbind_render_targets();
        assert_eq!(texture.handle_count(), 1);
    }
}
