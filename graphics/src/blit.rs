//! Textured rectangle copies into the bound render target.
//!
//! [`BlitPipeline`] draws a region of a sampled view into the render target
//! currently bound on a [`DeviceContext`], restricted to the context's
//! viewport. Regions are [`Box2`] values in normalized `[0, 1]` coordinates:
//! the source box in texture space, the destination box in viewport space.

use std::sync::Arc;

use crate::backend::software::SoftBlitRequest;
use crate::backend::{GpuBackend, GpuTexture};
use crate::context::DeviceContext;
use crate::device::GraphicsDevice;
use crate::error::{GraphicsError, Result};
use crate::types::{Box2, subresource_index};
use crate::view::{ShaderResourceView, TextureView};

#[cfg(feature = "wgpu-backend")]
use crate::backend::GpuView;
#[cfg(feature = "wgpu-backend")]
use crate::backend::wgpu_impl::blit::{BlitRequest, WgpuBlitter};
#[cfg(feature = "wgpu-backend")]
use crate::backend::wgpu_impl::conversion::convert_texture_format;
#[cfg(feature = "wgpu-backend")]
use crate::types::ViewDimension;

/// Sampling filter of a blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlitFilter {
    /// Nearest texel.
    #[default]
    Point,
    /// Bilinear interpolation of the four nearest texels.
    Linear,
}

enum BlitState {
    Software,
    #[cfg(feature = "wgpu-backend")]
    Wgpu(WgpuBlitter),
}

/// Draws textured rectangles.
///
/// # Example
///
/// ```ignore
/// let blitter = BlitPipeline::new(surface.device().clone())?;
/// surface.bind_display_target()?;
/// blitter.blit_fullscreen(surface.context(), &srv, BlitFilter::Linear, Box2::UNIT)?;
/// ```
pub struct BlitPipeline {
    device: Arc<GraphicsDevice>,
    state: BlitState,
}

impl BlitPipeline {
    /// Prepare blit state for `device`.
    pub fn new(device: Arc<GraphicsDevice>) -> Result<Self> {
        let state = match device.backend() {
            GpuBackend::Software(_) => BlitState::Software,
            #[cfg(feature = "wgpu-backend")]
            GpuBackend::Wgpu(gpu) => BlitState::Wgpu(WgpuBlitter::new(gpu)),
        };
        Ok(Self { device, state })
    }

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    /// Draw `src_box` of `source` over the whole viewport.
    pub fn blit_fullscreen(
        &self,
        ctx: &DeviceContext,
        source: &ShaderResourceView,
        filter: BlitFilter,
        src_box: Box2,
    ) -> Result<()> {
        self.blit(ctx, source, filter, src_box, Box2::UNIT)
    }

    /// Draw `src_box` of `source` into `dst_box` of the viewport.
    ///
    /// The base mip and base layer of `source` are sampled.
    pub fn blit(
        &self,
        ctx: &DeviceContext,
        source: &ShaderResourceView,
        filter: BlitFilter,
        src_box: Box2,
        dst_box: Box2,
    ) -> Result<()> {
        let target = ctx.render_target().ok_or_else(|| {
            GraphicsError::InvalidParameter("blit needs a bound render target".into())
        })?;
        if src_box.is_empty() || dst_box.is_empty() {
            log::trace!("Skipping blit of empty region {src_box:?} -> {dst_box:?}");
            return Ok(());
        }

        match (&self.state, ctx.device().backend()) {
            (BlitState::Software, GpuBackend::Software(software)) => {
                #[allow(irrefutable_let_patterns)]
                let (GpuTexture::Software(src), GpuTexture::Software(dst)) =
                    (source.texture(), target.texture())
                else {
                    return Err(GraphicsError::Internal(
                        "blit resource belongs to a different backend".into(),
                    ));
                };
                if source.format().linear_variant() != target.format().linear_variant() {
                    return Err(GraphicsError::UnsupportedFormat(target.format()));
                }
                software.blit(&SoftBlitRequest {
                    source: src,
                    source_index: base_subresource(source.as_view()),
                    source_format: source.format(),
                    dest: dst,
                    dest_index: base_subresource(target.as_view()),
                    dest_format: target.format(),
                    viewport: ctx.viewport(),
                    source_box: src_box,
                    dest_box: dst_box,
                    filter,
                })
            }
            #[cfg(feature = "wgpu-backend")]
            (BlitState::Wgpu(blitter), GpuBackend::Wgpu(gpu)) => {
                let (
                    GpuTexture::Wgpu(src),
                    GpuView::Wgpu(src_view),
                    GpuView::Wgpu(dst_view),
                ) = (source.texture(), source.raw(), target.raw())
                else {
                    return Err(GraphicsError::Internal(
                        "blit resource belongs to a different backend".into(),
                    ));
                };
                if source.dimension() != ViewDimension::D2 {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "blit source must be a 2D view, got {:?}",
                        source.dimension()
                    )));
                }
                let target_format = convert_texture_format(target.format())
                    .ok_or(GraphicsError::UnsupportedFormat(target.format()))?;
                let size = target.size();
                blitter.draw(
                    gpu,
                    &BlitRequest {
                        source: src_view,
                        source_format: source.format(),
                        source_storage: src.storage_format(),
                        target: dst_view,
                        target_format,
                        target_size: (size.width, size.height),
                        viewport: ctx.viewport(),
                        filter,
                        src_box,
                        dst_box,
                    },
                )
            }
            #[allow(unreachable_patterns)]
            _ => Err(GraphicsError::Internal(
                "blit pipeline belongs to a different device".into(),
            )),
        }
    }
}

/// Subresource index of a view's first mip and layer.
fn base_subresource(view: &TextureView) -> u32 {
    let range = view.range();
    subresource_index(
        range.base_mip_level,
        range.base_array_layer,
        view.texture().descriptor().mip_level_count,
    )
}
