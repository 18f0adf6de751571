//! wgpu back-buffer chain.
//!
//! Rendering goes to an offscreen back buffer that supports every view the
//! surface layer needs. Presenting copies it into the acquired surface
//! frame, or draws it there when the surface format cannot take a copy.

use std::sync::Arc;

use crate::backend::{GpuTexture, PresentTarget, SwapChainDescriptor};
use crate::blit::BlitFilter;
use crate::error::{GraphicsError, Result};
use crate::types::{Box2, Viewport};

use super::WgpuBackend;
use super::blit::{BlitRequest, WgpuBlitter};
use super::conversion::{convert_present_mode, convert_texture_format};
use super::resources::WgpuTexture;

/// Back-buffer chain presenting to an optional wgpu surface.
pub struct WgpuSwapChain {
    surface: Option<wgpu::Surface<'static>>,
    config: Option<wgpu::SurfaceConfiguration>,
    back_buffer: Arc<WgpuTexture>,
    blitter: Option<WgpuBlitter>,
    presented: u64,
}

impl std::fmt::Debug for WgpuSwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuSwapChain")
            .field("back_buffer", &self.back_buffer)
            .field("surface_format", &self.config.as_ref().map(|c| c.format))
            .field("presented", &self.presented)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a back-buffer chain presenting to `target`.
    pub fn create_swap_chain(
        &self,
        target: PresentTarget,
        descriptor: &SwapChainDescriptor,
    ) -> Result<WgpuSwapChain> {
        let surface = match target {
            PresentTarget::Wgpu(surface) => Some(surface),
            PresentTarget::Headless => None,
        };
        let mut chain = WgpuSwapChain {
            surface,
            config: None,
            back_buffer: self.create_back_buffer(descriptor)?,
            blitter: None,
            presented: 0,
        };
        chain.configure(self, descriptor)?;
        Ok(chain)
    }

    fn create_back_buffer(&self, descriptor: &SwapChainDescriptor) -> Result<Arc<WgpuTexture>> {
        match self.create_texture(&descriptor.back_buffer_descriptor(), &[])? {
            GpuTexture::Wgpu(texture) => Ok(texture),
            #[allow(unreachable_patterns)]
            _ => Err(GraphicsError::Internal(
                "wgpu backend created a foreign texture".to_string(),
            )),
        }
    }
}

impl WgpuSwapChain {
    /// Handle to the current back buffer.
    pub fn back_buffer(&self) -> GpuTexture {
        GpuTexture::Wgpu(Arc::clone(&self.back_buffer))
    }

    /// Frames presented since creation.
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    fn configure(&mut self, gpu: &WgpuBackend, descriptor: &SwapChainDescriptor) -> Result<()> {
        let Some(surface) = &self.surface else {
            return Ok(());
        };
        let caps = surface.get_capabilities(gpu.adapter());
        let preferred = convert_texture_format(descriptor.format).map(|f| f.remove_srgb_suffix());
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| Some(f.remove_srgb_suffix()) == preferred)
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                GraphicsError::InitializationFailed(
                    "Surface is not supported by the adapter".to_string(),
                )
            })?;

        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if caps.usages.contains(wgpu::TextureUsages::COPY_DST) {
            usage |= wgpu::TextureUsages::COPY_DST;
        }

        let config = wgpu::SurfaceConfiguration {
            usage,
            format,
            width: descriptor.width,
            height: descriptor.height,
            present_mode: convert_present_mode(descriptor.vsync),
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: descriptor.buffer_count.saturating_sub(1).max(1),
        };
        surface.configure(gpu.device(), &config);
        log::info!(
            "Configured wgpu surface: {}x{} {:?}",
            config.width,
            config.height,
            config.format
        );
        self.config = Some(config);
        Ok(())
    }

    /// Reallocate the back buffer and reconfigure the surface.
    ///
    /// Fails with [`GraphicsError::SwapChainBusy`] while any back-buffer
    /// handle is still alive.
    pub fn resize(&mut self, gpu: &WgpuBackend, descriptor: &SwapChainDescriptor) -> Result<()> {
        let outstanding = Arc::strong_count(&self.back_buffer) - 1;
        if outstanding > 0 {
            return Err(GraphicsError::SwapChainBusy(outstanding));
        }
        gpu.wait_idle();
        self.back_buffer = gpu.create_back_buffer(descriptor)?;
        self.configure(gpu, descriptor)
    }

    fn acquire(&self, gpu: &WgpuBackend) -> Result<Option<wgpu::SurfaceTexture>> {
        let (Some(surface), Some(config)) = (&self.surface, &self.config) else {
            return Ok(None);
        };
        match surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface frame acquisition timed out, skipping frame");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(GraphicsError::OutOfMemory),
            Err(e) => {
                log::warn!("Surface frame unavailable ({e}), reconfiguring");
                surface.configure(gpu.device(), config);
                surface.get_current_texture().map(Some).map_err(|e| {
                    log::error!("Surface still unavailable after reconfigure: {e}");
                    GraphicsError::SurfaceLost
                })
            }
        }
    }

    /// Show the back buffer.
    pub fn present(&mut self, gpu: &WgpuBackend) -> Result<()> {
        let Some(frame) = self.acquire(gpu)? else {
            self.presented += 1;
            return Ok(());
        };

        let frame_format = frame.texture.format();
        let back_format = self.back_buffer.storage_format();
        let copyable = frame.texture.usage().contains(wgpu::TextureUsages::COPY_DST)
            && frame_format.remove_srgb_suffix() == back_format.remove_srgb_suffix()
            && frame.texture.width() == self.back_buffer.raw().width()
            && frame.texture.height() == self.back_buffer.raw().height();

        if copyable {
            let mut encoder = gpu.encoder("Present Copy Encoder");
            encoder.copy_texture_to_texture(
                self.back_buffer.raw().as_image_copy(),
                frame.texture.as_image_copy(),
                frame.texture.size(),
            );
            gpu.submit(encoder);
        } else {
            let source = self
                .back_buffer
                .raw()
                .create_view(&wgpu::TextureViewDescriptor::default());
            let target = frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            let (width, height) = (frame.texture.width(), frame.texture.height());
            let blitter = self.blitter.get_or_insert_with(|| WgpuBlitter::new(gpu));
            blitter.draw(
                gpu,
                &BlitRequest {
                    source: &source,
                    source_format: self.back_buffer.descriptor().format,
                    source_storage: back_format,
                    target: &target,
                    target_format: frame_format,
                    target_size: (width, height),
                    viewport: Viewport::from_dimensions(width, height),
                    filter: BlitFilter::Linear,
                    src_box: Box2::UNIT,
                    dst_box: Box2::UNIT,
                },
            )?;
        }

        frame.present();
        self.presented += 1;
        log::trace!("WgpuSwapChain: presented frame {}", self.presented);
        Ok(())
    }
}
