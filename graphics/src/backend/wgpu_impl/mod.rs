//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12, and WebGPU. Commands are submitted as soon as they
//! are recorded, so the context's ordering guarantees hold without a
//! separate command list.

pub mod blit;
pub(crate) mod conversion;
mod resources;
mod swapchain;

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::{GpuView, PresentTarget};
use crate::device::{DeviceCapabilities, DeviceParameters};
use crate::error::{GraphicsError, Result};

pub use resources::{WgpuStaging, WgpuTexture};
pub use swapchain::WgpuSwapChain;

/// Optional features requested when the adapter has them.
const OPTIONAL_FEATURES: wgpu::Features = wgpu::Features::TEXTURE_COMPRESSION_BC
    .union(wgpu::Features::DEPTH32FLOAT_STENCIL8)
    .union(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM);

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a backend, and a presentation target when `window` is given.
    pub fn new<W>(params: &DeviceParameters, window: Option<W>) -> Result<(Self, PresentTarget)>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        // Configure instance flags based on validation/debug settings
        let mut flags = wgpu::InstanceFlags::default();
        if params.validation {
            flags |= wgpu::InstanceFlags::VALIDATION;
        }
        if params.debug {
            flags |= wgpu::InstanceFlags::DEBUG;
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        let surface = window
            .map(|window| {
                instance.create_surface(window).map_err(|e| {
                    GraphicsError::InitializationFailed(format!(
                        "Failed to create wgpu surface: {e}"
                    ))
                })
            })
            .transpose()?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface.as_ref(),
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("No compatible GPU adapter: {e}"))
        })?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(&params.label),
            required_features: adapter.features() & OPTIONAL_FEATURES,
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("Device creation failed: {e}"))
        })?;

        let target = match surface {
            Some(surface) => PresentTarget::Wgpu(surface),
            None => PresentTarget::Headless,
        };
        let backend = Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        };
        Ok((backend, target))
    }

    /// Get the wgpu adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        let limits = self.device.limits();
        DeviceCapabilities {
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            max_texture_dimension_3d: limits.max_texture_dimension_3d,
        }
    }

    /// Block until all submitted work has finished.
    pub fn wait_idle(&self) {
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) -> wgpu::SubmissionIndex {
        self.queue.submit(std::iter::once(encoder.finish()))
    }

    /// Clear a color view.
    pub fn clear_color(&self, view: &GpuView, color: [f32; 4]) -> Result<()> {
        let view = wgpu_view(view)?;
        let mut encoder = self.encoder("Clear Color Encoder");
        {
            let [r, g, b, a] = color.map(f64::from);
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Color"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.submit(encoder);
        Ok(())
    }

    /// Clear the depth aspect of a depth view.
    pub fn clear_depth(&self, view: &GpuView, depth: f32) -> Result<()> {
        let view = wgpu_view(view)?;
        let mut encoder = self.encoder("Clear Depth Encoder");
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Depth"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.submit(encoder);
        Ok(())
    }
}

fn wgpu_view(view: &GpuView) -> Result<&wgpu::TextureView> {
    match view {
        GpuView::Wgpu(view) => Ok(view),
        #[allow(unreachable_patterns)]
        _ => Err(GraphicsError::Internal(
            "view belongs to a different backend".to_string(),
        )),
    }
}
