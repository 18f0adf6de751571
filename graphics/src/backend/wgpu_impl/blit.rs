//! Textured rectangle drawing for the wgpu backend.
//!
//! Used by [`BlitPipeline`](crate::BlitPipeline) and by swap chains whose
//! surface format cannot take a plain copy of the back buffer.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

use crate::blit::BlitFilter;
use crate::error::{GraphicsError, Result};
use crate::format::TextureFormat;
use crate::types::{Box2, Viewport};

use super::WgpuBackend;

const BLIT_SHADER: &str = r#"
struct BlitParams {
    src: vec4<f32>,
    dst: vec4<f32>,
};

@group(0) @binding(0) var<uniform> params: BlitParams;
@group(0) @binding(1) var source: texture_2d<f32>;
@group(0) @binding(2) var source_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = vec2<f32>(f32(index & 1u), f32(index >> 1u));
    let pos = mix(params.dst.xy, params.dst.zw, corner);
    var out: VertexOutput;
    out.position = vec4<f32>(pos.x * 2.0 - 1.0, 1.0 - pos.y * 2.0, 0.0, 1.0);
    out.uv = mix(params.src.xy, params.src.zw, corner);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSampleLevel(source, source_sampler, in.uv, 0.0);
}
"#;

/// Uniform block of the blit shader.
///
/// `src` is the sampled region in texture space, `dst` the covered region in
/// target space, both as `[min_x, min_y, max_x, max_y]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BlitParams {
    src: [f32; 4],
    dst: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<BlitParams>(), 32);

/// One rectangle draw.
pub struct BlitRequest<'a> {
    pub source: &'a wgpu::TextureView,
    pub source_format: TextureFormat,
    /// Storage format of the sampled texture.
    pub source_storage: wgpu::TextureFormat,
    pub target: &'a wgpu::TextureView,
    /// Format of the target view.
    pub target_format: wgpu::TextureFormat,
    pub target_size: (u32, u32),
    pub viewport: Viewport,
    pub filter: BlitFilter,
    pub src_box: Box2,
    pub dst_box: Box2,
}

/// Pipelines and samplers for rectangle draws.
pub struct WgpuBlitter {
    shader: wgpu::ShaderModule,
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    point_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
    params: wgpu::Buffer,
    pipelines: Mutex<HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>>,
}

impl std::fmt::Debug for WgpuBlitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBlitter")
            .field("pipelines", &self.pipelines.lock().len())
            .finish()
    }
}

impl WgpuBlitter {
    pub fn new(gpu: &WgpuBackend) -> Self {
        let device = gpu.device();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let sampler = |label, filter| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                ..Default::default()
            })
        };
        let point_sampler = sampler("Blit Point Sampler", wgpu::FilterMode::Nearest);
        let linear_sampler = sampler("Blit Linear Sampler", wgpu::FilterMode::Linear);

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blit Params"),
            size: std::mem::size_of::<BlitParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            shader,
            layout,
            pipeline_layout,
            point_sampler,
            linear_sampler,
            params,
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    fn pipeline(&self, gpu: &WgpuBackend, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        let mut pipelines = self.pipelines.lock();
        pipelines
            .entry(format)
            .or_insert_with(|| {
                log::debug!("Creating blit pipeline for {:?}", format);
                gpu.device()
                    .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Blit Pipeline"),
                        layout: Some(&self.pipeline_layout),
                        vertex: wgpu::VertexState {
                            module: &self.shader,
                            entry_point: Some("vs_main"),
                            buffers: &[],
                            compilation_options: Default::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &self.shader,
                            entry_point: Some("fs_main"),
                            targets: &[Some(wgpu::ColorTargetState {
                                format,
                                blend: None,
                                write_mask: wgpu::ColorWrites::ALL,
                            })],
                            compilation_options: Default::default(),
                        }),
                        primitive: wgpu::PrimitiveState {
                            topology: wgpu::PrimitiveTopology::TriangleStrip,
                            ..Default::default()
                        },
                        depth_stencil: None,
                        multisample: wgpu::MultisampleState::default(),
                        multiview_mask: None,
                        cache: None,
                    })
            })
            .clone()
    }

    /// Draw `request.src_box` of the source into `request.dst_box` of the viewport.
    pub fn draw(&self, gpu: &WgpuBackend, request: &BlitRequest<'_>) -> Result<()> {
        let sample_type = request
            .source_storage
            .sample_type(None, Some(gpu.device().features()));
        if sample_type != Some(wgpu::TextureSampleType::Float { filterable: true }) {
            log::warn!("Blit source {} cannot be filtered", request.source_format);
            return Err(GraphicsError::UnsupportedFormat(request.source_format));
        }

        let (width, height) = request.target_size;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let viewport = request.viewport;
        let to_target = |value: f32, origin: f32, extent: f32, size: u32| {
            (origin + value * extent) / size as f32
        };
        let params = BlitParams {
            src: [
                request.src_box.min[0],
                request.src_box.min[1],
                request.src_box.max[0],
                request.src_box.max[1],
            ],
            dst: [
                to_target(request.dst_box.min[0], viewport.x, viewport.width, width),
                to_target(request.dst_box.min[1], viewport.y, viewport.height, height),
                to_target(request.dst_box.max[0], viewport.x, viewport.width, width),
                to_target(request.dst_box.max[1], viewport.y, viewport.height, height),
            ],
        };
        gpu.queue()
            .write_buffer(&self.params, 0, bytemuck::bytes_of(&params));

        let sampler = match request.filter {
            BlitFilter::Point => &self.point_sampler,
            BlitFilter::Linear => &self.linear_sampler,
        };
        let bind_group = gpu
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blit Bind Group"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.params.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(request.source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });
        let pipeline = self.pipeline(gpu, request.target_format);

        let mut encoder = gpu.encoder("Blit Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: request.target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..4, 0..1);
        }
        gpu.submit(encoder);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blit_params_layout() {
        let params = BlitParams {
            src: [0.0, 0.0, 1.0, 1.0],
            dst: [0.25, 0.25, 0.75, 0.75],
        };
        let bytes = bytemuck::bytes_of(&params);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[16..20], &0.25f32.to_ne_bytes());
    }
}
