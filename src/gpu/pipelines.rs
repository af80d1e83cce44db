use std::collections::HashMap;

use crate::{backend::RenderState, geometry::ModelVertex, gpu::texture::Texture};

/// Everything that varies between the pipelines this crate builds.
pub struct PipelineSpec<'a> {
    pub label: &'a str,
    pub color_format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub polygon_mode: wgpu::PolygonMode,
    pub vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    spec: PipelineSpec<'_>,
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(spec.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: spec.vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.color_format,
                blend: spec.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: spec.polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: spec.depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

pub(crate) fn fragment_uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    uniform_entry(binding, wgpu::ShaderStages::FRAGMENT)
}

/// Group 0: camera, environment sampler, repeat sampler.
pub fn frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("frame_bind_group_layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            sampler_entry(1),
            sampler_entry(2),
        ],
    })
}

/// Group 1: per-draw uniform plus environment, normal and clearcoat normal maps.
pub fn draw_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("draw_bind_group_layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            texture_entry(1),
            texture_entry(2),
            texture_entry(3),
        ],
    })
}

/// PBR pipelines, built the first time a [`RenderState`] is drawn.
pub struct PbrPipelines {
    layout: wgpu::PipelineLayout,
    wireframe_supported: bool,
    cache: HashMap<RenderState, wgpu::RenderPipeline>,
}

impl PbrPipelines {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        draw_layout: &wgpu::BindGroupLayout,
        wireframe_supported: bool,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PBR Pipeline Layout"),
            bind_group_layouts: &[Some(frame_layout), Some(draw_layout)],
            immediate_size: 0,
        });
        Self {
            layout,
            wireframe_supported,
            cache: HashMap::new(),
        }
    }

    pub fn get(&mut self, device: &wgpu::Device, state: RenderState) -> &wgpu::RenderPipeline {
        let layout = &self.layout;
        let wireframe_supported = self.wireframe_supported;
        self.cache.entry(state).or_insert_with(|| {
            log::debug!("building pipeline for {state:?}");
            if state.wireframe && !wireframe_supported {
                log::warn!("wireframe requested but POLYGON_MODE_LINE is unavailable");
            }
            let polygon_mode = if state.wireframe && wireframe_supported {
                wgpu::PolygonMode::Line
            } else {
                wgpu::PolygonMode::Fill
            };
            let blend = if state.transparent {
                wgpu::BlendState::ALPHA_BLENDING
            } else {
                wgpu::BlendState::REPLACE
            };
            mk_render_pipeline(
                device,
                layout,
                PipelineSpec {
                    label: "PBR Pipeline",
                    color_format: Texture::HDR_FORMAT,
                    blend: Some(blend),
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: Texture::DEPTH_FORMAT,
                        depth_write_enabled: Some(state.depth_write),
                        depth_compare: Some(if state.depth_test {
                            wgpu::CompareFunction::LessEqual
                        } else {
                            wgpu::CompareFunction::Always
                        }),
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    polygon_mode,
                    vertex_layouts: &[ModelVertex::desc()],
                },
                wgpu::ShaderModuleDescriptor {
                    label: Some("PBR Shader"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("pbr.wgsl").into()),
                },
            )
        })
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
