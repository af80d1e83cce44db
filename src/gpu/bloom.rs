//! Bloom: luminance high-pass, a five level separable blur pyramid, then an additive
//! composite of the pyramid onto the scene.

use crate::{
    gpu::{
        pipelines::{PipelineSpec, fragment_uniform_entry, mk_render_pipeline, sampler_entry, texture_entry},
        texture::{Texture, create_screen_sampler},
    },
    post::{BLOOM_LEVELS, BloomSettings, bloom_weights},
};

/// Blur kernel radius per pyramid level; sigma equals the radius.
const KERNEL_RADII: [u32; BLOOM_LEVELS] = [3, 5, 7, 9, 11];

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    a: [f32; 4],
    b: [f32; 4],
}

struct Level {
    horizontal: Texture,
    vertical: Texture,
    horizontal_params: wgpu::Buffer,
    vertical_params: wgpu::Buffer,
}

/// Size-dependent targets, rebuilt when the bloom resolution changes.
struct Pyramid {
    resolution: [u32; 2],
    bright: Texture,
    levels: Vec<Level>,
}

/// Size of pyramid level `index` for a bloom resolution.
pub fn level_size(resolution: [u32; 2], index: usize) -> [u32; 2] {
    let shift = index as u32 + 1;
    [(resolution[0] >> shift).max(1), (resolution[1] >> shift).max(1)]
}

pub struct Bloom {
    layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    extract: wgpu::RenderPipeline,
    blur: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    extract_params: wgpu::Buffer,
    composite_params: wgpu::Buffer,
    pyramid: Option<Pyramid>,
}

fn shader(label: &'static str, fragment: &str) -> wgpu::ShaderModuleDescriptor<'static> {
    let source = format!("{}\n{}", include_str!("fullscreen.wgsl"), fragment);
    wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }
}

fn params_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<Params>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    label: &'static str,
    fragment: &str,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[Some(layout)],
        immediate_size: 0,
    });
    mk_render_pipeline(
        device,
        &pipeline_layout,
        PipelineSpec {
            label,
            color_format: format,
            blend: Some(wgpu::BlendState::REPLACE),
            depth_stencil: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            vertex_layouts: &[],
        },
        shader(label, fragment),
    )
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

impl Bloom {
    /// `output_format` is the format of the final composite target.
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_bind_group_layout"),
            entries: &[texture_entry(0), sampler_entry(1), fragment_uniform_entry(2)],
        });
        let mut composite_entries = vec![texture_entry(0), sampler_entry(1), fragment_uniform_entry(2)];
        composite_entries.extend((0..BLOOM_LEVELS as u32).map(|i| texture_entry(3 + i)));
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_composite_bind_group_layout"),
            entries: &composite_entries,
        });

        let extract = fullscreen_pipeline(
            device,
            &layout,
            Texture::HDR_FORMAT,
            "Bloom Extract",
            include_str!("bloom_extract.wgsl"),
        );
        let blur = fullscreen_pipeline(
            device,
            &layout,
            Texture::HDR_FORMAT,
            "Bloom Blur",
            include_str!("bloom_blur.wgsl"),
        );
        let composite = fullscreen_pipeline(
            device,
            &composite_layout,
            output_format,
            "Bloom Composite",
            include_str!("bloom_composite.wgsl"),
        );

        Self {
            extract,
            blur,
            composite,
            sampler: create_screen_sampler(device),
            extract_params: params_buffer(device, "bloom extract params"),
            composite_params: params_buffer(device, "bloom composite params"),
            layout,
            composite_layout,
            pyramid: None,
        }
    }

    fn ensure_pyramid(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, resolution: [u32; 2]) {
        if self.pyramid.as_ref().is_some_and(|p| p.resolution == resolution) {
            return;
        }
        log::debug!("bloom pyramid for {}x{}", resolution[0], resolution[1]);
        let levels = (0..BLOOM_LEVELS)
            .map(|i| {
                let size = level_size(resolution, i);
                let radius = KERNEL_RADII[i] as f32;
                let texel = [1.0 / size[0] as f32, 1.0 / size[1] as f32];
                let level = Level {
                    horizontal: Texture::create_render_target(
                        device,
                        size,
                        Texture::HDR_FORMAT,
                        &format!("bloom level {i} h"),
                    ),
                    vertical: Texture::create_render_target(
                        device,
                        size,
                        Texture::HDR_FORMAT,
                        &format!("bloom level {i} v"),
                    ),
                    horizontal_params: params_buffer(device, "bloom blur params"),
                    vertical_params: params_buffer(device, "bloom blur params"),
                };
                let kernel = [radius, radius, 0.0, 0.0];
                queue.write_buffer(
                    &level.horizontal_params,
                    0,
                    bytemuck::bytes_of(&Params {
                        a: [texel[0], 0.0, 0.0, 0.0],
                        b: kernel,
                    }),
                );
                queue.write_buffer(
                    &level.vertical_params,
                    0,
                    bytemuck::bytes_of(&Params {
                        a: [0.0, texel[1], 0.0, 0.0],
                        b: kernel,
                    }),
                );
                level
            })
            .collect();
        if let Some(old) = self.pyramid.take() {
            old.destroy();
        }
        self.pyramid = Some(Pyramid {
            resolution,
            bright: Texture::create_render_target(
                device,
                level_size(resolution, 0),
                Texture::HDR_FORMAT,
                "bloom bright",
            ),
            levels,
        });
    }

    fn source_group(
        &self,
        device: &wgpu::Device,
        source: &wgpu::TextureView,
        params: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }

    /// Records extract, blur and composite. `scene` is the HDR scene colour and `output` the
    /// final target.
    pub fn run(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene: &wgpu::TextureView,
        output: &wgpu::TextureView,
        settings: &BloomSettings,
    ) {
        self.ensure_pyramid(device, queue, settings.resolution);
        let weights = bloom_weights(settings.radius);
        queue.write_buffer(
            &self.extract_params,
            0,
            bytemuck::bytes_of(&Params {
                a: [settings.threshold, 0.0, 0.0, 0.0],
                b: [0.0; 4],
            }),
        );
        queue.write_buffer(
            &self.composite_params,
            0,
            bytemuck::bytes_of(&Params {
                a: [weights[0], weights[1], weights[2], weights[3]],
                b: [weights[4], settings.strength, 0.0, 0.0],
            }),
        );

        let Some(pyramid) = &self.pyramid else {
            return;
        };

        let extract_group = self.source_group(device, scene, &self.extract_params);
        fullscreen_pass(encoder, "Bloom Extract", &pyramid.bright.view, &self.extract, &extract_group);

        let mut source = &pyramid.bright.view;
        for level in &pyramid.levels {
            let horizontal = self.source_group(device, source, &level.horizontal_params);
            fullscreen_pass(encoder, "Bloom Blur H", &level.horizontal.view, &self.blur, &horizontal);
            let vertical = self.source_group(device, &level.horizontal.view, &level.vertical_params);
            fullscreen_pass(encoder, "Bloom Blur V", &level.vertical.view, &self.blur, &vertical);
            source = &level.vertical.view;
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(scene),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: self.composite_params.as_entire_binding(),
            },
        ];
        entries.extend(pyramid.levels.iter().enumerate().map(|(i, level)| wgpu::BindGroupEntry {
            binding: 3 + i as u32,
            resource: wgpu::BindingResource::TextureView(&level.vertical.view),
        }));
        let composite_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom_composite_bind_group"),
            layout: &self.composite_layout,
            entries: &entries,
        });
        fullscreen_pass(encoder, "Bloom Composite", output, &self.composite, &composite_group);
    }

    pub fn destroy(&mut self) {
        if let Some(pyramid) = self.pyramid.take() {
            pyramid.destroy();
        }
        self.extract_params.destroy();
        self.composite_params.destroy();
    }
}

impl Pyramid {
    fn destroy(self) {
        self.bright.texture.destroy();
        for level in self.levels {
            level.horizontal.texture.destroy();
            level.vertical.texture.destroy();
            level.horizontal_params.destroy();
            level.vertical_params.destroy();
        }
    }
}
