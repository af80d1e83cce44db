//! The wgpu implementation of [`Backend`].

pub mod bloom;
pub mod context;
pub mod pipelines;
pub mod texture;

use std::{collections::HashMap, time::Duration};

use wgpu::util::DeviceExt;

use crate::{
    backend::{Backend, DrawItem, Frame, GeometryId, SurfaceSize, TextureId},
    assets::TextureData,
    camera::CameraUniform,
    error::{Result, SketchError},
    geometry::Geometry,
    gpu::{
        bloom::Bloom,
        context::{Context, Output},
        pipelines::PbrPipelines,
        texture::Texture,
    },
    material::MaterialUniform,
};

/// Layout of the `Draw` uniform in `pbr.wgsl`. The normal matrix columns are padded to vec4.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    world: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    material: MaterialUniform,
}

impl From<&DrawItem> for DrawUniform {
    fn from(item: &DrawItem) -> Self {
        let n = item.normal;
        Self {
            world: item.world,
            normal: [
                [n[0][0], n[0][1], n[0][2], 0.0],
                [n[1][0], n[1][1], n[1][2], 0.0],
                [n[2][0], n[2][1], n[2][2], 0.0],
            ],
            material: item.material,
        }
    }
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

impl GpuGeometry {
    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

const READBACK_TIMEOUT: Duration = Duration::from_secs(3);

pub struct WgpuBackend {
    context: Context,
    pbr: PbrPipelines,
    bloom: Bloom,
    draw_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffers: Vec<wgpu::Buffer>,
    geometries: HashMap<GeometryId, GpuGeometry>,
    textures: HashMap<TextureId, Texture>,
    next_geometry: u32,
    next_texture: u32,
    fallback_env: Texture,
    default_normal: Texture,
    scene_target: Texture,
    depth_texture: Texture,
    disposed: bool,
}

impl WgpuBackend {
    pub fn new(context: Context) -> Self {
        let device = &context.device;
        let frame_layout = pipelines::frame_layout(device);
        let draw_layout = pipelines::draw_layout(device);
        let pbr = PbrPipelines::new(device, &frame_layout, &draw_layout, context.supports_wireframe());
        let bloom = Bloom::new(device, context.config.format);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let env_sampler = texture::create_environment_sampler(device);
        let repeat_sampler = texture::create_repeat_sampler(device);
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&env_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&repeat_sampler),
                },
            ],
        });

        let size = [context.config.width, context.config.height];
        Self {
            fallback_env: Texture::create_fallback_environment(device, &context.queue),
            default_normal: Texture::create_default_normal_map(device, &context.queue),
            scene_target: Texture::create_render_target(device, size, Texture::HDR_FORMAT, "scene colour"),
            depth_texture: Texture::create_depth_texture(device, size, "depth_texture"),
            pbr,
            bloom,
            draw_layout,
            camera_buffer,
            frame_bind_group,
            draw_buffers: Vec::new(),
            geometries: HashMap::new(),
            textures: HashMap::new(),
            next_geometry: 0,
            next_texture: 0,
            context,
            disposed: false,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pbr.len()
    }

    fn ensure_draw_buffers(&mut self, count: usize) {
        while self.draw_buffers.len() < count {
            let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Draw Buffer"),
                size: std::mem::size_of::<DrawUniform>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.draw_buffers.push(buffer);
        }
    }

    fn draw_bind_group(&self, index: usize, item: &DrawItem) -> wgpu::BindGroup {
        let view = |id: Option<TextureId>, fallback: &Texture| {
            id.and_then(|id| self.textures.get(&id))
                .map(|t| t.view.clone())
                .unwrap_or_else(|| fallback.view.clone())
        };
        let env = view(item.textures.env, &self.fallback_env);
        let normal = view(item.textures.normal, &self.default_normal);
        let clearcoat_normal = view(item.textures.clearcoat_normal, &self.default_normal);
        self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout: &self.draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.draw_buffers[index].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&env),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&normal),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&clearcoat_normal),
                },
            ],
        })
    }

    /// Reads back the last frame of a headless backend as 8-bit sRGB.
    pub async fn capture(&self) -> Result<image::RgbaImage> {
        let Output::Offscreen(texture) = &self.context.output else {
            return Err(SketchError::Render("capture needs a headless context".into()));
        };
        let (width, height) = (self.context.config.width, self.context.config.height);
        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let device = &self.context.device;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("capture buffer"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(Some(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(READBACK_TIMEOUT),
            })
            .map_err(|e| SketchError::Render(format!("poll: {e}")))?;
        rx.receive()
            .await
            .ok_or_else(|| SketchError::Render("readback channel closed".into()))?
            .map_err(|e| SketchError::Render(format!("map: {e}")))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        output_buffer.unmap();
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| SketchError::Render("capture size mismatch".into()))
    }
}

/// A frame target acquired from the output.
enum Acquired {
    Surface {
        texture: wgpu::SurfaceTexture,
        suboptimal: bool,
    },
    Offscreen(wgpu::TextureView),
}

impl WgpuBackend {
    fn acquire(&mut self) -> Result<Option<Acquired>> {
        let surface = match &self.context.output {
            Output::Offscreen(texture) => {
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                return Ok(Some(Acquired::Offscreen(view)));
            }
            Output::Surface { surface, .. } => surface,
        };
        match surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture) => Ok(Some(Acquired::Surface {
                texture,
                suboptimal: false,
            })),
            wgpu::CurrentSurfaceTexture::Suboptimal(texture) => Ok(Some(Acquired::Surface {
                texture,
                suboptimal: true,
            })),
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                log::debug!("surface not ready, skipping frame");
                Ok(None)
            }
            wgpu::CurrentSurfaceTexture::Outdated | wgpu::CurrentSurfaceTexture::Lost => {
                log::warn!("surface outdated, reconfiguring");
                self.context.reconfigure();
                Ok(None)
            }
            wgpu::CurrentSurfaceTexture::Validation => {
                Err(SketchError::Render("surface texture validation failed".into()))
            }
        }
    }
}

impl Backend for WgpuBackend {
    fn upload_geometry(&mut self, geometry: &Geometry) -> GeometryId {
        let device = &self.context.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", geometry.label)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", geometry.label)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(
            id,
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                num_elements: geometry.indices.len() as u32,
            },
        );
        id
    }

    fn upload_texture(&mut self, data: &TextureData) -> TextureId {
        let texture = Texture::from_data(&self.context.device, &self.context.queue, data);
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, texture);
        id
    }

    fn release_geometry(&mut self, id: GeometryId) {
        match self.geometries.remove(&id) {
            Some(geometry) => geometry.destroy(),
            None => log::warn!("release of unknown geometry {id:?}"),
        }
    }

    fn release_texture(&mut self, id: TextureId) {
        match self.textures.remove(&id) {
            Some(texture) => texture.texture.destroy(),
            None => log::warn!("release of unknown texture {id:?}"),
        }
    }

    fn resize(&mut self, size: SurfaceSize) {
        if self.disposed || size.width == 0 || size.height == 0 {
            return;
        }
        self.context.resize(size.width, size.height);
        let device = &self.context.device;
        let dims = [size.width, size.height];
        self.scene_target.texture.destroy();
        self.depth_texture.texture.destroy();
        self.scene_target = Texture::create_render_target(device, dims, Texture::HDR_FORMAT, "scene colour");
        self.depth_texture = Texture::create_depth_texture(device, dims, "depth_texture");
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        if self.disposed {
            return Err(SketchError::Disposed);
        }
        let Some(acquired) = self.acquire()? else {
            return Ok(());
        };
        let output_view = match &acquired {
            Acquired::Surface { texture, .. } => texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            Acquired::Offscreen(view) => view.clone(),
        };

        self.context
            .queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[frame.camera]));
        self.ensure_draw_buffers(frame.items.len());
        let mut bind_groups = Vec::with_capacity(frame.items.len());
        for (index, item) in frame.items.iter().enumerate() {
            let uniform = DrawUniform::from(item);
            self.context.queue.write_buffer(
                &self.draw_buffers[index],
                0,
                bytemuck::cast_slice(&[uniform]),
            );
            bind_groups.push(self.draw_bind_group(index, item));
        }

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let [r, g, b, a] = frame.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.scene_target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (item, bind_group) in frame.items.iter().zip(&bind_groups) {
                let Some(geometry) = self.geometries.get(&item.geometry) else {
                    log::warn!("draw of unknown geometry {:?}", item.geometry);
                    continue;
                };
                pass.set_pipeline(self.pbr.get(&self.context.device, item.state));
                pass.set_bind_group(1, bind_group, &[]);
                pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..geometry.num_elements, 0, 0..1);
            }
        }

        self.bloom.run(
            &self.context.device,
            &self.context.queue,
            &mut encoder,
            &self.scene_target.view,
            &output_view,
            &frame.bloom,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        if let Acquired::Surface { texture, suboptimal } = acquired {
            if let Some(window) = self.context.window() {
                window.pre_present_notify();
            }
            texture.present();
            if suboptimal {
                self.context.reconfigure();
            }
        }
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for (_, geometry) in self.geometries.drain() {
            geometry.destroy();
        }
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
        for buffer in self.draw_buffers.drain(..) {
            buffer.destroy();
        }
        self.camera_buffer.destroy();
        self.bloom.destroy();
        self.scene_target.texture.destroy();
        self.depth_texture.texture.destroy();
        self.fallback_env.texture.destroy();
        self.default_normal.texture.destroy();
        self.disposed = true;
        log::info!("gpu resources released");
    }
}
