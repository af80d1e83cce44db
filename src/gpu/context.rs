use std::sync::Arc;

use winit::window::Window;

use crate::error::{Result, SketchError};

/// Where frames end up: a window surface, or an offscreen texture for headless runs.
#[derive(Debug)]
pub(crate) enum Output {
    Surface {
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
    },
    Offscreen(wgpu::Texture),
}

/// Device, queue and output shared by every GPU resource of a sketch.
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub(crate) output: Output,
    pub(crate) features: wgpu::Features,
}

fn fatal(what: &str, e: impl std::fmt::Display) -> SketchError {
    SketchError::Context(format!("{what}: {e}"))
}

/// Features we use when the adapter offers them.
fn optional_features(adapter: &wgpu::Adapter) -> wgpu::Features {
    adapter.features() & wgpu::Features::POLYGON_MODE_LINE
}

async fn open_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("prism device"),
            required_features: optional_features(adapter),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        })
        .await
        .map_err(|e| fatal("device", e))
}

impl Context {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| fatal("surface", e))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| fatal("adapter", e))?;
        log::info!("using adapter {}", adapter.get_info().name);
        let (device, queue) = open_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The composite pass writes linear colour and relies on an sRGB target for encoding.
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| fatal("surface", "no supported formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            features: device.features(),
            device,
            queue,
            config,
            output: Output::Surface { window, surface },
        })
    }

    /// A context without a window, drawing into an offscreen sRGB texture that
    /// [`crate::gpu::WgpuBackend::capture`] can read back.
    pub async fn headless(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| fatal("adapter", e))?;
        let (device, queue) = open_device(&adapter).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let texture = offscreen_texture(&device, &config);
        Ok(Self {
            features: device.features(),
            device,
            queue,
            config,
            output: Output::Offscreen(texture),
        })
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        match &self.output {
            Output::Surface { window, .. } => Some(window),
            Output::Offscreen(_) => None,
        }
    }

    pub fn supports_wireframe(&self) -> bool {
        self.features.contains(wgpu::Features::POLYGON_MODE_LINE)
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        match &mut self.output {
            Output::Surface { surface, .. } => surface.configure(&self.device, &self.config),
            Output::Offscreen(texture) => *texture = offscreen_texture(&self.device, &self.config),
        }
    }

    pub(crate) fn reconfigure(&self) {
        if let Output::Surface { surface, .. } = &self.output {
            surface.configure(&self.device, &self.config);
        }
    }
}

fn offscreen_texture(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen output"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
