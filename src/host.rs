//! Windowed host: owns the event loop and drives a [`Sketch`] with a [`WgpuBackend`].
//!
//! Left drag orbits, the wheel zooms, `S` toggles the swooping camera, `R` toggles root
//! rotation and `Escape` closes the window.

use std::{path::PathBuf, sync::Arc, time::Duration};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    assets::{AssetLoader, DEFAULT_TIMEOUT},
    control::Control,
    error::SketchError,
    gpu::{WgpuBackend, context::Context},
    sketch::Sketch,
    variant::Variant,
};

/// Pixel deltas reported by touchpads are converted to wheel lines at this rate.
const PIXELS_PER_LINE: f32 = 50.0;

pub struct HostOptions {
    pub variant: Variant,
    /// Directory asset paths are resolved against.
    pub assets: PathBuf,
    pub timeout: Duration,
}

impl HostOptions {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            assets: PathBuf::from("assets"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

struct Running {
    window: Arc<Window>,
    sketch: Sketch<WgpuBackend>,
}

impl Running {
    /// Logical viewport size and scale factor of the window.
    fn viewport(&self) -> (f32, u32, u32) {
        let scale = self.window.scale_factor();
        let logical = self.window.inner_size().to_logical::<f64>(scale);
        (scale as f32, logical.width.round() as u32, logical.height.round() as u32)
    }

    fn follow_viewport(&mut self) {
        let (scale, width, height) = self.viewport();
        if let Err(e) = self.sketch.resize(scale, width, height) {
            log::error!("resize failed: {e}");
        }
    }

    fn toggle(&mut self, control: Control) {
        if let Err(e) = self.sketch.apply(control) {
            log::warn!("{} rejected: {e}", control.field());
        }
    }
}

pub struct App {
    options: Option<HostOptions>,
    async_runtime: tokio::runtime::Runtime,
    loader: Option<AssetLoader>,
    running: Option<Running>,
    start: Instant,
    last_time: Instant,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    error: Option<SketchError>,
}

impl App {
    fn new(options: HostOptions) -> anyhow::Result<Self> {
        Ok(Self {
            options: Some(options),
            async_runtime: tokio::runtime::Runtime::new()?,
            loader: None,
            running: None,
            start: Instant::now(),
            last_time: Instant::now(),
            dragging: false,
            cursor: None,
            error: None,
        })
    }

    fn start(&mut self, event_loop: &ActiveEventLoop, options: HostOptions) -> crate::error::Result<()> {
        let title = format!("prism: {}", options.variant.name);
        let window = event_loop
            .create_window(Window::default_attributes().with_title(title))
            .map_err(|e| SketchError::Context(format!("window: {e}")))?;
        let window = Arc::new(window);

        let context = self.async_runtime.block_on(Context::new(window.clone()))?;
        let backend = WgpuBackend::new(context);
        let scale = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale);
        let mut sketch = Sketch::configure(
            options.variant,
            backend,
            logical.width.round() as u32,
            logical.height.round() as u32,
        )?;

        let loader = AssetLoader::new(options.assets)?.with_timeout(options.timeout);
        sketch.load_assets(&loader)?;
        self.loader = Some(loader);

        let mut running = Running { window, sketch };
        running.follow_viewport();
        running.window.request_redraw();
        self.running = Some(running);
        self.start = Instant::now();
        self.last_time = Instant::now();
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut running) = self.running.take() {
            if let Err(e) = running.sketch.unload() {
                log::warn!("unload: {e}");
            }
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SketchError) {
        log::error!("{error}");
        self.error = Some(error);
        self.shutdown(event_loop);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = &mut self.running else {
            return;
        };
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        let time = self.start.elapsed().as_secs_f32();

        let result = running.sketch.render(time, dt.as_secs_f32());
        for failure in running.sketch.take_failures() {
            log::warn!("{failure}");
        }
        match result {
            Ok(()) => running.window.request_redraw(),
            Err(e) if e.is_fatal() => self.fail(event_loop, e),
            Err(e) => {
                log::error!("render failed: {e}");
                running.window.request_redraw();
            }
        }
    }

    fn key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        if code == KeyCode::Escape {
            self.shutdown(event_loop);
            return;
        }
        let Some(running) = &mut self.running else {
            return;
        };
        let options = running.sketch.options();
        match code {
            KeyCode::KeyS => {
                let swoop = !options.enable_swooping_camera;
                running.toggle(Control::EnableSwoopingCamera(swoop));
            }
            KeyCode::KeyR => {
                let rotate = !options.enable_rotation;
                running.toggle(Control::EnableRotation(rotate));
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(options) = self.options.take() else {
            return;
        };
        if let Err(e) = self.start(event_loop, options) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::KeyboardInput { event, .. } => self.key(event_loop, &event),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(running) = &mut self.running {
                    running.follow_viewport();
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(position);
                let (Some(running), Some(previous), true) = (&mut self.running, previous, self.dragging)
                else {
                    return;
                };
                let height = running.window.inner_size().height as f32;
                running.sketch.controls_mut().rotate_by_pixels(
                    (position.x - previous.x) as f32,
                    (position.y - previous.y) as f32,
                    height,
                );
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let Some(running) = &mut self.running else {
                    return;
                };
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                running.sketch.controls_mut().zoom_by(steps);
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut running) = self.running.take() {
            if let Err(e) = running.sketch.unload() {
                log::warn!("unload: {e}");
            }
        }
    }
}

/// Opens a window and runs the selected variant until it is closed.
pub fn run(options: HostOptions) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(options)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
