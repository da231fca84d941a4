//! Window creation and event handling via winit.
//!
//! [`ExplorerApp`] implements winit's [`ApplicationHandler`]: it creates the
//! window and GPU context on resume, queues input for the frame scheduler,
//! and drives one session frame plus one renderer frame per redraw.

use std::sync::Arc;
use std::time::Instant;

use nebula_config::Config;
use nebula_graph::SimilarityGraph;
use nebula_render::{
    FrameView, GraphRenderer, LabelHandle, RenderContext, RendererSettings, SurfaceError,
    init_render_context_blocking,
};
use nebula_scene::SphericalLayout;
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::frame_loop::{FrameHandler, FrameScheduler, FrameTime};
use crate::session::{ExplorerSession, FrameOutcome, InputEvent, SessionSettings};

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    let attributes = WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            f64::from(config.window.width),
            f64::from(config.window.height),
        ));
    if config.window.fullscreen {
        attributes.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        attributes
    }
}

/// Renderer settings derived from the config. A background shader file that
/// cannot be read falls back to the built-in shader.
pub fn renderer_settings_from_config(config: &Config) -> RendererSettings {
    let background_shader = config
        .render
        .background_shader
        .as_deref()
        .and_then(|path| match std::fs::read_to_string(path) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!("Cannot read background shader {}: {e}", path.display());
                None
            }
        });

    RendererSettings {
        node_color: config.render.node_color,
        link_color: config.render.link_color,
        result_color: config.render.result_color,
        label_height: config.render.label_height,
        poster_dir: config.render.poster_dir.clone(),
        background: config.render.background,
        background_shader,
        ..RendererSettings::default()
    }
}

/// Frames-per-second counter for the window title.
#[derive(Debug)]
struct FpsCounter {
    window_start: Instant,
    frames: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
        }
    }

    /// Count a frame; returns the rate once per second.
    fn frame(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.window_start.elapsed().as_secs_f32();
        if elapsed < 1.0 {
            return None;
        }
        let fps = self.frames as f32 / elapsed;
        self.frames = 0;
        self.window_start = Instant::now();
        Some(fps)
    }
}

/// One frame's worth of borrowed state, driven by the scheduler.
struct FrameContext<'a> {
    session: &'a mut ExplorerSession<LabelHandle>,
    renderer: &'a mut GraphRenderer,
    gpu: &'a RenderContext,
    outcome: FrameOutcome,
    fatal: bool,
}

impl FrameHandler<InputEvent> for FrameContext<'_> {
    fn apply_input(&mut self, event: InputEvent) {
        self.session.apply(event, &mut *self.renderer);
    }

    fn render(&mut self, time: FrameTime) {
        self.outcome = self.session.frame(time.timestamp, &mut *self.renderer);

        let snapshot = self.session.pointer_snapshot();
        let view = FrameView {
            scene: self.session.scene(),
            camera: self.session.camera(),
            background: self.session.background_frame(&snapshot, time.timestamp),
        };
        match self.renderer.render(self.gpu, &view) {
            Ok(()) => {}
            Err(SurfaceError::Timeout) => debug!("Surface timeout, skipping frame"),
            Err(SurfaceError::Lost) => warn!("Surface lost, skipping frame"),
            Err(SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                self.fatal = true;
            }
        }
    }
}

/// The explorer window: session state plus the GPU objects created on resume.
pub struct ExplorerApp {
    config: Config,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    renderer: Option<GraphRenderer>,
    session: ExplorerSession<LabelHandle>,
    scheduler: FrameScheduler<InputEvent>,
    fps: FpsCounter,
    title: String,
    closed: bool,
}

impl ExplorerApp {
    pub fn new(config: Config, graph: SimilarityGraph) -> Self {
        let layout = Box::new(SphericalLayout::new(config.render.layout_radius));
        let session = ExplorerSession::new(graph, layout, SessionSettings::from_config(&config));
        Self {
            title: config.window.title.clone(),
            config,
            window: None,
            gpu: None,
            renderer: None,
            session,
            scheduler: FrameScheduler::new(),
            fps: FpsCounter::new(),
            closed: false,
        }
    }

    pub fn session(&self) -> &ExplorerSession<LabelHandle> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ExplorerSession<LabelHandle> {
        &mut self.session
    }

    fn request_redraw(&mut self) {
        if let Some(window) = &self.window
            && self.scheduler.request_frame()
        {
            window.request_redraw();
        }
    }

    fn queue(&mut self, event: InputEvent) {
        if self.scheduler.push(event) {
            self.request_redraw();
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(width, height);
        }
        self.session.resize(width, height);
        debug!("Surface resized to {width}x{height}");
        self.request_redraw();
    }

    /// Re-read the background shader file and swap it in if it compiles.
    fn reload_shader(&mut self) {
        let Some(path) = self.config.render.background_shader.clone() else {
            info!("No background shader file configured");
            return;
        };
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match std::fs::read_to_string(&path) {
            Ok(source) => match renderer.replace_background_shader(&source) {
                Ok(()) => info!("Reloaded background shader {}", path.display()),
                Err(e) => warn!("Keeping previous background shader: {e}"),
            },
            Err(e) => warn!("Cannot read background shader {}: {e}", path.display()),
        }
        self.request_redraw();
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::KeyR) => self.reload_shader(),
            PhysicalKey::Code(KeyCode::Escape) => self.queue(InputEvent::ClearSelection),
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(gpu), Some(renderer)) = (self.gpu.as_ref(), self.renderer.as_mut()) else {
            return;
        };
        let mut frame = FrameContext {
            session: &mut self.session,
            renderer,
            gpu,
            outcome: FrameOutcome::default(),
            fatal: false,
        };
        if self.scheduler.tick(&mut frame).is_none() {
            return;
        }
        let FrameContext { outcome, fatal, .. } = frame;

        if fatal {
            self.shutdown();
            event_loop.exit();
            return;
        }
        if let Some(title) = outcome.title {
            self.title = title;
            self.apply_title(None);
        }
        if self.config.debug.show_fps
            && let Some(fps) = self.fps.frame()
        {
            self.apply_title(Some(fps));
        }

        // The background animates continuously.
        self.request_redraw();
    }

    fn apply_title(&self, fps: Option<f32>) {
        if let Some(window) = &self.window {
            match fps {
                Some(fps) => window.set_title(&format!("{} ({fps:.0} fps)", self.title)),
                None => window.set_title(&self.title),
            }
        }
    }

    /// Teardown: stop frames, release GPU objects and overlays, then detach input.
    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.scheduler.cancel();
        if let Some(renderer) = self.renderer.as_mut() {
            self.session.dispose(renderer);
            renderer.dispose();
        }
        self.scheduler.detach_input();
        info!("Explorer shut down after {} frames", self.scheduler.frame_count());
    }
}

impl ApplicationHandler for ExplorerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.closed {
            return;
        }

        let window = match event_loop.create_window(window_attributes_from_config(&self.config)) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let gpu = match init_render_context_blocking(window.clone(), self.config.window.vsync) {
            Ok(gpu) => gpu,
            Err(e) => {
                error!("GPU initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let renderer = match GraphRenderer::init(&gpu, renderer_settings_from_config(&self.config)) {
            Ok(renderer) => renderer,
            Err(e) => {
                error!("Renderer initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let (width, height) = gpu.size();
        self.session.resize(width, height);
        info!(
            "Window ready: {}x{} (scale: {:.2})",
            width,
            height,
            window.scale_factor()
        );

        self.gpu = Some(gpu);
        self.renderer = Some(renderer);
        self.window = Some(window);
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            WindowEvent::CursorMoved { position, .. } => self.queue(InputEvent::CursorMoved {
                x: position.x,
                y: position.y,
            }),
            WindowEvent::CursorLeft { .. } => self.queue(InputEvent::CursorLeft),
            WindowEvent::MouseInput { state, button, .. } => {
                self.queue(InputEvent::MouseButton { button, state });
            }
            WindowEvent::MouseWheel { delta, .. } => self.queue(InputEvent::Wheel(delta)),
            WindowEvent::Touch(touch) => self.queue(InputEvent::Touch {
                id: touch.id,
                phase: touch.phase,
                x: touch.location.x,
                y: touch.location.y,
            }),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

/// Creates an event loop and runs the explorer until the window closes.
#[instrument(skip_all)]
pub fn run(config: Config, graph: SimilarityGraph) -> Result<(), EventLoopError> {
    let event_loop = EventLoop::new()?;
    let mut app = ExplorerApp::new(config, graph);
    event_loop.run_app(&mut app)
}
