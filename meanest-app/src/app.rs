use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use meanest_core::{ExperimentConfig, InputEvent, Key, SessionRecord};
use meanest_experiment::{BlockPlan, Session};
use meanest_render::{FontVec, SharedFrame, SkiaSurface};
use meanest_store::SessionArchive;
use meanest_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

use crate::input::{InputForwarder, input_channel, map_key, map_wheel};

/// How long the completion message stays up before the window closes.
pub const CLOSE_DELAY: Duration = Duration::from_secs(2);

/// Everything the session thread needs, fixed before the window opens.
pub struct SessionSetup {
    pub config: ExperimentConfig,
    pub plan: BlockPlan,
    pub rng: StdRng,
    pub archive: SessionArchive,
    pub font: Option<FontVec>,
}

type Outcome = meanest_core::Result<SessionRecord>;

enum Progress {
    Running,
    Finished { close_at: Instant },
    Failed,
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    buffer_size: PhysicalSize<u32>,
    frame: Option<SharedFrame>,
    setup: Option<SessionSetup>,
    forwarder: Option<InputForwarder>,
    outcome: Option<Receiver<Outcome>>,
    worker: Option<JoinHandle<()>>,
    progress: Progress,
    frame_timer: HighPrecisionTimer,
    refresh_rate: Option<f64>,
    exit_error: Option<anyhow::Error>,
}

impl App {
    pub fn new(setup: SessionSetup) -> Self {
        Self {
            window: None,
            pixels: None,
            buffer_size: PhysicalSize::new(0, 0),
            frame: None,
            setup: Some(setup),
            forwarder: None,
            outcome: None,
            worker: None,
            progress: Progress::Running,
            frame_timer: HighPrecisionTimer::new(),
            refresh_rate: None,
            exit_error: None,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting event loop"
        );
        event_loop.run_app(&mut self)?;
        self.report_frame_timing();
        match self.exit_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window_and_session(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let setup = self.setup.take().context("session already started")?;
        let settings = setup.config.mode.window();

        let mut attributes = Window::default_attributes()
            .with_title("Category mean estimation")
            .with_resizable(false);
        if settings.fullscreen {
            let monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .context("No monitor available")?;
            self.refresh_rate = monitor
                .refresh_rate_millihertz()
                .map(|rate| rate as f64 / 1000.0);
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        }
        if let Some((w, h)) = settings.size {
            attributes = attributes.with_inner_size(LogicalSize::new(w, h));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            refresh_hz = self.refresh_rate,
            mode = %setup.config.mode,
            "display ready"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.buffer_size = size;

        let surface = SkiaSurface::new(size.width, size.height, setup.font)?;
        self.frame = Some(surface.shared_frame());

        let (forwarder, input) = input_channel();
        let (tx, rx) = channel();
        let session = Session::new(
            setup.config,
            setup.plan,
            surface,
            input,
            HighPrecisionTimer::new(),
            setup.rng,
            setup.archive,
        )?;
        let worker = std::thread::Builder::new()
            .name("session".into())
            .spawn(move || {
                let mut session = session;
                let outcome = session.run();
                if tx.send(outcome).is_err() {
                    warn!("window closed before the session ended");
                }
            })
            .context("spawning session thread")?;

        if settings.fullscreen {
            window.set_cursor_visible(false);
        }
        window.request_redraw();

        self.forwarder = Some(forwarder);
        self.outcome = Some(rx);
        self.worker = Some(worker);
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(frame)) = (self.pixels.as_mut(), self.frame.as_ref()) else {
            return Ok(());
        };
        let t = self.frame_timer.now();
        frame.copy_to(
            pixels.frame_mut(),
            self.buffer_size.width,
            self.buffer_size.height,
        );
        pixels.render()?;
        let elapsed = self.frame_timer.elapsed(t);
        self.frame_timer.record_frame(elapsed);
        Ok(())
    }

    fn forward(&self, event: InputEvent) {
        if let Some(forwarder) = &self.forwarder {
            forwarder.forward(event);
        }
    }

    fn poll_session(&mut self) {
        let Some(rx) = &self.outcome else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                error!("session thread ended without a result");
                self.outcome = None;
                self.progress = Progress::Failed;
                return;
            }
        };
        self.outcome = None;
        self.forwarder = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("session thread panicked");
            }
        }
        match outcome {
            Ok(record) => {
                info!(
                    participant = %record.config().participant_id,
                    session = record.config().session_number,
                    blocks = record.blocks.len(),
                    "session complete"
                );
                self.progress = Progress::Finished {
                    close_at: Instant::now() + CLOSE_DELAY,
                };
            }
            Err(e) => {
                error!(error = %e, "session failed; press Escape or close the window");
                self.progress = Progress::Failed;
            }
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                warn!(error = %e, "failed to resize surface");
            }
        }
        info!(
            width = new_size.width,
            height = new_size.height,
            "display resized"
        );
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if matches!(self.progress, Progress::Running) {
            warn!("closing before the session finished; no results saved");
        }
        // dropping the forwarder closes the session's input
        self.forwarder = None;
        event_loop.exit();
    }

    fn report_frame_timing(&self) {
        let stats = self.frame_timer.calibration_stats();
        info!(
            frames = self.frame_timer.frame_count(),
            mean_ms = stats.average_frame_time_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            min_ms = stats.min_frame_time_ns / 1e6,
            max_ms = stats.max_frame_time_ns / 1e6,
            fps = stats.effective_fps,
            "frame timing"
        );
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() && self.setup.is_some() {
            if let Err(e) = self.create_window_and_session(event_loop) {
                error!(error = %e, "failed to start");
                self.exit_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    error!(error = %e, "render failed");
                    self.exit_error = Some(e);
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                let key = map_key(&event.logical_key);
                if matches!(self.progress, Progress::Failed) && key == Key::Escape {
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                self.forward(InputEvent::Key(key));
            }
            WindowEvent::MouseWheel { delta, .. } => self.forward(map_wheel(delta)),
            WindowEvent::CursorMoved { position, .. } => {
                self.forward(InputEvent::PointerMove { x: position.x });
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.forward(InputEvent::Click),
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.poll_session();
        if let Progress::Finished { close_at } = self.progress {
            if Instant::now() >= close_at {
                info!("closing after completion");
                self.cleanup_and_exit(event_loop);
            }
        }
    }
}
