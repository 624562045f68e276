use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use nullcue_core::{Frame, Key, KeyEvent};
use nullcue_render::{FontVec, FrameStats, SkiaRenderer};
use nullcue_timing::{Clock, HighPrecisionClock};
use pixels::{Pixels, SurfaceTexture};
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::devices::InputMessage;
use crate::engine::Engine;

/// Requests from the engine thread to the event loop.
#[derive(Debug)]
pub enum UiCommand {
    /// Rasterise into the back buffer.
    Draw(Frame),
    /// Present the back buffer and report the onset.
    Flip(Sender<Duration>),
    /// The engine is done.
    Exit,
}

fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::KeyM => Some(Key::Clockwise),
        KeyCode::KeyZ => Some(Key::CounterClockwise),
        KeyCode::KeyQ | KeyCode::Escape => Some(Key::Quit),
        KeyCode::Space => Some(Key::Continue),
        KeyCode::KeyC => Some(Key::Recalibrate),
        _ => None,
    }
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    back_buffer: Vec<u8>,
    /// Last drawn frame, kept to redraw after a resize.
    current: Option<Frame>,
    font: Option<FontVec>,
    engine: Option<Engine>,
    worker: Option<JoinHandle<()>>,
    input: Option<Sender<InputMessage>>,
    clock: HighPrecisionClock,
    refresh_rate: Option<f64>,
}

impl App {
    pub fn new(engine: Engine, font: Option<FontVec>) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            back_buffer: Vec::new(),
            current: None,
            font,
            clock: engine.clock().clone(),
            engine: Some(engine),
            worker: None,
            input: None,
            refresh_rate: None,
        }
    }

    pub fn run(mut self, event_loop: EventLoop<UiCommand>) -> Result<()> {
        info!(
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "opening experiment window"
        );
        let result = event_loop.run_app(&mut self);

        // queued flips died with the loop, so the worker is unblocked
        self.input = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("engine thread panicked");
            }
        }
        result.map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("nullcue")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.renderer = Some(SkiaRenderer::new(size.width, size.height, self.font.take())?);
        self.back_buffer = vec![0; (size.width * size.height * 4) as usize];

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn start_engine(&mut self) -> Result<()> {
        let Some(engine) = self.engine.take() else {
            return Ok(());
        };
        let (tx, rx) = mpsc::channel();
        self.input = Some(tx);
        self.worker = Some(engine.spawn(rx)?);
        Ok(())
    }

    fn draw(&mut self, frame: Frame) -> Result<()> {
        let renderer = self
            .renderer
            .as_mut()
            .ok_or_else(|| anyhow!("draw before the window exists"))?;
        let stats: FrameStats = renderer.render_frame(&frame, &mut self.back_buffer)?;
        debug!(
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            shapes_ms = stats.shapes.as_secs_f64() * 1e3,
            text_ms = stats.text.as_secs_f64() * 1e3,
            total_ms = stats.total.as_secs_f64() * 1e3,
            shapes = stats.shape_count,
            "frame prepared"
        );
        if stats.texts_skipped > 0 {
            warn!(skipped = stats.texts_skipped, "no font loaded, text not drawn");
        }
        self.current = Some(frame);
        Ok(())
    }

    fn flip(&mut self) -> Result<Duration> {
        let pixels = self
            .pixels
            .as_mut()
            .ok_or_else(|| anyhow!("flip before the window exists"))?;
        pixels.frame_mut().copy_from_slice(&self.back_buffer);
        pixels.render()?;
        Ok(self.clock.now())
    }

    fn send_input(&self, message: InputMessage) {
        if let Some(input) = &self.input {
            // the engine may already be gone
            let _ = input.send(message);
        }
    }

    fn handle_key(&mut self, code: PhysicalKey, state: ElementState, repeat: bool) {
        let PhysicalKey::Code(code) = code else {
            return;
        };
        let Some(key) = map_key(code) else {
            return;
        };
        match state {
            ElementState::Pressed if !repeat => {
                self.send_input(InputMessage::Pressed(KeyEvent::new(key, self.clock.now())))
            }
            ElementState::Pressed => {}
            ElementState::Released => self.send_input(InputMessage::Released(key)),
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        if let Some(pixels) = &mut self.pixels {
            pixels.resize_surface(new_size.width, new_size.height)?;
            pixels.resize_buffer(new_size.width, new_size.height)?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height)?;
        }
        self.back_buffer = vec![0; (new_size.width * new_size.height * 4) as usize];
        if let Some(frame) = self.current.take() {
            self.draw(frame)?;
        }
        info!(width = new_size.width, height = new_size.height, "display resized");
        Ok(())
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if self.worker.as_ref().is_some_and(|w| !w.is_finished()) {
            // let the engine cancel, save and say goodbye
            self.send_input(InputMessage::Pressed(KeyEvent::new(Key::Quit, self.clock.now())));
            self.send_input(InputMessage::Closed);
        } else {
            self.cleanup_and_exit(event_loop);
        }
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        info!("closing experiment window");
        event_loop.exit();
    }
}

impl ApplicationHandler<UiCommand> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self
            .create_window_and_surface(event_loop)
            .and_then(|()| self.start_engine())
        {
            error!("failed to start: {e:#}");
            event_loop.exit();
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, command: UiCommand) {
        match command {
            UiCommand::Draw(frame) => {
                if let Err(e) = self.draw(frame) {
                    error!("render failed: {e:#}");
                    self.cleanup_and_exit(event_loop);
                }
            }
            UiCommand::Flip(ack) => match self.flip() {
                Ok(onset) => {
                    let _ = ack.send(onset);
                }
                Err(e) => {
                    error!("present failed: {e:#}");
                    self.cleanup_and_exit(event_loop);
                }
            },
            UiCommand::Exit => self.cleanup_and_exit(event_loop),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close(event_loop),
            WindowEvent::RedrawRequested => {
                if let Some(pixels) = &self.pixels {
                    if let Err(e) = pixels.render() {
                        warn!("redraw failed: {e}");
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event.physical_key, event.state, event.repeat);
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = self.handle_resize(size) {
                    error!("resize failed: {e:#}");
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    if let Err(e) = self.handle_resize(size) {
                        error!("resize failed: {e:#}");
                    }
                }
            }
            _ => {}
        }
    }
}
