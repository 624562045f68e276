//! Engine-side ends of the window, keyboard and marker channels.

use std::collections::HashSet;
use std::io::Write;
use std::mem;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use nullcue_core::{Display, EngineError, EventRecorder, Frame, InputDevice, Key, KeyEvent, Result};
use nullcue_timing::Clock;
use tracing::{debug, info};
use winit::event_loop::EventLoopProxy;

use crate::app::UiCommand;

fn window_gone() -> EngineError {
    EngineError::Device("window closed".into())
}

/// Forwards frames to the event loop, which rasterises and presents them.
pub struct WindowDisplay {
    proxy: EventLoopProxy<UiCommand>,
}

impl WindowDisplay {
    pub fn new(proxy: EventLoopProxy<UiCommand>) -> Self {
        Self { proxy }
    }
}

impl Display for WindowDisplay {
    fn draw(&mut self, frame: &Frame) -> Result<()> {
        self.proxy
            .send_event(UiCommand::Draw(frame.clone()))
            .map_err(|_| window_gone())
    }

    fn flip(&mut self) -> Result<Duration> {
        let (ack, onset) = mpsc::channel();
        self.proxy
            .send_event(UiCommand::Flip(ack))
            .map_err(|_| window_gone())?;
        onset.recv().map_err(|_| window_gone())
    }
}

/// What the event loop reports about the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMessage {
    Pressed(KeyEvent),
    Released(Key),
    Closed,
}

/// Keyboard state rebuilt from [`InputMessage`]s.
pub struct WindowInput {
    messages: Receiver<InputMessage>,
    held: HashSet<Key>,
    buffer: Vec<KeyEvent>,
    closed: bool,
}

impl WindowInput {
    pub fn new(messages: Receiver<InputMessage>) -> Self {
        Self {
            messages,
            held: HashSet::new(),
            buffer: Vec::new(),
            closed: false,
        }
    }

    fn apply(&mut self, message: InputMessage) {
        match message {
            InputMessage::Pressed(event) => {
                self.held.insert(event.key);
                self.buffer.push(event);
            }
            InputMessage::Released(key) => {
                self.held.remove(&key);
            }
            InputMessage::Closed => {
                self.closed = true;
                self.held.clear();
            }
        }
    }

    /// Drains everything the event loop sent so far.
    fn pump(&mut self) {
        loop {
            match self.messages.try_recv() {
                Ok(message) => self.apply(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }

    fn take_buffered(&mut self, keys: &[Key]) -> Option<KeyEvent> {
        let i = self.buffer.iter().position(|e| keys.contains(&e.key))?;
        Some(self.buffer.remove(i))
    }
}

impl InputDevice for WindowInput {
    fn wait_for_keys(&mut self, keys: &[Key]) -> Result<KeyEvent> {
        self.pump();
        loop {
            if let Some(event) = self.take_buffered(keys) {
                return Ok(event);
            }
            if self.closed {
                return Err(window_gone());
            }
            match self.messages.recv() {
                Ok(message) => self.apply(message),
                Err(_) => self.closed = true,
            }
        }
    }

    fn take_events(&mut self) -> Vec<KeyEvent> {
        self.pump();
        mem::take(&mut self.buffer)
    }

    fn clear_events(&mut self) {
        self.pump();
        self.buffer.clear();
    }

    fn is_held(&mut self, key: Key) -> bool {
        self.pump();
        self.held.contains(&key)
    }

    fn cancel_requested(&mut self) -> bool {
        self.pump();
        self.closed || self.buffer.iter().any(|e| e.key == Key::Quit)
    }
}

/// Writes EyeLink-style `trig<code>` message lines stamped with the session clock.
pub struct MarkerLog<W, C> {
    out: W,
    clock: C,
}

impl<W: Write, C: Clock> MarkerLog<W, C> {
    pub fn new(out: W, clock: C) -> Self {
        Self { out, clock }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, message: &str) -> Result<()> {
        let at = self.clock.now().as_secs_f64();
        writeln!(self.out, "MSG {at:.6} {message}")
            .map_err(|e| EngineError::Device(format!("marker log: {e}")))
    }
}

impl<W: Write, C: Clock> EventRecorder for MarkerLog<W, C> {
    fn send_marker(&mut self, marker: &str) -> Result<()> {
        debug!(marker, "trigger");
        self.line(&format!("trig{marker}"))
    }

    fn calibrate(&mut self) -> Result<()> {
        info!("recorder calibration");
        self.line("CALIBRATION")
    }

    fn start_recording(&mut self) -> Result<()> {
        self.line("START")
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.line("END")?;
        self.out
            .flush()
            .map_err(|e| EngineError::Device(format!("marker log: {e}")))
    }
}

/// Recorder for dry runs, where no markers are expected.
pub struct NullRecorder;

impl EventRecorder for NullRecorder {
    fn send_marker(&mut self, marker: &str) -> Result<()> {
        debug!(marker, "trigger dropped in a dry run");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nullcue_timing::SimulatedClock;
    use std::sync::mpsc::Sender;

    fn input() -> (Sender<InputMessage>, WindowInput) {
        let (tx, rx) = mpsc::channel();
        (tx, WindowInput::new(rx))
    }

    fn press(key: Key, ms: u64) -> InputMessage {
        InputMessage::Pressed(KeyEvent::new(key, Duration::from_millis(ms)))
    }

    #[test]
    fn buffered_press_answers_a_wait() {
        let (tx, mut input) = input();
        tx.send(press(Key::Continue, 5)).unwrap();
        tx.send(press(Key::Clockwise, 10)).unwrap();

        let event = input.wait_for_keys(&[Key::Clockwise, Key::Quit]).unwrap();
        assert_eq!(event, KeyEvent::new(Key::Clockwise, Duration::from_millis(10)));
        // the unrelated press stays buffered
        assert_eq!(input.take_events(), vec![KeyEvent::new(Key::Continue, Duration::from_millis(5))]);
    }

    #[test]
    fn held_state_follows_press_and_release() {
        let (tx, mut input) = input();
        tx.send(press(Key::CounterClockwise, 1)).unwrap();
        assert!(input.is_held(Key::CounterClockwise));
        assert!(!input.is_held(Key::Clockwise));
        tx.send(InputMessage::Released(Key::CounterClockwise)).unwrap();
        assert!(!input.is_held(Key::CounterClockwise));
    }

    #[test]
    fn wait_blocks_until_a_matching_press() {
        let (tx, mut input) = input();
        let sender = std::thread::spawn(move || {
            tx.send(press(Key::Recalibrate, 1)).unwrap();
            tx.send(press(Key::Continue, 2)).unwrap();
        });
        let event = input.wait_for_keys(&[Key::Continue]).unwrap();
        assert_eq!(event.key, Key::Continue);
        sender.join().unwrap();
    }

    #[test]
    fn quit_press_is_visible_without_being_consumed() {
        let (tx, mut input) = input();
        tx.send(press(Key::Quit, 3)).unwrap();
        assert!(input.cancel_requested());
        assert!(input.cancel_requested());
        input.clear_events();
        assert!(!input.cancel_requested());
    }

    #[test]
    fn closing_cancels_and_ends_waits() {
        let (tx, mut input) = input();
        tx.send(press(Key::Clockwise, 1)).unwrap();
        tx.send(InputMessage::Closed).unwrap();
        assert!(input.cancel_requested());
        assert!(!input.is_held(Key::Clockwise));
        input.clear_events();
        assert!(input.wait_for_keys(&[Key::Continue]).is_err());
    }

    #[test]
    fn dropped_sender_counts_as_closed() {
        let (tx, mut input) = input();
        drop(tx);
        assert!(matches!(input.wait_for_keys(&[Key::Continue]), Err(EngineError::Device(_))));
    }

    #[test]
    fn marker_log_stamps_each_trigger() {
        let clock = SimulatedClock::new();
        let mut log = MarkerLog::new(Vec::new(), clock.clone());
        log.start_recording().unwrap();
        clock.advance(Duration::from_millis(1500));
        log.send_marker("213").unwrap();
        log.stop_recording().unwrap();

        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["MSG 0.000000 START", "MSG 1.500000 trig213", "MSG 1.500000 END"]
        );
    }
}
