use std::time::Duration;

use nullcue_core::{Display, EventRecorder, Frame, InputDevice, Key, KeyEvent, Result};
use nullcue_timing::Clock;

/// The hardware a session drives: screen, keyboard, marker channel and clock.
pub struct Rig<D, I, E, C> {
    pub display: D,
    pub input: I,
    pub recorder: E,
    pub clock: C,
}

impl<D, I, E, C> Rig<D, I, E, C>
where
    D: Display,
    I: InputDevice,
    E: EventRecorder,
    C: Clock,
{
    pub fn new(display: D, input: I, recorder: E, clock: C) -> Self {
        Self {
            display,
            input,
            recorder,
            clock,
        }
    }

    /// Draws `frame` and flips immediately. Returns the onset.
    pub fn show(&mut self, frame: &Frame) -> Result<Duration> {
        self.display.draw(frame)?;
        self.display.flip()
    }

    /// Shows `frame` and blocks until one of `keys` is pressed.
    pub fn show_and_wait(&mut self, frame: &Frame, keys: &[Key]) -> Result<KeyEvent> {
        self.show(frame)?;
        self.input.clear_events();
        self.input.wait_for_keys(keys)
    }
}
