//! Collaborators the engine drives but does not implement.

use std::time::Duration;

use crate::error::Result;
use crate::frame::Frame;
use crate::key::{Key, KeyEvent};

/// Double-buffered screen.
pub trait Display {
    /// Prepares `frame` in the back buffer without showing it.
    fn draw(&mut self, frame: &Frame) -> Result<()>;

    /// Shows the prepared frame, blocking until it is visible.
    /// Returns the onset time on the session clock.
    fn flip(&mut self) -> Result<Duration>;
}

/// Keyboard (or button box) feeding discrete presses and held state.
pub trait InputDevice {
    /// Blocks without timeout until one of `keys` is pressed.
    /// Buffered presses of those keys are consumed first.
    fn wait_for_keys(&mut self, keys: &[Key]) -> Result<KeyEvent>;

    /// Removes and returns every press buffered since the last clear.
    fn take_events(&mut self) -> Vec<KeyEvent>;

    fn clear_events(&mut self);

    /// Whether `key` is currently held down.
    fn is_held(&mut self, key: Key) -> bool;

    /// Non-consuming check for a buffered quit press.
    fn cancel_requested(&mut self) -> bool;
}

/// Event-marker channel of the recording device (eye tracker, EEG amplifier).
pub trait EventRecorder {
    fn send_marker(&mut self, marker: &str) -> Result<()>;

    fn calibrate(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: EventRecorder + ?Sized> EventRecorder for Box<T> {
    fn send_marker(&mut self, marker: &str) -> Result<()> {
        (**self).send_marker(marker)
    }

    fn calibrate(&mut self) -> Result<()> {
        (**self).calibrate()
    }

    fn start_recording(&mut self) -> Result<()> {
        (**self).start_recording()
    }

    fn stop_recording(&mut self) -> Result<()> {
        (**self).stop_recording()
    }
}
