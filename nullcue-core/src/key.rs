use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Logical keys the engine listens for. Adapters map physical keys onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Turns the dial clockwise (`m` on the lab keyboard).
    Clockwise,
    /// Turns the dial counter-clockwise (`z`).
    CounterClockwise,
    /// Reserved abort key (`q`).
    Quit,
    /// Advances instruction screens (space).
    Continue,
    /// Asks the experimenter's recorder to re-calibrate (`c`).
    Recalibrate,
}

/// A key press stamped on the session clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub at: Duration,
}

impl KeyEvent {
    pub fn new(key: Key, at: Duration) -> Self {
        Self { key, at }
    }
}

/// The two keys that drive the response dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationKey {
    Clockwise,
    CounterClockwise,
}

impl RotationKey {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Clockwise => Some(RotationKey::Clockwise),
            Key::CounterClockwise => Some(RotationKey::CounterClockwise),
            _ => None,
        }
    }

    pub fn key(self) -> Key {
        match self {
            RotationKey::Clockwise => Key::Clockwise,
            RotationKey::CounterClockwise => Key::CounterClockwise,
        }
    }

    /// +1 for clockwise, -1 for counter-clockwise.
    pub fn sign(self) -> f64 {
        match self {
            RotationKey::Clockwise => 1.0,
            RotationKey::CounterClockwise => -1.0,
        }
    }
}
