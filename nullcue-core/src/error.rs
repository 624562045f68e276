use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the experiment engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Block or trial counts violate the counterbalancing constraints.
    #[error("invalid design: {0}")]
    InvalidDesign(String),

    /// Impossible cue colour / congruency pairing or an out-of-range marker.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The participant pressed the quit key at a suspension point.
    #[error("cancelled by participant")]
    Cancelled,

    /// A collaborator (display, input, recorder) stopped working.
    #[error("device error: {0}")]
    Device(String),
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// A frame whose successor took longer to prepare than the frame was meant to be shown.
///
/// Never fatal: the sequencer logs it, counts it, and flips as soon as it can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingFault {
    pub state: &'static str,
    pub budget: Duration,
    pub spent: Duration,
}

impl TimingFault {
    pub fn overrun(&self) -> Duration {
        self.spent.saturating_sub(self.budget)
    }
}

impl fmt::Display for TimingFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} overran its {:.3} ms budget by {:.3} ms",
            self.state,
            self.budget.as_secs_f64() * 1e3,
            self.overrun().as_secs_f64() * 1e3,
        )
    }
}
