pub mod clock;
pub mod intervals;

pub use clock::{Clock, HighPrecisionClock, SimulatedClock};
pub use intervals::{FrameIntervals, RefreshStats};
