pub mod condition;
pub mod device;
pub mod error;
pub mod frame;
pub mod key;
pub mod marker;
pub mod palette;
pub mod phase;
pub mod trial;

pub use condition::{check_pairing, BlockSpec, BlockType, Congruency, CueColour, TargetSide, TrialSpec};
pub use device::{Display, EventRecorder, InputDevice};
pub use error::{EngineError, Result, TimingFault};
pub use frame::{Frame, Rgb, Shape};
pub use key::{Key, KeyEvent, RotationKey};
pub use marker::{FrameName, Trigger};
pub use palette::{ColourName, Palette};
pub use phase::SessionPhase;
pub use trial::{
    DialResponse, PrematureOutcome, ResponseScore, StimulusCharacteristics, TrialRecord,
    TrialResult,
};
