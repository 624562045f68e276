use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Moments in a trial that the recording device is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameName {
    StimuliOnset,
    CaptureCueOnset,
    CueResponseOnset,
    ProbeCueOnset,
    ResponseOnset,
    ResponseOffset,
    FeedbackOnset,
}

impl FrameName {
    pub const ALL: [FrameName; 7] = [
        FrameName::StimuliOnset,
        FrameName::CaptureCueOnset,
        FrameName::CueResponseOnset,
        FrameName::ProbeCueOnset,
        FrameName::ResponseOnset,
        FrameName::ResponseOffset,
        FrameName::FeedbackOnset,
    ];

    /// Leading digit of the marker, "1" through "7" in declaration order.
    pub fn digit(self) -> u8 {
        match self {
            FrameName::StimuliOnset => 1,
            FrameName::CaptureCueOnset => 2,
            FrameName::CueResponseOnset => 3,
            FrameName::ProbeCueOnset => 4,
            FrameName::ResponseOnset => 5,
            FrameName::ResponseOffset => 6,
            FrameName::FeedbackOnset => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameName::StimuliOnset => "stimuli_onset",
            FrameName::CaptureCueOnset => "capture_cue_onset",
            FrameName::CueResponseOnset => "cue_response_onset",
            FrameName::ProbeCueOnset => "probe_cue_onset",
            FrameName::ResponseOnset => "response_onset",
            FrameName::ResponseOffset => "response_offset",
            FrameName::FeedbackOnset => "feedback_onset",
        }
    }
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FrameName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| EngineError::InvalidCondition(format!("unknown frame name {s:?}")))
    }
}

/// Marker sent to the recording device: frame digit followed by the condition marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Trigger {
    frame: FrameName,
    condition_marker: u8,
}

impl Trigger {
    pub const MARKER_RANGE: std::ops::RangeInclusive<u8> = 1..=20;

    pub fn new(frame: FrameName, condition_marker: u8) -> Result<Self, EngineError> {
        if !Self::MARKER_RANGE.contains(&condition_marker) {
            return Err(EngineError::InvalidCondition(format!(
                "condition marker {condition_marker} outside 1..=20"
            )));
        }
        Ok(Self {
            frame,
            condition_marker,
        })
    }

    pub fn frame(&self) -> FrameName {
        self.frame
    }

    pub fn condition_marker(&self) -> u8 {
        self.condition_marker
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.frame.digit(), self.condition_marker)
    }
}

impl From<Trigger> for String {
    fn from(value: Trigger) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Trigger {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let invalid = || EngineError::InvalidCondition(format!("malformed trigger {value:?}"));
        let mut chars = value.chars();
        let digit = chars.next().and_then(|c| c.to_digit(10)).ok_or_else(invalid)?;
        let frame = FrameName::ALL
            .into_iter()
            .find(|f| u32::from(f.digit()) == digit)
            .ok_or_else(invalid)?;
        let rest = chars.as_str();
        if rest.starts_with('0') {
            return Err(invalid());
        }
        let marker = rest.parse::<u8>().map_err(|_| invalid())?;
        Trigger::new(frame, marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_has_no_padding() {
        let t = Trigger::new(FrameName::ProbeCueOnset, 3).unwrap();
        assert_eq!(t.to_string(), "43");
        let t = Trigger::new(FrameName::FeedbackOnset, 20).unwrap();
        assert_eq!(t.to_string(), "720");
    }

    #[test]
    fn marker_outside_range_is_rejected() {
        assert!(Trigger::new(FrameName::StimuliOnset, 0).is_err());
        assert!(Trigger::new(FrameName::StimuliOnset, 21).is_err());
    }

    #[test]
    fn frame_names_parse_from_snake_case() {
        assert_eq!("response_offset".parse::<FrameName>().unwrap(), FrameName::ResponseOffset);
        assert!("stimulus_onset".parse::<FrameName>().is_err());
    }

    #[test]
    fn trigger_serializes_as_wire_string() {
        let t = Trigger::new(FrameName::StimuliOnset, 14).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"114\"");
        let back: Trigger = serde_json::from_str("\"114\"").unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<Trigger>("\"105\"").is_err());
    }
}
