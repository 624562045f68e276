//! Event-marker encoding.
//!
//! A marker is the frame digit followed by a condition marker in 1..=20:
//! `{1, 5, 9}` by cue rank, +2 when incongruent, +1 for a right target and
//! +10 in respond-off-cue blocks.

use nullcue_core::condition::check_pairing;
use nullcue_core::{
    BlockType, Congruency, CueColour, EventRecorder, FrameName, Result, TargetSide, Trigger, TrialSpec,
};
use tracing::debug;

pub fn encode(
    frame: FrameName,
    block_type: BlockType,
    cue_colour: CueColour,
    congruency: Congruency,
    target_side: TargetSide,
) -> Result<Trigger> {
    check_pairing(cue_colour, congruency)?;

    let mut marker = match cue_colour.rank() {
        1 => 1,
        2 => 5,
        _ => 9,
    };
    marker += match congruency {
        Congruency::Incongruent => 2,
        Congruency::Congruent | Congruency::Neutral => 0,
    };
    if target_side == TargetSide::Right {
        marker += 1;
    }
    if block_type == BlockType::RespondOffCue {
        marker += 10;
    }

    Trigger::new(frame, marker)
}

/// The trial parameters a marker depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionKey {
    pub block_type: BlockType,
    pub cue_colour: CueColour,
    pub congruency: Congruency,
    pub target_side: TargetSide,
}

impl ConditionKey {
    pub fn new(block_type: BlockType, spec: &TrialSpec) -> Self {
        Self {
            block_type,
            cue_colour: spec.cue_colour(),
            congruency: spec.congruency(),
            target_side: spec.target_side(),
        }
    }

    pub fn trigger(&self, frame: FrameName) -> Result<Trigger> {
        encode(
            frame,
            self.block_type,
            self.cue_colour,
            self.congruency,
            self.target_side,
        )
    }

    /// Identifies the trial condition in persisted data.
    pub fn condition_code(&self) -> Result<Trigger> {
        self.trigger(FrameName::StimuliOnset)
    }

    pub fn emit<E: EventRecorder + ?Sized>(&self, recorder: &mut E, frame: FrameName) -> Result<Trigger> {
        let trigger = self.trigger(frame)?;
        recorder.send_marker(&trigger.to_string())?;
        debug!(%frame, marker = %trigger, "trigger sent");
        Ok(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nullcue_core::EngineError;

    #[test]
    fn neutral_colour_with_congruent_is_invalid() {
        let result = encode(
            "stimuli_onset".parse().unwrap(),
            BlockType::RespondOnCue,
            CueColour::Neutral,
            Congruency::Congruent,
            TargetSide::Left,
        );
        assert!(matches!(result, Err(EngineError::InvalidCondition(_))));
    }

    #[test]
    fn markers_follow_the_table() {
        let t = encode(
            FrameName::StimuliOnset,
            BlockType::RespondOnCue,
            CueColour::First,
            Congruency::Congruent,
            TargetSide::Left,
        )
        .unwrap();
        assert_eq!(t.to_string(), "11");

        let t = encode(
            FrameName::CaptureCueOnset,
            BlockType::RespondOnCue,
            CueColour::Second,
            Congruency::Incongruent,
            TargetSide::Right,
        )
        .unwrap();
        assert_eq!(t.to_string(), "28");

        let t = encode(
            FrameName::FeedbackOnset,
            BlockType::RespondOffCue,
            CueColour::Neutral,
            Congruency::Neutral,
            TargetSide::Right,
        )
        .unwrap();
        assert_eq!(t.to_string(), "720");
    }

    #[test]
    fn every_valid_condition_gets_a_distinct_marker() {
        let mut seen = std::collections::HashSet::new();
        for block_type in BlockType::ALL {
            for cue in CueColour::ALL {
                let congruencies: &[Congruency] = if cue.is_neutral() {
                    &[Congruency::Neutral]
                } else {
                    &[Congruency::Congruent, Congruency::Incongruent]
                };
                for &congruency in congruencies {
                    for side in [TargetSide::Left, TargetSide::Right] {
                        let t = encode(FrameName::ProbeCueOnset, block_type, cue, congruency, side).unwrap();
                        assert!(Trigger::MARKER_RANGE.contains(&t.condition_marker()));
                        assert!(seen.insert(t.condition_marker()));
                    }
                }
            }
        }
        assert_eq!(seen.len(), 20);
    }
}
