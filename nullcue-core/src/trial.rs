use serde::{Deserialize, Serialize};

use crate::condition::{BlockType, Congruency, CueColour, TargetSide};
use crate::key::{Key, RotationKey};
use crate::marker::Trigger;
use crate::palette::ColourName;

/// What the participant sees in one trial, derived from a `TrialSpec` and the palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusCharacteristics {
    pub left_orientation: i32,
    pub right_orientation: i32,
    /// Colours of the left and right bar.
    pub stimuli_colours: [ColourName; 2],
    pub capture_colour: ColourName,
    #[serde(rename = "capture_colour_id")]
    pub cue_colour: CueColour,
    #[serde(rename = "trial_condition")]
    pub congruency: Congruency,
    #[serde(rename = "target_bar")]
    pub target_side: TargetSide,
    pub target_colour: ColourName,
    pub distractor_colour: ColourName,
    pub target_orientation: i32,
}

/// Evaluation of presses made before the probe cue appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrematureOutcome {
    pub premature_pressed: bool,
    pub premature_keys: Vec<Key>,
    /// Press times relative to probe onset (negative: before it).
    pub premature_timing_ms: Vec<f64>,
    pub cue_hit: bool,
    pub cue_false_alarm: bool,
}

impl PrematureOutcome {
    /// Whether the early response matched the requirement of the trial.
    pub fn responded_correctly(&self, response_required: bool) -> bool {
        if response_required {
            self.cue_hit
        } else {
            !self.cue_false_alarm
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseScore {
    pub report_orientation: i32,
    pub signed_difference: i32,
    pub absolute_difference: i32,
    pub performance: i32,
    pub correct_key: bool,
}

/// Everything the response dial measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialResponse {
    pub idle_reaction_time_ms: f64,
    pub response_time_ms: f64,
    pub key_pressed: RotationKey,
    pub turns_made: u32,
    #[serde(flatten)]
    pub premature: PrematureOutcome,
    #[serde(flatten)]
    pub score: ResponseScore,
}

/// Outcome of one completed trial. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub condition_code: Trigger,
    #[serde(flatten)]
    pub response: DialResponse,
    pub timing_faults: usize,
}

impl TrialResult {
    pub fn performance(&self) -> i32 {
        self.response.score.performance
    }

    pub fn cue_hit(&self) -> bool {
        self.response.premature.cue_hit
    }

    pub fn cue_false_alarm(&self) -> bool {
        self.response.premature.cue_false_alarm
    }
}

/// Row handed to persistence for every experiment trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_number: usize,
    pub block: usize,
    pub block_type: BlockType,
    /// Seconds since the start of the experiment phase.
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub response_required: bool,
    #[serde(flatten)]
    pub stimulus: StimulusCharacteristics,
    #[serde(flatten)]
    pub result: TrialResult,
}
