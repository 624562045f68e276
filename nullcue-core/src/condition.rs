use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Which cue colour demands an early response within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Respond when the capture cue shows the neutral (participant) colour.
    RespondOnCue,
    /// Respond when the capture cue shows any other colour.
    RespondOffCue,
}

impl BlockType {
    pub const ALL: [BlockType; 2] = [BlockType::RespondOnCue, BlockType::RespondOffCue];

    pub fn requires_response(self, cue: CueColour) -> bool {
        match self {
            BlockType::RespondOnCue => cue.is_neutral(),
            BlockType::RespondOffCue => !cue.is_neutral(),
        }
    }

    /// Peripheral reminder drawn next to the fixation dot.
    pub fn signal(self) -> &'static str {
        match self {
            BlockType::RespondOnCue => "+",
            BlockType::RespondOffCue => "-",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockType::RespondOnCue => "respond on cue",
            BlockType::RespondOffCue => "respond off cue",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub block_number: usize,
    pub block_type: BlockType,
}

/// Palette slot shown by the capture cue. Slot 3 is always the neutral cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CueColour {
    First,
    Second,
    Neutral,
}

impl CueColour {
    pub const ALL: [CueColour; 3] = [CueColour::First, CueColour::Second, CueColour::Neutral];

    /// 1-based rank of the colour in the session palette.
    pub fn rank(self) -> u8 {
        match self {
            CueColour::First => 1,
            CueColour::Second => 2,
            CueColour::Neutral => 3,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(CueColour::First),
            2 => Some(CueColour::Second),
            3 => Some(CueColour::Neutral),
            _ => None,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == CueColour::Neutral
    }

    /// The other non-neutral colour; the neutral colour maps to `First`.
    pub fn counterpart(self) -> Self {
        match self {
            CueColour::First => CueColour::Second,
            CueColour::Second | CueColour::Neutral => CueColour::First,
        }
    }
}

impl From<CueColour> for u8 {
    fn from(value: CueColour) -> Self {
        value.rank()
    }
}

impl TryFrom<u8> for CueColour {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self> {
        CueColour::from_rank(value)
            .ok_or_else(|| EngineError::InvalidCondition(format!("cue colour {value} is not 1, 2 or 3")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Congruency {
    Congruent,
    Incongruent,
    Neutral,
}

impl fmt::Display for Congruency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Congruency::Congruent => "congruent",
            Congruency::Incongruent => "incongruent",
            Congruency::Neutral => "neutral",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSide {
    Left,
    Right,
}

impl fmt::Display for TargetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetSide::Left => "left",
            TargetSide::Right => "right",
        })
    }
}

/// Checks `cue_colour == Neutral <=> congruency == Neutral`.
pub fn check_pairing(cue_colour: CueColour, congruency: Congruency) -> Result<()> {
    if cue_colour.is_neutral() != (congruency == Congruency::Neutral) {
        return Err(EngineError::InvalidCondition(format!(
            "cue colour {} cannot be {}",
            cue_colour.rank(),
            congruency
        )));
    }
    Ok(())
}

/// Parameters of a single trial, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTrialSpec")]
pub struct TrialSpec {
    cue_colour: CueColour,
    congruency: Congruency,
    target_side: TargetSide,
}

#[derive(Deserialize)]
struct RawTrialSpec {
    cue_colour: CueColour,
    congruency: Congruency,
    target_side: TargetSide,
}

impl TryFrom<RawTrialSpec> for TrialSpec {
    type Error = EngineError;

    fn try_from(raw: RawTrialSpec) -> Result<Self> {
        TrialSpec::new(raw.cue_colour, raw.congruency, raw.target_side)
    }
}

impl TrialSpec {
    pub fn new(cue_colour: CueColour, congruency: Congruency, target_side: TargetSide) -> Result<Self> {
        check_pairing(cue_colour, congruency)?;
        Ok(Self {
            cue_colour,
            congruency,
            target_side,
        })
    }

    pub fn cue_colour(&self) -> CueColour {
        self.cue_colour
    }

    pub fn congruency(&self) -> Congruency {
        self.congruency
    }

    pub fn target_side(&self) -> TargetSide {
        self.target_side
    }
}
