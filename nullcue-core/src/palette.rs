use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::condition::CueColour;
use crate::error::EngineError;
use crate::frame::Rgb;

/// The three stimulus colours available to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColourName {
    Blue,
    Green,
    Orange,
}

impl ColourName {
    pub const ALL: [ColourName; 3] = [ColourName::Blue, ColourName::Green, ColourName::Orange];

    pub fn rgb(self) -> Rgb {
        match self {
            ColourName::Blue => Rgb(19, 146, 206),
            ColourName::Green => Rgb(101, 148, 14),
            ColourName::Orange => Rgb(238, 104, 60),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColourName::Blue => "blue",
            ColourName::Green => "green",
            ColourName::Orange => "orange",
        }
    }
}

impl fmt::Display for ColourName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColourName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blue" => Ok(ColourName::Blue),
            "green" => Ok(ColourName::Green),
            // older lab sheets call the orange patch "red"
            "orange" | "red" => Ok(ColourName::Orange),
            other => Err(EngineError::InvalidCondition(format!("unknown colour {other:?}"))),
        }
    }
}

/// Session palette: slot `i` holds the colour of cue rank `i + 1`.
///
/// Slot 3 is always the participant's assigned colour, which doubles as the neutral cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    slots: [ColourName; 3],
}

impl Palette {
    /// Builds a palette from explicit ranks 1 and 2; `assigned` becomes rank 3.
    pub fn new(first: ColourName, second: ColourName, assigned: ColourName) -> Result<Self, EngineError> {
        if first == second || first == assigned || second == assigned {
            return Err(EngineError::InvalidCondition(format!(
                "palette colours must be distinct, got {first}, {second}, {assigned}"
            )));
        }
        Ok(Self {
            slots: [first, second, assigned],
        })
    }

    pub fn colour(&self, cue: CueColour) -> ColourName {
        self.slots[usize::from(cue.rank()) - 1]
    }

    pub fn rgb(&self, cue: CueColour) -> Rgb {
        self.colour(cue).rgb()
    }

    pub fn assigned(&self) -> ColourName {
        self.slots[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigned_colour_is_neutral_slot() {
        let p = Palette::new(ColourName::Green, ColourName::Orange, ColourName::Blue).unwrap();
        assert_eq!(p.colour(CueColour::Neutral), ColourName::Blue);
        assert_eq!(p.colour(CueColour::First), ColourName::Green);
        assert_eq!(p.colour(CueColour::Second), ColourName::Orange);
        assert_eq!(p.assigned(), ColourName::Blue);
    }

    #[test]
    fn duplicate_colours_are_rejected() {
        assert!(Palette::new(ColourName::Blue, ColourName::Blue, ColourName::Green).is_err());
    }

    #[test]
    fn red_is_an_alias_for_orange() {
        assert_eq!("Red".parse::<ColourName>().unwrap(), ColourName::Orange);
        assert!("purple".parse::<ColourName>().is_err());
    }
}
