use nullcue_core::{
    ColourName, Congruency, CueColour, Palette, Result, StimulusCharacteristics, TargetSide, TrialSpec,
};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

/// Bar orientations are drawn from ±[5, 85] degrees.
pub const ORIENTATION_RANGE: std::ops::RangeInclusive<i32> = 5..=85;

/// The participant's colour becomes the neutral cue; the other two get ranks 1 and 2 at random.
pub fn assign_palette<R: Rng + ?Sized>(assigned: ColourName, rng: &mut R) -> Result<Palette> {
    let mut others: Vec<ColourName> = ColourName::ALL
        .into_iter()
        .filter(|c| *c != assigned)
        .collect();
    others.shuffle(rng);
    Palette::new(others[0], others[1], assigned)
}

pub fn random_orientation<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    let sign = if rng.random_bool(0.5) { 1 } else { -1 };
    sign * rng.random_range(ORIENTATION_RANGE)
}

pub fn generate_characteristics<R: Rng + ?Sized>(
    spec: &TrialSpec,
    palette: &Palette,
    rng: &mut R,
) -> StimulusCharacteristics {
    let cue = spec.cue_colour();
    let (target_colour, distractor_colour) = match spec.congruency() {
        Congruency::Congruent => (palette.colour(cue), palette.colour(cue.counterpart())),
        Congruency::Incongruent => (palette.colour(cue.counterpart()), palette.colour(cue)),
        Congruency::Neutral => {
            if rng.random_bool(0.5) {
                (palette.colour(CueColour::First), palette.colour(CueColour::Second))
            } else {
                (palette.colour(CueColour::Second), palette.colour(CueColour::First))
            }
        }
    };

    let left_orientation = random_orientation(rng);
    let right_orientation = random_orientation(rng);

    let (target_orientation, stimuli_colours) = match spec.target_side() {
        TargetSide::Left => (left_orientation, [target_colour, distractor_colour]),
        TargetSide::Right => (right_orientation, [distractor_colour, target_colour]),
    };

    StimulusCharacteristics {
        left_orientation,
        right_orientation,
        stimuli_colours,
        capture_colour: palette.colour(cue),
        cue_colour: cue,
        congruency: spec.congruency(),
        target_side: spec.target_side(),
        target_colour,
        distractor_colour,
        target_orientation,
    }
}

/// Unbalanced draw used by the practice loops.
pub fn random_trial_spec<R: Rng + ?Sized>(rng: &mut R) -> Result<TrialSpec> {
    let cue = *CueColour::ALL
        .choose(rng)
        .unwrap_or(&CueColour::Neutral);
    let congruency = if cue.is_neutral() {
        Congruency::Neutral
    } else if rng.random_bool(0.5) {
        Congruency::Congruent
    } else {
        Congruency::Incongruent
    };
    let side = if rng.random_bool(0.5) {
        TargetSide::Left
    } else {
        TargetSide::Right
    };
    TrialSpec::new(cue, congruency, side)
}
