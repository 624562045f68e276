//! Counterbalanced block order and per-block trial parameters.

use nullcue_core::{BlockSpec, BlockType, Congruency, CueColour, EngineError, Result, TargetSide, TrialSpec};
use rand::Rng;
use rand::seq::SliceRandom;

/// Equal numbers of both block types in random order, numbered 1..=n in that order.
pub fn generate_blocks<R: Rng + ?Sized>(n_blocks: usize, rng: &mut R) -> Result<Vec<BlockSpec>> {
    if n_blocks == 0 || n_blocks % 2 != 0 {
        return Err(EngineError::InvalidDesign(format!(
            "expected number of blocks to be divisible by 2, got {n_blocks}"
        )));
    }

    let mut types: Vec<BlockType> = BlockType::ALL
        .iter()
        .copied()
        .cycle()
        .take(n_blocks)
        .collect();
    types.shuffle(rng);

    Ok(types
        .into_iter()
        .enumerate()
        .map(|(i, block_type)| BlockSpec {
            block_number: i + 1,
            block_type,
        })
        .collect())
}

/// Trial parameters for one block, shuffled.
///
/// Colours come in thirds and each non-neutral colour is half congruent, half
/// incongruent. Sides are a plain left/right alternation zipped against those
/// lists, so side is balanced over the block but not stratified by condition.
pub fn generate_trials<R: Rng + ?Sized>(n_trials: usize, rng: &mut R) -> Result<Vec<TrialSpec>> {
    if n_trials == 0 || n_trials % 12 != 0 {
        return Err(EngineError::InvalidDesign(format!(
            "expected number of trials to be divisible by 12, got {n_trials}"
        )));
    }
    let third = n_trials / 3;

    let cue_colours = CueColour::ALL
        .iter()
        .flat_map(|c| std::iter::repeat_n(*c, third));

    let congruencies = [
        Congruency::Congruent,
        Congruency::Congruent,
        Congruency::Incongruent,
        Congruency::Incongruent,
    ]
    .into_iter()
    .cycle()
    .take(2 * third)
    .chain(std::iter::repeat_n(Congruency::Neutral, third));

    let sides = [TargetSide::Left, TargetSide::Right]
        .into_iter()
        .cycle()
        .take(n_trials);

    let mut trials = cue_colours
        .zip(congruencies)
        .zip(sides)
        .map(|((colour, congruency), side)| TrialSpec::new(colour, congruency, side))
        .collect::<Result<Vec<_>>>()?;
    trials.shuffle(rng);

    Ok(trials)
}
