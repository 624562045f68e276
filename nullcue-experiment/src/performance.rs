use std::fmt;

use nullcue_core::{EngineError, PrematureOutcome, Result, TrialResult};
use serde::{Deserialize, Serialize};

/// Cue-response rates of one block, in whole percent.
///
/// A rate is `None` when the block had no trial of the kind it is normalised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPerformance {
    pub hit_rate: Option<u32>,
    pub false_alarm_rate: Option<u32>,
}

impl fmt::Display for BlockPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hit: {} False alarm: {}",
            Rate(self.hit_rate),
            Rate(self.false_alarm_rate)
        )
    }
}

struct Rate(Option<u32>);

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(rate) => write!(f, "{rate}%"),
            None => f.write_str("n/a"),
        }
    }
}

/// `hit = mean(hits) / mean(targets)`, `fa = mean(false_alarms) / (1 - mean(targets))`.
/// Halves round to even.
pub fn summarize(hits: &[bool], false_alarms: &[bool], targets_present: &[bool]) -> Result<BlockPerformance> {
    let n = targets_present.len();
    if n == 0 {
        return Err(EngineError::InvalidDesign("cannot summarize an empty block".into()));
    }
    if hits.len() != n || false_alarms.len() != n {
        return Err(EngineError::InvalidDesign(format!(
            "outcome lists differ in length: {} hits, {} false alarms, {} targets",
            hits.len(),
            false_alarms.len(),
            n
        )));
    }

    let target_mean = mean(targets_present);
    Ok(BlockPerformance {
        hit_rate: ratio(mean(hits), target_mean),
        false_alarm_rate: ratio(mean(false_alarms), 1.0 - target_mean),
    })
}

/// Percentage of practice trials whose early response matched the block rule.
pub fn cue_accuracy<'a>(outcomes: impl IntoIterator<Item = (&'a PrematureOutcome, bool)>) -> u32 {
    let (correct, total) = outcomes
        .into_iter()
        .fold((0usize, 0usize), |(correct, total), (outcome, required)| {
            (correct + usize::from(outcome.responded_correctly(required)), total + 1)
        });
    if total == 0 {
        0
    } else {
        (correct as f64 / total as f64 * 100.0).round_ties_even() as u32
    }
}

/// Running per-block record of cue outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTally {
    hits: Vec<bool>,
    false_alarms: Vec<bool>,
    targets_present: Vec<bool>,
}

impl BlockTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &TrialResult, response_required: bool) {
        self.hits.push(result.cue_hit());
        self.false_alarms.push(result.cue_false_alarm());
        self.targets_present.push(response_required);
    }

    pub fn len(&self) -> usize {
        self.targets_present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets_present.is_empty()
    }

    pub fn summarize(&self) -> Result<BlockPerformance> {
        summarize(&self.hits, &self.false_alarms, &self.targets_present)
    }
}

fn mean(values: &[bool]) -> f64 {
    values.iter().filter(|v| **v).count() as f64 / values.len() as f64
}

fn ratio(numerator: f64, denominator: f64) -> Option<u32> {
    if denominator <= 0.0 {
        return None;
    }
    Some((numerator / denominator * 100.0).round_ties_even() as u32)
}
