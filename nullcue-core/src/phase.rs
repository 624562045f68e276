use std::fmt;

/// Stages a session walks through, in order.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    RefreshCheck,
    DialPractice,
    BlockPractice,
    Experiment,
    Debrief,
}

impl SessionPhase {
    pub fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            RefreshCheck => DialPractice,
            DialPractice => BlockPractice,
            BlockPractice => Experiment,
            Experiment => Debrief,
            Debrief => return None,
        })
    }

    pub fn is_practice(&self) -> bool {
        matches!(self, SessionPhase::DialPractice | SessionPhase::BlockPractice)
    }

    /// Only experiment trials are persisted and marked on the recorder.
    pub fn records_data(&self) -> bool {
        matches!(self, SessionPhase::Experiment)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::RefreshCheck => "refresh check",
            SessionPhase::DialPractice => "dial practice",
            SessionPhase::BlockPractice => "block practice",
            SessionPhase::Experiment => "experiment",
            SessionPhase::Debrief => "debrief",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_to_debrief_and_stop() {
        let mut phase = SessionPhase::default();
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(phase, SessionPhase::Debrief);
        assert!(seen.iter().filter(|p| p.is_practice()).count() == 2);
    }
}
