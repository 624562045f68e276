use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_hz: f64,
}

/// Rolling window of flip-to-flip intervals.
#[derive(Debug, Clone)]
pub struct FrameIntervals {
    samples: VecDeque<Duration>,
    max_samples: usize,
    last_onset: Option<Duration>,
}

impl FrameIntervals {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            last_onset: None,
        }
    }

    /// Records a flip onset; the interval to the previous onset becomes a sample.
    pub fn record_onset(&mut self, onset: Duration) {
        if let Some(prev) = self.last_onset {
            self.record(onset.saturating_sub(prev));
        }
        self.last_onset = Some(onset);
    }

    pub fn record(&mut self, interval: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(interval);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn stats(&self) -> Option<RefreshStats> {
        if self.samples.is_empty() {
            return None;
        }
        let times: Vec<f64> = self.samples.iter().map(|d| d.as_nanos() as f64).collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(RefreshStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_hz: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        })
    }
}

impl Default for FrameIntervals {
    fn default() -> Self {
        Self::new(1000)
    }
}
