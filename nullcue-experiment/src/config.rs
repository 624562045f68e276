use std::f64::consts::FRAC_PI_2;
use std::path::Path;
use std::time::Duration;

use nullcue_core::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Physical screen the participant looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    /// In pixels.
    pub resolution: (u32, u32),
    pub refresh_hz: u32,
    /// Visible width of the panel.
    pub width_cm: f64,
    /// Eye-to-screen distance.
    pub distance_cm: f64,
}

impl Monitor {
    pub fn laptop() -> Self {
        Self {
            resolution: (1920, 1080),
            refresh_hz: 60,
            width_cm: 33.0,
            distance_cm: 50.0,
        }
    }

    pub fn lab() -> Self {
        Self {
            resolution: (1920, 1080),
            refresh_hz: 239,
            width_cm: 53.0,
            distance_cm: 70.0,
        }
    }

    pub fn degrees_per_pixel(&self) -> f64 {
        (0.5 * self.width_cm).atan2(self.distance_cm).to_degrees() / (0.5 * self.resolution.0 as f64)
    }

    /// Visual angle to whole pixels.
    pub fn deg2pix(&self, deg: f64) -> f32 {
        (deg / self.degrees_per_pixel()).round() as f32
    }

    /// The dial turns a quarter circle per second of holding.
    pub fn dial_step_rad(&self) -> f64 {
        FRAC_PI_2 / self.refresh_hz.max(1) as f64
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::lab()
    }
}

/// Nominal durations of the trial timeline, each measured from the onset of its frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialTiming {
    pub initial_fixation_ms: u64,
    pub stimuli_ms: u64,
    pub retention_ms: u64,
    pub capture_cue_ms: u64,
    pub probe_delay_ms: u64,
    pub feedback_ms: u64,
    pub practice_feedback_ms: u64,
}

impl Default for TrialTiming {
    fn default() -> Self {
        Self {
            initial_fixation_ms: 500,
            stimuli_ms: 250,
            retention_ms: 750,
            capture_cue_ms: 250,
            probe_delay_ms: 1250,
            feedback_ms: 250,
            practice_feedback_ms: 500,
        }
    }
}

impl TrialTiming {
    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    pub fn practice_feedback(&self) -> Duration {
        Duration::from_millis(self.practice_feedback_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub n_blocks: usize,
    pub trials_per_block: usize,
    pub monitor: Monitor,
    pub timing: TrialTiming,
    /// Early presses older than this (relative to probe onset) are ignored.
    pub premature_window_ms: u64,
    /// Flips used to measure the real refresh rate before the session.
    pub refresh_check_frames: usize,
    /// Dry run: no marker emission, shorter design.
    pub testing: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_blocks: 16,
            trials_per_block: 48,
            monitor: Monitor::lab(),
            timing: TrialTiming::default(),
            premature_window_ms: 1500,
            refresh_check_frames: 120,
            testing: false,
        }
    }
}

impl ExperimentConfig {
    pub fn testing() -> Self {
        Self {
            n_blocks: 2,
            trials_per_block: 12,
            monitor: Monitor::laptop(),
            testing: true,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Device(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| EngineError::InvalidDesign(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_blocks == 0 || self.n_blocks % 2 != 0 {
            return Err(EngineError::InvalidDesign(format!(
                "expected the number of blocks to be a positive multiple of 2, got {}",
                self.n_blocks
            )));
        }
        if self.trials_per_block == 0 || self.trials_per_block % 12 != 0 {
            return Err(EngineError::InvalidDesign(format!(
                "expected the number of trials per block to be a positive multiple of 12, got {}",
                self.trials_per_block
            )));
        }
        if self.monitor.refresh_hz == 0 {
            return Err(EngineError::InvalidDesign("refresh rate must be positive".into()));
        }
        Ok(())
    }

    pub fn premature_window(&self) -> Duration {
        Duration::from_millis(self.premature_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_monitor_geometry() {
        let m = Monitor::lab();
        // 53 cm panel at 70 cm: about 46.3 px per degree
        assert_eq!(m.deg2pix(1.0), 46.0);
        assert_eq!(m.deg2pix(6.0), 278.0);
        assert_eq!(Monitor::laptop().deg2pix(6.0), 315.0);
        assert!((m.dial_step_rad() * 239.0 - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn presets_validate() {
        assert!(ExperimentConfig::default().validate().is_ok());
        assert!(ExperimentConfig::testing().validate().is_ok());
        let odd = ExperimentConfig {
            n_blocks: 5,
            ..ExperimentConfig::default()
        };
        assert!(matches!(odd.validate(), Err(EngineError::InvalidDesign(_))));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{ "n_blocks": 4, "timing": { "feedback_ms": 300 } }"#).unwrap();
        assert_eq!(config.n_blocks, 4);
        assert_eq!(config.trials_per_block, 48);
        assert_eq!(config.timing.feedback_ms, 300);
        assert_eq!(config.timing.stimuli_ms, 250);
    }
}
