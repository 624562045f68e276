//! Frame-accurate trial timeline.
//!
//! Every timed frame is held for its nominal duration measured from its own
//! onset. The successor is drawn into the back buffer while the current frame is
//! on screen, then flipped once the hold has elapsed. A successor that takes
//! longer to prepare than the hold is a [`TimingFault`]: logged and counted, and
//! the flip happens as soon as possible instead.

use std::fmt;
use std::time::Duration;

use nullcue_core::{
    BlockType, Display, EngineError, EventRecorder, Frame, FrameName, InputDevice, Result,
    StimulusCharacteristics, TimingFault, TrialResult, TrialSpec,
};
use nullcue_timing::Clock;
use tracing::{debug, warn};

use crate::config::{ExperimentConfig, TrialTiming};
use crate::dial::{DialRequest, ResponseDial};
use crate::rig::Rig;
use crate::scene::Scene;
use crate::trigger::ConditionKey;

/// Timeline states up to the open-ended probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    InitialFixation,
    Stimuli,
    Retention,
    CaptureCue,
    ProbeDelay,
    Probe,
}

impl TrialState {
    pub const TIMELINE: [TrialState; 6] = [
        TrialState::InitialFixation,
        TrialState::Stimuli,
        TrialState::Retention,
        TrialState::CaptureCue,
        TrialState::ProbeDelay,
        TrialState::Probe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrialState::InitialFixation => "initial_fixation",
            TrialState::Stimuli => "stimuli",
            TrialState::Retention => "retention",
            TrialState::CaptureCue => "capture_cue",
            TrialState::ProbeDelay => "probe_delay",
            TrialState::Probe => "probe",
        }
    }

    /// How long the frame stays up. The probe waits for the dial instead.
    pub fn hold(self, timing: &TrialTiming) -> Option<Duration> {
        let ms = match self {
            TrialState::InitialFixation => timing.initial_fixation_ms,
            TrialState::Stimuli => timing.stimuli_ms,
            TrialState::Retention => timing.retention_ms,
            TrialState::CaptureCue => timing.capture_cue_ms,
            TrialState::ProbeDelay => timing.probe_delay_ms,
            TrialState::Probe => return None,
        };
        Some(Duration::from_millis(ms))
    }

    /// Marker sent when the frame becomes visible.
    pub fn onset_marker(self) -> Option<FrameName> {
        match self {
            TrialState::Stimuli => Some(FrameName::StimuliOnset),
            TrialState::CaptureCue => Some(FrameName::CaptureCueOnset),
            TrialState::Probe => Some(FrameName::ProbeCueOnset),
            _ => None,
        }
    }

    pub fn next(self) -> Option<TrialState> {
        let i = Self::TIMELINE.iter().position(|s| *s == self)?;
        Self::TIMELINE.get(i + 1).copied()
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one trial needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPlan {
    pub block_type: BlockType,
    pub spec: TrialSpec,
    pub stimulus: StimulusCharacteristics,
    pub response_required: bool,
    pub emit_markers: bool,
}

impl TrialPlan {
    pub fn new(
        block_type: BlockType,
        spec: TrialSpec,
        stimulus: StimulusCharacteristics,
        emit_markers: bool,
    ) -> Self {
        Self {
            response_required: block_type.requires_response(spec.cue_colour()),
            block_type,
            spec,
            stimulus,
            emit_markers,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrialSequencer {
    timing: TrialTiming,
    dial: ResponseDial,
    scene: Scene,
}

impl TrialSequencer {
    pub fn new(timing: TrialTiming, dial: ResponseDial, scene: Scene) -> Self {
        Self {
            timing,
            dial,
            scene,
        }
    }

    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self::new(
            config.timing.clone(),
            ResponseDial::from_config(config),
            Scene::new(&config.monitor),
        )
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn dial(&self) -> &ResponseDial {
        &self.dial
    }

    pub fn timing(&self) -> &TrialTiming {
        &self.timing
    }

    /// Runs one trial start to finish.
    ///
    /// A quit press at any wait aborts with [`EngineError::Cancelled`]; nothing
    /// is returned and no further markers are sent.
    pub fn run<D, I, E, C>(&self, rig: &mut Rig<D, I, E, C>, plan: &TrialPlan) -> Result<TrialResult>
    where
        D: Display,
        I: InputDevice,
        E: EventRecorder,
        C: Clock,
    {
        let condition = ConditionKey::new(plan.block_type, &plan.spec);
        let condition_code = condition.condition_code()?;
        let markers = plan.emit_markers.then_some(&condition);
        let mut timing_faults = 0;

        // settle onto the refresh before the timed sequence
        let mut state = TrialState::InitialFixation;
        rig.display.draw(&self.frame_for(state, plan))?;
        rig.display.flip()?;
        rig.display.draw(&self.frame_for(state, plan))?;

        loop {
            let onset = rig.display.flip()?;
            if let (Some(condition), Some(marker)) = (markers, state.onset_marker()) {
                condition.emit(&mut rig.recorder, marker)?;
            }
            debug!(%state, onset_ms = onset.as_secs_f64() * 1e3, "frame shown");

            let (Some(hold), Some(next)) = (state.hold(&self.timing), state.next()) else {
                break;
            };

            rig.display.draw(&self.frame_for(next, plan))?;
            let spent = rig.clock.elapsed(onset);
            if spent > hold {
                let fault = TimingFault {
                    state: state.as_str(),
                    budget: hold,
                    spent,
                };
                warn!(%fault, "timing fault");
                timing_faults += 1;
            }
            rig.clock.sleep_until(onset + hold);

            if rig.input.cancel_requested() {
                return Err(EngineError::Cancelled);
            }
            state = next;
        }

        let request = DialRequest {
            target_orientation: plan.stimulus.target_orientation,
            response_required: plan.response_required,
            colour: Some(plan.stimulus.target_colour.rgb()),
            block: Some(plan.block_type),
            practice_bar: None,
            condition: markers,
        };
        let response = self.dial.collect(rig, &self.scene, &request)?;
        if let Some(condition) = markers {
            condition.emit(&mut rig.recorder, FrameName::ResponseOffset)?;
        }

        rig.display
            .draw(&self.scene.feedback(response.score.performance, Some(plan.block_type)))?;
        let onset = rig.display.flip()?;
        if let Some(condition) = markers {
            condition.emit(&mut rig.recorder, FrameName::FeedbackOnset)?;
        }
        rig.clock.sleep_until(onset + self.timing.feedback());

        debug!(
            condition = %condition_code,
            performance = response.score.performance,
            timing_faults,
            "trial finished"
        );

        Ok(TrialResult {
            condition_code,
            response,
            timing_faults,
        })
    }

    fn frame_for(&self, state: TrialState, plan: &TrialPlan) -> Frame {
        let block = Some(plan.block_type);
        match state {
            TrialState::InitialFixation | TrialState::Retention | TrialState::ProbeDelay => {
                self.scene.fixation(None, block)
            }
            TrialState::Stimuli => self.scene.stimuli(&plan.stimulus, block),
            TrialState::CaptureCue => self
                .scene
                .capture_cue(plan.stimulus.capture_colour.rgb(), block),
            TrialState::Probe => self
                .scene
                .probe_cue(plan.stimulus.target_colour.rgb(), block),
        }
    }
}
