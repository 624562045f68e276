//! A whole sitting: refresh check, practice, the counterbalanced blocks and the
//! breaks between them.

use nullcue_core::{
    BlockSpec, BlockType, Display, EngineError, EventRecorder, Frame, InputDevice, Key, Palette,
    PrematureOutcome, Result, SessionPhase, TrialRecord,
};
use nullcue_timing::{Clock, FrameIntervals, RefreshStats};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::ExperimentConfig;
use crate::design::{generate_blocks, generate_trials};
use crate::dial::DialRequest;
use crate::performance::{cue_accuracy, BlockPerformance, BlockTally};
use crate::rig::Rig;
use crate::sequencer::{TrialPlan, TrialSequencer};
use crate::stimulus::{generate_characteristics, random_orientation, random_trial_spec};

/// Measured refresh rates further than this from nominal are reported.
const REFRESH_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub block_number: usize,
    pub block_type: BlockType,
    pub trials: usize,
    #[serde(flatten)]
    pub performance: BlockPerformance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeSummary {
    pub block_type: BlockType,
    pub trials: usize,
    pub cue_accuracy: u32,
}

/// Everything a session produced, complete or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub measured_refresh_hz: Option<f64>,
    pub practice: Vec<PracticeSummary>,
    pub blocks: Vec<BlockSummary>,
    pub trials: Vec<TrialRecord>,
    /// All blocks ran to the end.
    pub completed: bool,
    pub cancelled: bool,
    pub error: Option<String>,
}

impl SessionReport {
    fn fail(&mut self, err: EngineError) {
        if err.is_cancelled() {
            info!(trials = self.trials.len(), "session cancelled");
            self.cancelled = true;
        } else {
            error!(%err, trials = self.trials.len(), "session aborted");
            self.error = Some(err.to_string());
        }
    }
}

pub struct Session<D, I, E, C, R> {
    config: ExperimentConfig,
    palette: Palette,
    sequencer: TrialSequencer,
    rig: Rig<D, I, E, C>,
    rng: R,
    phase: SessionPhase,
}

impl<D, I, E, C, R> Session<D, I, E, C, R>
where
    D: Display,
    I: InputDevice,
    E: EventRecorder,
    C: Clock,
    R: Rng,
{
    pub fn new(config: ExperimentConfig, palette: Palette, rig: Rig<D, I, E, C>, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sequencer: TrialSequencer::from_config(&config),
            config,
            palette,
            rig,
            rng,
            phase: SessionPhase::default(),
        })
    }

    pub fn rig(&self) -> &Rig<D, I, E, C> {
        &self.rig
    }

    /// Refresh check, optional practice, then the experiment. The recorder is
    /// started first and stopped last whatever happens in between.
    pub fn run(&mut self, skip_practice: bool) -> SessionReport {
        let mut report = SessionReport::default();

        if self.markers_enabled() {
            if let Err(err) = self
                .rig
                .recorder
                .calibrate()
                .and_then(|()| self.rig.recorder.start_recording())
            {
                report.fail(err);
                return report;
            }
        }

        match self.prepare(&mut report, skip_practice) {
            Ok(()) => self.run_experiment(&mut report),
            Err(err) => report.fail(err),
        }

        self.enter(SessionPhase::Debrief);
        if self.markers_enabled() {
            if let Err(err) = self.rig.recorder.stop_recording() {
                error!(%err, "failed to stop recording");
            }
        }
        report
    }

    /// Flips a fixation frame repeatedly and compares the measured rate with the
    /// configured one.
    pub fn check_refresh(&mut self) -> Result<Option<RefreshStats>> {
        self.enter(SessionPhase::RefreshCheck);
        let frames = self.config.refresh_check_frames;
        if frames == 0 {
            return Ok(None);
        }

        let frame = self.sequencer.scene().fixation(None, None);
        let mut intervals = FrameIntervals::new(frames);
        for _ in 0..=frames {
            self.rig.display.draw(&frame)?;
            let onset = self.rig.display.flip()?;
            intervals.record_onset(onset);
        }

        let stats = intervals.stats();
        if let Some(stats) = &stats {
            let nominal = self.config.monitor.refresh_hz as f64;
            let deviation = (stats.effective_hz - nominal).abs() / nominal;
            if deviation > REFRESH_TOLERANCE {
                warn!(
                    measured_hz = stats.effective_hz,
                    nominal_hz = nominal,
                    jitter_us = stats.jitter_ns / 1e3,
                    "refresh rate differs from configuration"
                );
            } else {
                info!(
                    measured_hz = stats.effective_hz,
                    jitter_us = stats.jitter_ns / 1e3,
                    "refresh rate ok"
                );
            }
        }
        Ok(stats)
    }

    /// Dial practice followed by one practice loop per block type, in random order.
    pub fn practice(&mut self) -> Result<Vec<PracticeSummary>> {
        self.practice_dial()?;

        let mut block_types = BlockType::ALL;
        block_types.shuffle(&mut self.rng);
        let mut summaries = Vec::with_capacity(block_types.len());
        for (i, block_type) in block_types.into_iter().enumerate() {
            summaries.push(self.practice_block(block_type, i + 1 == block_types.len())?);
        }
        Ok(summaries)
    }

    /// Free-running dial practice with the target bar visible. Ends on quit.
    pub fn practice_dial(&mut self) -> Result<usize> {
        self.enter(SessionPhase::DialPractice);
        self.instruct(
            "Welcome to the practice trials. You will practice each part until you press Q.\n\
             Press SPACE to start the practice session.",
        )?;

        let dial = self.sequencer.dial().clone();
        let feedback = self.sequencer.timing().practice_feedback();
        let scene = self.sequencer.scene().clone();
        let mut rounds = 0;
        loop {
            let target = random_orientation(&mut self.rng);
            self.rig.show(&scene.dial(None, 0.0, None, Some(target)))?;

            let request = DialRequest {
                target_orientation: target,
                response_required: false,
                colour: None,
                block: None,
                practice_bar: Some(target),
                condition: None,
            };
            match dial.collect(&mut self.rig, &scene, &request) {
                Ok(response) => {
                    let onset = self.rig.show(&scene.practice_feedback(response.score.performance))?;
                    self.rig.clock.sleep_until(onset + feedback);
                    rounds += 1;
                }
                Err(EngineError::Cancelled) => break,
                Err(err) => return Err(err),
            }
        }

        info!(rounds, "dial practice finished");
        self.instruct(
            "You decided to stop practising the response dial.\n\
             Press SPACE to start practising full trials.\n\n\
             Remember to press Q to stop practising these trials once you feel comfortable \
             starting the real experiment.",
        )?;
        Ok(rounds)
    }

    /// Random unmarked trials of one block type until quit.
    pub fn practice_block(&mut self, block_type: BlockType, last: bool) -> Result<PracticeSummary> {
        self.enter(SessionPhase::BlockPractice);
        self.announce_block(block_type)?;

        let mut outcomes: Vec<(PrematureOutcome, bool)> = Vec::new();
        loop {
            let spec = random_trial_spec(&mut self.rng)?;
            let stimulus = generate_characteristics(&spec, &self.palette, &mut self.rng);
            let plan = TrialPlan::new(block_type, spec, stimulus, false);
            match self.sequencer.run(&mut self.rig, &plan) {
                Ok(result) => outcomes.push((result.response.premature, plan.response_required)),
                Err(EngineError::Cancelled) => break,
                Err(err) => return Err(err),
            }
        }

        let accuracy = cue_accuracy(outcomes.iter().map(|(o, required)| (o, *required)));
        info!(%block_type, trials = outcomes.len(), accuracy, "block practice finished");

        let next = if last {
            "Press SPACE to start the experiment."
        } else {
            "Press SPACE to start practising the other block type.\n\n\
             Remember to press Q to stop practising these trials once you feel comfortable \
             starting the real experiment."
        };
        self.instruct(format!(
            "You decided to stop practising the {} block type.\n\
             During this practice, you correctly responded to the cue {accuracy}% of the time.\n\n{next}",
            if last { "second" } else { "first" },
        ))?;

        Ok(PracticeSummary {
            block_type,
            trials: outcomes.len(),
            cue_accuracy: accuracy,
        })
    }

    /// Runs every block, appending to `report` as trials complete. Errors end the
    /// run but keep what was collected.
    pub fn run_experiment(&mut self, report: &mut SessionReport) {
        self.enter(SessionPhase::Experiment);
        match self.run_blocks(report) {
            Ok(()) => report.completed = true,
            Err(err) => report.fail(err),
        }
    }

    /// Closing screen: the regular one after a complete run, the short one otherwise.
    pub fn finish(&mut self, report: &SessionReport) -> Result<()> {
        let text = if report.completed {
            format!(
                "Congratulations! You successfully finished all {} blocks! \
                 You're completely done now. Press SPACE to exit the experiment.",
                self.config.n_blocks
            )
        } else {
            "You've exited the experiment. Press SPACE to close this window.".to_string()
        };
        let frame = self.sequencer.scene().message(text);
        self.rig.show_and_wait(&frame, &[Key::Continue, Key::Quit])?;
        Ok(())
    }

    fn prepare(&mut self, report: &mut SessionReport, skip_practice: bool) -> Result<()> {
        report.measured_refresh_hz = self.check_refresh()?.map(|s| s.effective_hz);
        if !skip_practice {
            report.practice = self.practice()?;
        }
        Ok(())
    }

    fn run_blocks(&mut self, report: &mut SessionReport) -> Result<()> {
        let experiment_start = self.rig.clock.now();
        let blocks = generate_blocks(self.config.n_blocks, &mut self.rng)?;
        let emit_markers = self.markers_enabled();

        for BlockSpec {
            block_number,
            block_type,
        } in blocks
        {
            self.announce_block(block_type)?;
            let specs = generate_trials(self.config.trials_per_block, &mut self.rng)?;
            self.rig.input.clear_events();
            info!(block_number, %block_type, trials = specs.len(), "block started");

            let mut tally = BlockTally::new();
            for spec in specs {
                let stimulus = generate_characteristics(&spec, &self.palette, &mut self.rng);
                let plan = TrialPlan::new(block_type, spec, stimulus, emit_markers);

                let start = self.rig.clock.elapsed(experiment_start);
                let result = self.sequencer.run(&mut self.rig, &plan)?;
                let end = self.rig.clock.elapsed(experiment_start);

                tally.record(&result, plan.response_required);
                report.trials.push(TrialRecord {
                    trial_number: report.trials.len() + 1,
                    block: block_number,
                    block_type,
                    start_time_s: start.as_secs_f64(),
                    end_time_s: end.as_secs_f64(),
                    response_required: plan.response_required,
                    stimulus: plan.stimulus,
                    result,
                });
            }

            let performance = tally.summarize()?;
            info!(block_number, %performance, "block finished");
            report.blocks.push(BlockSummary {
                block_number,
                block_type,
                trials: tally.len(),
                performance,
            });
            self.block_break(block_number, performance)?;
        }
        Ok(())
    }

    /// Between blocks: a long break halfway, a short one otherwise, none after the last.
    fn block_break(&mut self, block_number: usize, performance: BlockPerformance) -> Result<()> {
        let n_blocks = self.config.n_blocks;
        let text = if block_number == n_blocks / 2 {
            format!(
                "{performance}\n\n\
                 You're halfway through! You have {} blocks left. Now is the time to take a \
                 longer break. Maybe get up, stretch, walk around.\n\n\
                 Press SPACE whenever you're ready to continue again.",
                n_blocks - block_number
            )
        } else if block_number < n_blocks {
            let left = n_blocks - block_number;
            format!(
                "{performance}\n\n\
                 You just finished block {block_number}, you {}have {left} block{} left. \
                 Take a break if you want to, but try not to move your head during this break.\n\n\
                 Press SPACE when you're ready to continue.",
                if left == 1 { "only " } else { "" },
                if left == 1 { "" } else { "s" },
            )
        } else {
            return Ok(());
        };
        self.prompt_with_recalibration(text)
    }

    /// Reminder of the rule for the next block.
    fn announce_block(&mut self, block_type: BlockType) -> Result<()> {
        let text = format!(
            "Next: respond when {}{}",
            match block_type {
                BlockType::RespondOnCue => "",
                BlockType::RespondOffCue => "NOT ",
            },
            self.palette.assigned()
        );
        if self.phase.records_data() {
            self.prompt_with_recalibration(text)
        } else {
            self.instruct(text)
        }
    }

    /// Practice screen that only SPACE dismisses. Q pressed here is dropped so
    /// it cannot end the practice that follows.
    fn instruct(&mut self, text: impl Into<String>) -> Result<()> {
        let frame = self.sequencer.scene().message(text);
        self.rig.show_and_wait(&frame, &[Key::Continue])?;
        self.rig.input.clear_events();
        Ok(())
    }

    /// Message screen until SPACE. Quit cancels.
    fn prompt(&mut self, text: impl Into<String>) -> Result<()> {
        let frame = self.sequencer.scene().message(text);
        self.wait_on(&frame, &[Key::Continue, Key::Quit]).map(|_| ())
    }

    /// Like [`Self::prompt`], but `c` lets the experimenter recalibrate the
    /// recorder and restart recording before the screen comes back.
    fn prompt_with_recalibration(&mut self, text: impl Into<String>) -> Result<()> {
        if !self.markers_enabled() {
            return self.prompt(text);
        }
        let frame = self.sequencer.scene().message(text);
        loop {
            match self.wait_on(&frame, &[Key::Continue, Key::Recalibrate, Key::Quit])? {
                Key::Recalibrate => {
                    info!("recalibrating recorder");
                    self.rig.recorder.calibrate()?;
                    self.rig.recorder.start_recording()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn wait_on(&mut self, frame: &Frame, keys: &[Key]) -> Result<Key> {
        let event = self.rig.show_and_wait(frame, keys)?;
        if event.key == Key::Quit {
            return Err(EngineError::Cancelled);
        }
        Ok(event.key)
    }

    fn markers_enabled(&self) -> bool {
        !self.config.testing
    }

    fn enter(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            info!(from = %self.phase, to = %phase, "session phase");
            self.phase = phase;
        }
    }
}
