//! Continuous response dial: turns held key presses into an orientation report
//! and judges what was pressed before the probe appeared.

use std::time::Duration;

use nullcue_core::{
    BlockType, DialResponse, Display, EngineError, EventRecorder, FrameName, InputDevice, Key,
    KeyEvent, PrematureOutcome, Result, ResponseScore, Rgb, RotationKey,
};
use nullcue_timing::Clock;
use tracing::debug;

use crate::config::ExperimentConfig;
use crate::rig::Rig;
use crate::scene::Scene;
use crate::trigger::ConditionKey;

/// One response to collect.
#[derive(Debug, Clone, Copy)]
pub struct DialRequest<'a> {
    pub target_orientation: i32,
    pub response_required: bool,
    /// Ring colour; the neutral dial grey when absent.
    pub colour: Option<Rgb>,
    pub block: Option<BlockType>,
    /// Orientation of a bar drawn in the middle of the dial (dial practice).
    pub practice_bar: Option<i32>,
    /// Trial condition to send `response_onset` for; no marker when absent.
    pub condition: Option<&'a ConditionKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDial {
    step_rad: f64,
    max_turns: u32,
    premature_window: Duration,
}

impl ResponseDial {
    pub fn new(step_rad: f64, max_turns: u32, premature_window: Duration) -> Self {
        Self {
            step_rad,
            max_turns,
            premature_window,
        }
    }

    /// One step per refresh, at most one second of rotation.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self::new(
            config.monitor.dial_step_rad(),
            config.monitor.refresh_hz,
            config.premature_window(),
        )
    }

    pub fn step_degrees(&self) -> f64 {
        self.step_rad.to_degrees()
    }

    /// Reported orientation in degrees.
    pub fn decode(&self, turns: u32, key: RotationKey) -> f64 {
        key.sign() * turns as f64 * self.step_degrees()
    }

    /// Judges presses buffered before the probe, `probe_onset` being time zero.
    ///
    /// The first adjacent pair made of one press of each rotation key, both within
    /// the window before the probe, decides the outcome. Every press is reported.
    pub fn evaluate_premature(
        &self,
        events: &[KeyEvent],
        probe_onset: Duration,
        response_required: bool,
    ) -> PrematureOutcome {
        let timings: Vec<f64> = events
            .iter()
            .map(|e| round_ms(signed_secs(e.at, probe_onset)))
            .collect();
        let window_ms = self.premature_window.as_secs_f64() * 1e3;

        let pressed_both = events.windows(2).zip(timings.windows(2)).any(|(pair, t)| {
            is_rotation_pair(pair[0].key, pair[1].key) && t[0] > -window_ms && t[1] > -window_ms
        });

        PrematureOutcome {
            premature_pressed: !events.is_empty(),
            premature_keys: events.iter().map(|e| e.key).collect(),
            premature_timing_ms: timings,
            cue_hit: pressed_both && response_required,
            cue_false_alarm: pressed_both && !response_required,
        }
    }

    /// Compares a report against the target. Orientations are axial, so errors
    /// larger than 90 degrees fold back.
    pub fn score(report: f64, target: i32, key: RotationKey) -> ResponseScore {
        let report_orientation = report.round_ties_even() as i32;
        let signed_difference = target - report_orientation;
        let mut absolute_difference = signed_difference.abs();
        if absolute_difference > 90 {
            absolute_difference = 180 - absolute_difference;
        }
        let performance = (100.0 - absolute_difference as f64 / 90.0 * 100.0).round() as i32;
        let correct_key = (target > 0 && key == RotationKey::Clockwise)
            || (target < 0 && key == RotationKey::CounterClockwise);

        ResponseScore {
            report_orientation,
            signed_difference,
            absolute_difference,
            performance,
            correct_key,
        }
    }

    /// Runs both phases against the rig. The probe (or practice frame) must
    /// already be on screen.
    pub fn collect<D, I, E, C>(
        &self,
        rig: &mut Rig<D, I, E, C>,
        scene: &Scene,
        request: &DialRequest<'_>,
    ) -> Result<DialResponse>
    where
        D: Display,
        I: InputDevice,
        E: EventRecorder,
        C: Clock,
    {
        if rig.input.cancel_requested() {
            return Err(EngineError::Cancelled);
        }

        let idle_start = rig.clock.now();
        let early = rig.input.take_events();
        let premature = self.evaluate_premature(&early, idle_start, request.response_required);
        rig.input.clear_events();

        let press = rig
            .input
            .wait_for_keys(&[Key::Clockwise, Key::CounterClockwise, Key::Quit])?;
        let key = RotationKey::from_key(press.key).ok_or(EngineError::Cancelled)?;
        let response_started = press.at.max(idle_start);
        debug!(?key, "rotation started");

        if let Some(condition) = request.condition {
            condition.emit(&mut rig.recorder, FrameName::ResponseOnset)?;
        }

        let mut turns = 0;
        while turns < self.max_turns && rig.input.is_held(key.key()) {
            if rig.input.cancel_requested() {
                return Err(EngineError::Cancelled);
            }
            turns += 1;
            let angle = key.sign() * turns as f64 * self.step_rad;
            rig.display.draw(&scene.dial(
                request.colour,
                angle,
                request.block,
                request.practice_bar,
            ))?;
            rig.display.flip()?;
        }
        let response_end = rig.clock.now();

        let report = self.decode(turns, key);
        debug!(turns, report, "rotation finished");

        Ok(DialResponse {
            idle_reaction_time_ms: round_ms((response_started - idle_start).as_secs_f64()),
            response_time_ms: round_ms(response_end.saturating_sub(response_started).as_secs_f64()),
            key_pressed: key,
            turns_made: turns,
            premature,
            score: Self::score(report, request.target_orientation, key),
        })
    }
}

fn is_rotation_pair(a: Key, b: Key) -> bool {
    matches!(
        (a, b),
        (Key::Clockwise, Key::CounterClockwise) | (Key::CounterClockwise, Key::Clockwise)
    )
}

fn signed_secs(at: Duration, zero: Duration) -> f64 {
    at.as_secs_f64() - zero.as_secs_f64()
}

/// Seconds to milliseconds, two decimals.
fn round_ms(secs: f64) -> f64 {
    (secs * 1e5).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Monitor;

    fn dial() -> ResponseDial {
        let monitor = Monitor::laptop();
        ResponseDial::new(monitor.dial_step_rad(), monitor.refresh_hz, Duration::from_millis(1500))
    }

    fn press(key: Key, ms: u64) -> KeyEvent {
        KeyEvent::new(key, Duration::from_millis(ms))
    }

    #[test]
    fn decode_scales_and_signs() {
        let d = dial();
        assert!((d.decode(60, RotationKey::Clockwise) - 90.0).abs() < 1e-9);
        assert!((d.decode(20, RotationKey::CounterClockwise) + 30.0).abs() < 1e-9);
        assert_eq!(d.decode(0, RotationKey::Clockwise), 0.0);
    }

    #[test]
    fn exact_report_scores_full_marks() {
        let score = ResponseDial::score(40.0, 40, RotationKey::Clockwise);
        assert_eq!(score.performance, 100);
        assert!(score.correct_key);
        assert_eq!(score.absolute_difference, 0);
        assert_eq!(score.signed_difference, 0);
    }

    #[test]
    fn error_wraps_around_the_vertical() {
        let score = ResponseDial::score(-80.0, 85, RotationKey::CounterClockwise);
        assert_eq!(score.signed_difference, 165);
        assert_eq!(score.absolute_difference, 15);
        assert_eq!(score.performance, 83);
        assert!(!score.correct_key);
    }

    #[test]
    fn report_rounds_half_to_even() {
        assert_eq!(ResponseDial::score(10.5, 10, RotationKey::Clockwise).report_orientation, 10);
        assert_eq!(ResponseDial::score(11.5, 10, RotationKey::Clockwise).report_orientation, 12);
        assert_eq!(ResponseDial::score(-10.6, -10, RotationKey::Clockwise).report_orientation, -11);
    }

    #[test]
    fn both_keys_close_to_probe_count_as_hit() {
        let events = [press(Key::Clockwise, 9_000), press(Key::CounterClockwise, 9_100)];
        let outcome = dial().evaluate_premature(&events, Duration::from_secs(10), true);
        assert!(outcome.premature_pressed);
        assert!(outcome.cue_hit);
        assert!(!outcome.cue_false_alarm);
        assert_eq!(outcome.premature_timing_ms, vec![-1000.0, -900.0]);
        assert_eq!(outcome.premature_keys, vec![Key::Clockwise, Key::CounterClockwise]);
    }

    #[test]
    fn same_pair_without_requirement_is_false_alarm() {
        let events = [press(Key::CounterClockwise, 9_500), press(Key::Clockwise, 9_600)];
        let outcome = dial().evaluate_premature(&events, Duration::from_secs(10), false);
        assert!(outcome.cue_false_alarm);
        assert!(!outcome.cue_hit);
        assert!(!outcome.responded_correctly(false));
    }

    #[test]
    fn stale_or_repeated_presses_do_not_count() {
        let d = dial();
        let stale = [press(Key::Clockwise, 1_000), press(Key::CounterClockwise, 8_600)];
        let outcome = d.evaluate_premature(&stale, Duration::from_secs(10), true);
        assert!(outcome.premature_pressed);
        assert!(!outcome.cue_hit);

        let repeated = [press(Key::Clockwise, 9_500), press(Key::Clockwise, 9_600)];
        assert!(!d.evaluate_premature(&repeated, Duration::from_secs(10), true).cue_hit);

        let quiet = d.evaluate_premature(&[], Duration::from_secs(10), true);
        assert_eq!(quiet, PrematureOutcome::default());
    }
}
