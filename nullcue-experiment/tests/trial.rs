mod support;

use std::time::Duration;

use nullcue_core::{
    BlockType, ColourName, Congruency, CueColour, EngineError, Key, KeyEvent, Palette, RotationKey,
    TargetSide, TrialSpec,
};
use nullcue_experiment::{
    generate_characteristics, ExperimentConfig, ResponseDial, TrialPlan, TrialSequencer,
};
use nullcue_timing::{Clock, SimulatedClock};
use rand::SeedableRng;
use rand::rngs::StdRng;

use support::{markers, rig, Entry, Log, ScriptedInput};

fn palette() -> Palette {
    Palette::new(ColourName::Blue, ColourName::Green, ColourName::Orange).unwrap()
}

fn plan(block_type: BlockType, cue: CueColour, congruency: Congruency, emit_markers: bool) -> TrialPlan {
    let spec = TrialSpec::new(cue, congruency, TargetSide::Left).unwrap();
    let stimulus = generate_characteristics(&spec, &palette(), &mut StdRng::seed_from_u64(21));
    TrialPlan::new(block_type, spec, stimulus, emit_markers)
}

fn sequencer() -> TrialSequencer {
    TrialSequencer::from_config(&ExperimentConfig::testing())
}

#[test]
fn full_trial_sends_every_trigger_in_order() {
    let clock = SimulatedClock::new();
    let log = Log::default();
    let input = ScriptedInput::new(clock.clone(), [Key::Clockwise]).with_holds([10]);
    let mut rig = rig(&clock, &log, Duration::ZERO, input);
    let plan = plan(BlockType::RespondOnCue, CueColour::First, Congruency::Congruent, true);

    let result = sequencer().run(&mut rig, &plan).unwrap();

    assert_eq!(markers(&log), vec!["11", "21", "41", "51", "61", "71"]);
    assert_eq!(result.condition_code.to_string(), "11");
    assert_eq!(result.timing_faults, 0);
    assert_eq!(result.response.turns_made, 10);
    assert_eq!(result.response.key_pressed, RotationKey::Clockwise);
    assert!(!plan.response_required);

    // laptop dial: 1.5 degrees per refresh
    let expected = ResponseDial::score(15.0, plan.stimulus.target_orientation, RotationKey::Clockwise);
    assert_eq!(result.response.score, expected);

    let entries = log.borrow();
    let stimuli_marker = entries
        .iter()
        .position(|e| *e == Entry::Marker("11".into()))
        .unwrap();
    assert!(matches!(entries[stimuli_marker - 1], Entry::Flip { bars: 2, .. }));

    let feedback_marker = entries
        .iter()
        .position(|e| *e == Entry::Marker("71".into()))
        .unwrap();
    match &entries[feedback_marker - 1] {
        Entry::Flip { texts, .. } => assert!(texts.contains(&expected.performance.to_string())),
        other => panic!("expected the feedback flip, got {other:?}"),
    }
}

#[test]
fn holds_are_measured_from_each_onset() {
    let clock = SimulatedClock::new();
    let log = Log::default();
    let input = ScriptedInput::new(clock.clone(), [Key::CounterClockwise]).with_holds([3]);
    let mut rig = rig(&clock, &log, Duration::ZERO, input);
    let plan = plan(BlockType::RespondOffCue, CueColour::Second, Congruency::Incongruent, false);

    sequencer().run(&mut rig, &plan).unwrap();

    // 500 + 250 + 750 + 250 + 1250 to the probe, then 250 of feedback
    assert_eq!(clock.now(), Duration::from_millis(3250));
    assert!(markers(&log).is_empty());
}

#[test]
fn slow_preparation_is_counted_not_fatal() {
    let clock = SimulatedClock::new();
    let log = Log::default();
    let input = ScriptedInput::new(clock.clone(), [Key::Clockwise]).with_holds([1]);
    let mut rig = rig(&clock, &log, Duration::ZERO, input);
    rig.display = rig.display.with_draw_cost(Duration::from_millis(300));
    let plan = plan(BlockType::RespondOnCue, CueColour::First, Congruency::Incongruent, true);

    let result = sequencer().run(&mut rig, &plan).unwrap();

    // only the two 250 ms frames are shorter than a draw
    assert_eq!(result.timing_faults, 2);
    assert_eq!(markers(&log).len(), 6);
}

#[test]
fn early_presses_of_both_keys_hit_the_cue() {
    let clock = SimulatedClock::new();
    let log = Log::default();
    let early = [
        KeyEvent::new(Key::Clockwise, Duration::from_millis(2000)),
        KeyEvent::new(Key::CounterClockwise, Duration::from_millis(2100)),
    ];
    let input = ScriptedInput::new(clock.clone(), [Key::Clockwise])
        .with_holds([5])
        .with_buffered(early);
    let mut rig = rig(&clock, &log, Duration::ZERO, input);
    let plan = plan(BlockType::RespondOnCue, CueColour::Neutral, Congruency::Neutral, true);
    assert!(plan.response_required);

    let result = sequencer().run(&mut rig, &plan).unwrap();

    let premature = &result.response.premature;
    assert!(premature.premature_pressed);
    assert!(result.cue_hit());
    assert!(!result.cue_false_alarm());
    // probe shown 3 s after the settle flip
    assert_eq!(premature.premature_timing_ms, vec![-1000.0, -900.0]);
    assert_eq!(markers(&log)[0], "19");
}

#[test]
fn quit_during_rotation_wait_discards_the_trial() {
    let clock = SimulatedClock::new();
    let log = Log::default();
    let input = ScriptedInput::new(clock.clone(), [Key::Quit]);
    let mut rig = rig(&clock, &log, Duration::ZERO, input);
    let plan = plan(BlockType::RespondOnCue, CueColour::First, Congruency::Congruent, true);

    let err = sequencer().run(&mut rig, &plan).unwrap_err();

    assert_eq!(err, EngineError::Cancelled);
    assert_eq!(markers(&log), vec!["11", "21", "41"]);
    assert!(!markers(&log).iter().any(|m| m.starts_with('7')));
}

#[test]
fn quit_during_the_timeline_stops_at_the_next_wait() {
    let clock = SimulatedClock::new();
    let log = Log::default();
    let input = ScriptedInput::new(clock.clone(), Vec::new()).quit_at(Duration::from_millis(600));
    let mut rig = rig(&clock, &log, Duration::ZERO, input);
    let plan = plan(BlockType::RespondOffCue, CueColour::First, Congruency::Congruent, true);

    let err = sequencer().run(&mut rig, &plan).unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(markers(&log), vec!["111"]);
    assert_eq!(clock.now(), Duration::from_millis(750));
}
