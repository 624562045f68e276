#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use nullcue_core::{
    Display, EngineError, EventRecorder, Frame, InputDevice, Key, KeyEvent, Result, Shape,
};
use nullcue_experiment::Rig;
use nullcue_timing::{Clock, SimulatedClock};

/// What the collaborators saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Flip { bars: usize, texts: Vec<String> },
    Marker(String),
}

pub type Log = Rc<RefCell<Vec<Entry>>>;

pub fn markers(log: &Log) -> Vec<String> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Entry::Marker(m) => Some(m.clone()),
            _ => None,
        })
        .collect()
}

pub fn last_texts(log: &Log) -> Vec<String> {
    log.borrow()
        .iter()
        .rev()
        .find_map(|e| match e {
            Entry::Flip { texts, .. } => Some(texts.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Screen that flips instantly or after a fixed refresh period, optionally
/// charging a preparation cost for every draw.
pub struct ScriptedDisplay {
    clock: SimulatedClock,
    log: Log,
    period: Duration,
    draw_cost: Duration,
    pending: Option<Frame>,
}

impl ScriptedDisplay {
    pub fn new(clock: SimulatedClock, log: Log, period: Duration) -> Self {
        Self {
            clock,
            log,
            period,
            draw_cost: Duration::ZERO,
            pending: None,
        }
    }

    pub fn with_draw_cost(mut self, cost: Duration) -> Self {
        self.draw_cost = cost;
        self
    }
}

impl Display for ScriptedDisplay {
    fn draw(&mut self, frame: &Frame) -> Result<()> {
        self.clock.advance(self.draw_cost);
        self.pending = Some(frame.clone());
        Ok(())
    }

    fn flip(&mut self) -> Result<Duration> {
        let frame = self
            .pending
            .take()
            .ok_or_else(|| EngineError::Device("flip without a drawn frame".into()))?;
        self.clock.advance(self.period);
        let bars = frame
            .shapes
            .iter()
            .filter(|s| matches!(s, Shape::Bar { .. }))
            .count();
        let texts = frame.texts().map(str::to_string).collect();
        self.log.borrow_mut().push(Entry::Flip { bars, texts });
        Ok(self.clock.now())
    }
}

/// Keyboard answering waits from a script.
///
/// Each rotation press is held for the next count from `holds`. Presses the
/// current wait does not accept are buffered.
pub struct ScriptedInput {
    clock: SimulatedClock,
    presses: VecDeque<Key>,
    holds: VecDeque<u32>,
    held: Option<(Key, u32)>,
    buffered: Vec<KeyEvent>,
    quit_at: Option<Duration>,
}

impl ScriptedInput {
    pub fn new(clock: SimulatedClock, presses: impl IntoIterator<Item = Key>) -> Self {
        Self {
            clock,
            presses: presses.into_iter().collect(),
            holds: VecDeque::new(),
            held: None,
            buffered: Vec::new(),
            quit_at: None,
        }
    }

    pub fn with_holds(mut self, holds: impl IntoIterator<Item = u32>) -> Self {
        self.holds = holds.into_iter().collect();
        self
    }

    /// Presses waiting in the buffer before the first wait.
    pub fn with_buffered(mut self, events: impl IntoIterator<Item = KeyEvent>) -> Self {
        self.buffered = events.into_iter().collect();
        self
    }

    /// Quit counts as pressed from `at` on.
    pub fn quit_at(mut self, at: Duration) -> Self {
        self.quit_at = Some(at);
        self
    }

    pub fn remaining(&self) -> usize {
        self.presses.len()
    }
}

impl InputDevice for ScriptedInput {
    fn wait_for_keys(&mut self, keys: &[Key]) -> Result<KeyEvent> {
        if let Some(i) = self.buffered.iter().position(|e| keys.contains(&e.key)) {
            return Ok(self.buffered.remove(i));
        }
        let key = loop {
            let key = self
                .presses
                .pop_front()
                .ok_or_else(|| EngineError::Device("input script exhausted".into()))?;
            if keys.contains(&key) {
                break key;
            }
            // presses nobody waits for stay in the buffer, like on a real keyboard
            self.buffered.push(KeyEvent::new(key, self.clock.now()));
        };
        if matches!(key, Key::Clockwise | Key::CounterClockwise) {
            self.held = Some((key, self.holds.pop_front().unwrap_or(0)));
        }
        Ok(KeyEvent::new(key, self.clock.now()))
    }

    fn take_events(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.buffered)
    }

    fn clear_events(&mut self) {
        self.buffered.clear();
    }

    fn is_held(&mut self, key: Key) -> bool {
        match &mut self.held {
            Some((held, left)) if *held == key && *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    fn cancel_requested(&mut self) -> bool {
        self.quit_at.is_some_and(|at| self.clock.now() >= at)
            || self.buffered.iter().any(|e| e.key == Key::Quit)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecorderCalls {
    pub calibrations: usize,
    pub starts: usize,
    pub stops: usize,
}

pub struct LoggingRecorder {
    log: Log,
    pub calls: Rc<RefCell<RecorderCalls>>,
}

impl LoggingRecorder {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            calls: Rc::default(),
        }
    }
}

impl EventRecorder for LoggingRecorder {
    fn send_marker(&mut self, marker: &str) -> Result<()> {
        self.log.borrow_mut().push(Entry::Marker(marker.to_string()));
        Ok(())
    }

    fn calibrate(&mut self) -> Result<()> {
        self.calls.borrow_mut().calibrations += 1;
        Ok(())
    }

    fn start_recording(&mut self) -> Result<()> {
        self.calls.borrow_mut().starts += 1;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.calls.borrow_mut().stops += 1;
        Ok(())
    }
}

pub type TestRig = Rig<ScriptedDisplay, ScriptedInput, LoggingRecorder, SimulatedClock>;

pub fn rig(clock: &SimulatedClock, log: &Log, period: Duration, input: ScriptedInput) -> TestRig {
    Rig::new(
        ScriptedDisplay::new(clock.clone(), log.clone(), period),
        input,
        LoggingRecorder::new(log.clone()),
        clock.clone(),
    )
}
