//! Frame construction. The scene owns every size and colour used on screen and
//! is built once per session; frames are plain values produced from it.

use nullcue_core::{BlockType, Frame, Rgb, Shape, StimulusCharacteristics};

use crate::config::Monitor;

// visual angles, degrees
const ECCENTRICITY: f64 = 6.0;
const DOT_SIZE: f64 = 0.1;
const TOTAL_DOT_SIZE: f64 = 0.35;
const BAR_SIZE: [f64; 2] = [0.6, 4.0];
const RESPONSE_DIAL_SIZE: f64 = 2.0;
const BLOCK_SIGNAL_OFFSET: f64 = 7.0;
const FEEDBACK_OFFSET: f64 = 0.7;
const PRACTICE_FEEDBACK_OFFSET: f64 = 0.5;
const DIAL_LINE_WIDTH: f64 = 0.1;

const BACKGROUND: Rgb = Rgb(127, 127, 127);
const DOT_COLOUR: Rgb = Rgb(234, 234, 234);
const DIAL_COLOUR: Rgb = Rgb(212, 212, 212);
const SIGNAL_COLOUR: Rgb = Rgb(153, 153, 153);
const TEXT_SIZE_PX: f32 = 22.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    eccentricity: f32,
    dot_radius: f32,
    outer_dot_radius: f32,
    bar_size: (f32, f32),
    dial_radius: f32,
    handle_radius: f32,
    dial_line_width: f32,
    signal_offset: f32,
    feedback_offset: f32,
    practice_feedback_offset: f32,
}

impl Scene {
    pub fn new(monitor: &Monitor) -> Self {
        let px = |deg: f64| monitor.deg2pix(deg);
        Self {
            eccentricity: px(ECCENTRICITY),
            dot_radius: px(DOT_SIZE),
            outer_dot_radius: px(TOTAL_DOT_SIZE),
            bar_size: (px(BAR_SIZE[0]), px(BAR_SIZE[1])),
            dial_radius: px(RESPONSE_DIAL_SIZE),
            handle_radius: px(RESPONSE_DIAL_SIZE / 15.0),
            dial_line_width: px(DIAL_LINE_WIDTH).max(1.0),
            signal_offset: px(BLOCK_SIGNAL_OFFSET),
            feedback_offset: px(FEEDBACK_OFFSET),
            practice_feedback_offset: px(PRACTICE_FEEDBACK_OFFSET),
        }
    }

    pub fn blank(&self) -> Frame {
        Frame::new(BACKGROUND)
    }

    /// Fixation dot with an optionally recoloured outer ring and the block reminder.
    pub fn fixation(&self, cue: Option<Rgb>, block: Option<BlockType>) -> Frame {
        let mut frame = self.blank();
        self.push_fixation(&mut frame, cue.unwrap_or(DOT_COLOUR), block);
        frame
    }

    pub fn stimuli(&self, stimulus: &StimulusCharacteristics, block: Option<BlockType>) -> Frame {
        let mut frame = self.fixation(None, block);
        let [left_colour, right_colour] = stimulus.stimuli_colours;
        frame.push(self.bar(
            -self.eccentricity,
            stimulus.left_orientation as f32,
            left_colour.rgb(),
        ));
        frame.push(self.bar(
            self.eccentricity,
            stimulus.right_orientation as f32,
            right_colour.rgb(),
        ));
        frame
    }

    pub fn capture_cue(&self, colour: Rgb, block: Option<BlockType>) -> Frame {
        self.fixation(Some(colour), block)
    }

    /// Fixation plus the empty dial ring in the probed colour.
    pub fn probe_cue(&self, colour: Rgb, block: Option<BlockType>) -> Frame {
        let mut frame = self.fixation(None, block);
        frame.push(self.dial_ring(Some(colour)));
        frame
    }

    /// Dial with its two handles rotated clockwise by `angle_rad` from vertical.
    ///
    /// With a `practice_bar` orientation the bar is drawn at the centre instead of
    /// the fixation dot.
    pub fn dial(
        &self,
        colour: Option<Rgb>,
        angle_rad: f64,
        block: Option<BlockType>,
        practice_bar: Option<i32>,
    ) -> Frame {
        let mut frame = self.blank();
        match practice_bar {
            Some(orientation) => frame.push(self.bar(0.0, orientation as f32, DOT_COLOUR)),
            None => self.push_fixation(&mut frame, DOT_COLOUR, block),
        }
        frame.push(self.dial_ring(colour));
        let (x, y) = handle_position(self.dial_radius, angle_rad);
        for centre in [(x, y), (-x, -y)] {
            frame.push(Shape::Circle {
                centre,
                radius: self.handle_radius,
                fill: Some(BACKGROUND),
                stroke: Some((DOT_COLOUR, self.dial_line_width)),
            });
        }
        frame
    }

    pub fn feedback(&self, performance: i32, block: Option<BlockType>) -> Frame {
        let mut frame = self.fixation(None, block);
        frame.push(self.text(performance.to_string(), (0.0, self.feedback_offset)));
        frame
    }

    pub fn practice_feedback(&self, performance: i32) -> Frame {
        let mut frame = self.fixation(None, None);
        frame.push(self.text(performance.to_string(), (0.0, self.practice_feedback_offset)));
        frame
    }

    /// Instruction or break screen.
    pub fn message(&self, text: impl Into<String>) -> Frame {
        self.blank().with(self.text(text.into(), (0.0, 0.0)))
    }

    fn push_fixation(&self, frame: &mut Frame, outer: Rgb, block: Option<BlockType>) {
        frame.push(Shape::Circle {
            centre: (0.0, 0.0),
            radius: self.outer_dot_radius,
            fill: Some(outer),
            stroke: None,
        });
        frame.push(Shape::Circle {
            centre: (0.0, 0.0),
            radius: self.dot_radius,
            fill: Some(Rgb::BLACK),
            stroke: None,
        });
        if let Some(block) = block {
            frame.push(Shape::Text {
                centre: (self.signal_offset, -self.signal_offset),
                content: block.signal().to_string(),
                size_px: TEXT_SIZE_PX,
                colour: SIGNAL_COLOUR,
            });
        }
    }

    fn bar(&self, x: f32, orientation: f32, fill: Rgb) -> Shape {
        Shape::Bar {
            centre: (x, 0.0),
            width: self.bar_size.0,
            height: self.bar_size.1,
            orientation_deg: orientation,
            fill,
        }
    }

    fn dial_ring(&self, colour: Option<Rgb>) -> Shape {
        Shape::Circle {
            centre: (0.0, 0.0),
            radius: self.dial_radius,
            fill: None,
            stroke: Some((colour.unwrap_or(DIAL_COLOUR), self.dial_line_width)),
        }
    }

    fn text(&self, content: String, centre: (f32, f32)) -> Shape {
        Shape::Text {
            centre,
            content,
            size_px: TEXT_SIZE_PX,
            colour: Rgb::WHITE,
        }
    }
}

/// Top handle position after rotating clockwise by `angle_rad` (y up).
fn handle_position(radius: f32, angle_rad: f64) -> (f32, f32) {
    let r = radius as f64;
    ((r * angle_rad.sin()) as f32, (r * angle_rad.cos()) as f32)
}
