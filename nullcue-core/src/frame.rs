use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn grey(level: u8) -> Rgb {
        Rgb(level, level, level)
    }
}

/// A drawable primitive. Coordinates are pixels relative to the screen centre, y up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle {
        centre: (f32, f32),
        radius: f32,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    },
    /// A filled rectangle rotated clockwise by `orientation_deg` around its centre.
    Bar {
        centre: (f32, f32),
        width: f32,
        height: f32,
        orientation_deg: f32,
        fill: Rgb,
    },
    Text {
        centre: (f32, f32),
        content: String,
        size_px: f32,
        colour: Rgb,
    },
}

/// Description of one full screen, handed to the display collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub background: Rgb,
    pub shapes: Vec<Shape>,
}

impl Frame {
    pub fn new(background: Rgb) -> Self {
        Self {
            background,
            shapes: Vec::new(),
        }
    }

    pub fn with(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// All text strings in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }
}
