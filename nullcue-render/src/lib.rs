pub mod render;

pub use ab_glyph::FontVec;
pub use render::{load_font, render_text_pixmap, FrameStats, SkiaRenderer};
