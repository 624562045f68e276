use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{ensure, Context, Result};
use nullcue_core::{Frame, Rgb, Shape};
use nullcue_timing::{Clock, HighPrecisionClock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8, Rect, Stroke,
    Transform,
};

/// Text wider than this share of the canvas is wrapped at word boundaries.
const WRAP_FRACTION: f32 = 0.8;

pub fn load_font(path: impl AsRef<Path>) -> Result<FontVec> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontVec::try_from_vec(bytes).with_context(|| format!("parsing font {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TextKey {
    content: String,
    size_bits: u32,
    colour: Rgb,
    wrap_bits: u32,
}

struct TextCache {
    font: FontVec,
    map: HashMap<TextKey, Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: FontVec) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, content: &str, size_px: f32, colour: Rgb, wrap: f32) -> Option<Arc<Pixmap>> {
        let key = TextKey {
            content: content.to_string(),
            size_bits: size_px.to_bits(),
            colour,
            wrap_bits: wrap.to_bits(),
        };
        if let Some(p) = self.map.get(&key) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(content, size_px, &self.font, colour, wrap)?);
        self.map.insert(key, Arc::clone(&pm));
        Some(pm)
    }
}

/// Greedy word wrap; explicit newlines always break.
fn wrap_lines<F: Font>(font: &F, scale: PxScale, text: &str, max_width: f32) -> Vec<String> {
    let sf = font.as_scaled(scale);
    let width = |s: &str| s.chars().map(|c| sf.h_advance(font.glyph_id(c))).sum::<f32>();

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if !line.is_empty() && width(&candidate) > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    lines
}

/// Rasterises `text` into a tight transparent pixmap, lines centred on each other.
/// Returns `None` when nothing in the text has an outline.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    colour: Rgb,
    max_width: f32,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);
    let line_height = sf.height() + sf.line_gap();

    // 1) Lay out each line with its baseline at ascent
    let mut lines: Vec<(Vec<Glyph>, f32)> = Vec::new();
    for (row, line) in wrap_lines(font, scale, text, max_width).iter().enumerate() {
        let baseline = sf.ascent() + row as f32 * line_height;
        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::<Glyph>::new();
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = glyphs.last() {
                pen_x += sf.kern(prev.id, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, baseline),
            });
            pen_x += sf.h_advance(id);
        }
        lines.push((glyphs, pen_x));
    }
    let widest = lines.iter().map(|(_, w)| *w).fold(0.0f32, f32::max);
    let glyphs: Vec<Glyph> = lines
        .into_iter()
        .flat_map(|(glyphs, w)| {
            let shift = (widest - w) * 0.5;
            glyphs.into_iter().map(move |mut g| {
                g.position.x += shift;
                g
            })
        })
        .collect();

    // 2) Union pixel bounds from outlined glyphs
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }
    if min_x == f32::INFINITY {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;

    // 3) Transparent premultiplied pixmap
    let mut pm = Pixmap::new(w, h)?;
    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();
    let Rgb(cr, cg, cb) = colour;

    // 4) Coverage blended source-over
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            out.draw(|x, y, cov| {
                if cov <= f32::EPSILON {
                    return;
                }
                let ix = (x as f32 + b.min.x - min_x).floor() as i32;
                let iy = (y as f32 + b.min.y - min_y).floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;
                let Some(bg) = dst.get(i).copied() else {
                    return;
                };

                let a = cov.clamp(0.0, 1.0);
                let sa = (a * 255.0) as u8;
                let inv = 1.0 - (sa as f32 / 255.0);
                let r = ((cr as f32 * a) as u8).saturating_add((bg.red() as f32 * inv) as u8);
                let g = ((cg as f32 * a) as u8).saturating_add((bg.green() as f32 * inv) as u8);
                let b = ((cb as f32 * a) as u8).saturating_add((bg.blue() as f32 * inv) as u8);
                let alpha = sa.saturating_add((bg.alpha() as f32 * inv) as u8);

                if let Some(px) = PremultipliedColorU8::from_rgba(r, g, b, alpha) {
                    dst[i] = px;
                }
            });
        }
    }

    Some(pm)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub clear: Duration,
    pub shapes: Duration,
    pub text: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub shape_count: usize,
    /// Text shapes dropped because no font is loaded.
    pub texts_skipped: usize,
}

/// Software rasteriser for [`Frame`]s into an RGBA8 buffer.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    canvas: Pixmap,
    text_cache: Option<TextCache>,
    clock: HighPrecisionClock,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Result<Self> {
        let canvas = Pixmap::new(width, height).context("canvas size must be non-zero")?;
        Ok(SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            canvas,
            text_cache: font.map(TextCache::new),
            clock: HighPrecisionClock::new(),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width, new_height).context("canvas size must be non-zero")?;
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        Ok(())
    }

    /// Draws `frame` from scratch and copies the result into `frame_buffer`.
    pub fn render_frame(&mut self, frame: &Frame, frame_buffer: &mut [u8]) -> Result<FrameStats> {
        ensure!(
            frame_buffer.len() == self.canvas.data().len(),
            "frame buffer holds {} bytes, canvas {}x{} needs {}",
            frame_buffer.len(),
            self.width,
            self.height,
            self.canvas.data().len()
        );
        let start = self.clock.now();

        self.canvas.fill(color(frame.background));
        let t_clear = self.clock.elapsed(start);

        let mut t_text = Duration::ZERO;
        let mut texts_skipped = 0;
        for shape in &frame.shapes {
            match shape {
                Shape::Circle {
                    centre,
                    radius,
                    fill,
                    stroke,
                } => self.draw_circle(*centre, *radius, *fill, *stroke),
                Shape::Bar {
                    centre,
                    width,
                    height,
                    orientation_deg,
                    fill,
                } => self.draw_bar(*centre, (*width, *height), *orientation_deg, *fill),
                Shape::Text {
                    centre,
                    content,
                    size_px,
                    colour,
                } => {
                    let t = self.clock.now();
                    if !self.draw_text(*centre, content, *size_px, *colour) {
                        texts_skipped += 1;
                    }
                    t_text += self.clock.elapsed(t);
                }
            }
        }
        let t_shapes = self.clock.elapsed(start).saturating_sub(t_clear + t_text);

        let t = self.clock.now();
        frame_buffer.copy_from_slice(self.canvas.data());
        let t_copy = self.clock.elapsed(t);

        Ok(FrameStats {
            clear: t_clear,
            shapes: t_shapes,
            text: t_text,
            copy: t_copy,
            total: self.clock.elapsed(start),
            shape_count: frame.shapes.len(),
            texts_skipped,
        })
    }

    /// Centre-relative, y-up coordinates to canvas pixels.
    fn to_canvas(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.center.0 + x, self.center.1 - y)
    }

    fn draw_circle(&mut self, centre: (f32, f32), radius: f32, fill: Option<Rgb>, stroke: Option<(Rgb, f32)>) {
        let (cx, cy) = self.to_canvas(centre);
        let Some(path) = PathBuilder::from_circle(cx, cy, radius) else {
            return;
        };
        if let Some(fill) = fill {
            let paint = paint(fill);
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
        if let Some((colour, width)) = stroke {
            let paint = paint(colour);
            let stroke = Stroke {
                width,
                ..Stroke::default()
            };
            self.canvas
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    /// Bars rotate clockwise on screen, which is a positive angle in y-down space.
    fn draw_bar(&mut self, centre: (f32, f32), (w, h): (f32, f32), orientation_deg: f32, fill: Rgb) {
        let (cx, cy) = self.to_canvas(centre);
        let Some(rect) = Rect::from_xywh(cx - w * 0.5, cy - h * 0.5, w, h) else {
            return;
        };
        let transform = Transform::from_rotate_at(orientation_deg, cx, cy);
        self.canvas.fill_rect(rect, &paint(fill), transform, None);
    }

    fn draw_text(&mut self, centre: (f32, f32), content: &str, size_px: f32, colour: Rgb) -> bool {
        let wrap = self.width as f32 * WRAP_FRACTION;
        let (cx, cy) = self.to_canvas(centre);
        let Some(cache) = self.text_cache.as_mut() else {
            return false;
        };
        if content.trim().is_empty() {
            return true;
        }
        let Some(pm) = cache.get_or_render(content, size_px, colour, wrap) else {
            return true;
        };
        let x = (cx - pm.width() as f32 * 0.5).round() as i32;
        let y = (cy - pm.height() as f32 * 0.5).round() as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            Pixmap::as_ref(&pm),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        true
    }
}

fn color(Rgb(r, g, b): Rgb) -> Color {
    Color::from_rgba8(r, g, b, 255)
}

fn paint(fill: Rgb) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color(fill));
    paint.anti_alias = true;
    paint
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: u32 = 200;
    const H: u32 = 100;

    fn pixel(buf: &[u8], x: u32, y: u32) -> [u8; 4] {
        let i = ((y * W + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    fn render(frame: &Frame) -> (Vec<u8>, FrameStats) {
        let mut r = SkiaRenderer::new(W, H, None).unwrap();
        let mut buf = vec![0u8; (W * H * 4) as usize];
        let stats = r.render_frame(frame, &mut buf).unwrap();
        (buf, stats)
    }

    #[test]
    fn background_fills_the_buffer() {
        let (buf, stats) = render(&Frame::new(Rgb::grey(127)));
        assert_eq!(pixel(&buf, 0, 0), [127, 127, 127, 255]);
        assert_eq!(pixel(&buf, W - 1, H - 1), [127, 127, 127, 255]);
        assert_eq!(stats.shape_count, 0);
    }

    #[test]
    fn circle_is_centred_and_y_points_up() {
        let blue = Rgb(19, 146, 206);
        let frame = Frame::new(Rgb::BLACK).with(Shape::Circle {
            centre: (0.0, 20.0),
            radius: 8.0,
            fill: Some(blue),
            stroke: None,
        });
        let (buf, _) = render(&frame);
        assert_eq!(pixel(&buf, W / 2, H / 2 - 20), [19, 146, 206, 255]);
        assert_eq!(pixel(&buf, W / 2, H / 2 + 20), [0, 0, 0, 255]);
    }

    #[test]
    fn quarter_turn_lays_the_bar_flat() {
        let frame = Frame::new(Rgb::BLACK).with(Shape::Bar {
            centre: (0.0, 0.0),
            width: 4.0,
            height: 60.0,
            orientation_deg: 90.0,
            fill: Rgb::WHITE,
        });
        let (buf, _) = render(&frame);
        assert_eq!(pixel(&buf, W / 2 + 20, H / 2), [255, 255, 255, 255]);
        assert_eq!(pixel(&buf, W / 2, H / 2 + 20), [0, 0, 0, 255]);
    }

    #[test]
    fn text_without_font_is_skipped() {
        let frame = Frame::new(Rgb::BLACK).with(Shape::Text {
            centre: (0.0, 0.0),
            content: "87".into(),
            size_px: 22.0,
            colour: Rgb::WHITE,
        });
        let (buf, stats) = render(&frame);
        assert_eq!(stats.texts_skipped, 1);
        assert_eq!(pixel(&buf, W / 2, H / 2), [0, 0, 0, 255]);
    }

    #[test]
    fn mismatched_buffer_is_an_error() {
        let mut r = SkiaRenderer::new(W, H, None).unwrap();
        let mut buf = vec![0u8; 16];
        assert!(r.render_frame(&Frame::new(Rgb::BLACK), &mut buf).is_err());
        r.resize(2, 2).unwrap();
        assert!(r.render_frame(&Frame::new(Rgb::BLACK), &mut buf).is_ok());
    }
}
