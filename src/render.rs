//! Overlay rendering.
//!
//! A render pass copies the source image onto a fresh surface, lays out every
//! stroke and caption in an `OverlayPlan`, then rasterizes the whole plan in one
//! batch. Nothing here is random: the same detections on the same source always
//! produce the same pixels.

use std::path::Path;
use std::time::Instant;

use ab_glyph::{Font, FontArc, ScaleFont};
use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::error::{OverlayError, OverlayResult};
use crate::geometry::{ImageSize, PixelBox};
use crate::labels::Color;
use crate::resolve::Detection;

static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

pub const DEFAULT_STROKE_WIDTH: f64 = 9.0;
pub const DEFAULT_TEXT_OFFSET_RATIO: f64 = 0.01;
pub const DEFAULT_FONT_SCALE_RATIO: f64 = 0.1;

/// Smallest caption size actually rasterized, in pixels.
const MIN_FONT_PX: f32 = 1.0;

/// Where stroke and caption colors come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeMode {
    /// Each detection's resolved palette color.
    PerLabel,
    /// One color for every box.
    Fixed(Color),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderStyle {
    /// Stroke width in pixels, centered on the box edge.
    pub stroke_width: f64,
    /// Caption offset from the box corner, as a fraction of image width.
    pub text_offset_ratio: f64,
    /// Caption size as a fraction of box width.
    pub font_scale_ratio: f64,
    pub stroke_mode: StrokeMode,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            stroke_width: DEFAULT_STROKE_WIDTH,
            text_offset_ratio: DEFAULT_TEXT_OFFSET_RATIO,
            font_scale_ratio: DEFAULT_FONT_SCALE_RATIO,
            stroke_mode: StrokeMode::PerLabel,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub rect: PixelBox,
    pub color: Color,
}

/// Caption laid out inside a box-sized text rect starting at (`x`, `y`).
///
/// `lines` is `text` word-wrapped to the box width. Lines that would extend
/// below the box height are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct Caption {
    pub text: String,
    pub lines: Vec<String>,
    pub x: f64,
    pub y: f64,
    /// Font size in pixels.
    pub scale: f32,
    /// Vertical advance between lines, in pixels.
    pub line_height: f32,
    pub color: Color,
}

/// Everything one render pass draws.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayPlan {
    pub strokes: Vec<Stroke>,
    pub captions: Vec<Caption>,
}

/// Caption text: label and confidence as a whole percentage.
pub fn caption_text(label: &str, confidence: f32) -> String {
    format!("{} : {}", label, (confidence * 100.0).round() as i64)
}

pub struct OverlayRenderer {
    style: RenderStyle,
    font: FontArc,
}

impl OverlayRenderer {
    /// Renderer using the bundled bold sans-serif font.
    pub fn new(style: RenderStyle) -> Result<Self> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|e| anyhow!("bundled font is invalid: {}", e))?;
        Ok(Self::with_font(style, font))
    }

    pub fn with_font(style: RenderStyle, font: FontArc) -> Self {
        Self { style, font }
    }

    pub fn with_font_file(style: RenderStyle, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))?;
        Ok(Self::with_font(style, font))
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    fn color_for(&self, detection: &Detection) -> Color {
        match self.style.stroke_mode {
            StrokeMode::PerLabel => detection.color,
            StrokeMode::Fixed(color) => color,
        }
    }

    fn line_height(&self, scale: f32) -> f32 {
        let scaled = self.font.as_scaled(scale);
        scaled.height() + scaled.line_gap()
    }

    fn text_width(&self, text: &str, scale: f32) -> f64 {
        f64::from(text_size(scale, &self.font, text).0)
    }

    /// Word-wrap `text` to `max_width`, breaking inside a word only when the
    /// word alone is wider than the rect. Keeps as many lines as fit in
    /// `max_height`.
    fn wrap(
        &self,
        text: &str,
        scale: f32,
        line_height: f32,
        max_width: f64,
        max_height: f64,
    ) -> Vec<String> {
        if !(max_width > 0.0 && max_height > 0.0 && line_height > 0.0) {
            return Vec::new();
        }
        let fits = |line: &str| self.text_width(line, scale) <= max_width;

        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                let mut next = current.clone();
                next.push(ch);
                if current.is_empty() || fits(&next) {
                    current = next;
                } else {
                    lines.push(std::mem::replace(&mut current, ch.to_string()));
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }

        let max_lines = (max_height / f64::from(line_height)).floor() as usize;
        lines.truncate(max_lines);
        lines
    }

    /// Lay out one stroke per detection and one caption per labeled detection.
    pub fn plan(&self, detections: &[Detection], size: ImageSize) -> OverlayPlan {
        let offset = f64::from(size.width) * self.style.text_offset_ratio;
        let mut plan = OverlayPlan {
            strokes: Vec::with_capacity(detections.len()),
            captions: Vec::new(),
        };
        for detection in detections {
            let color = self.color_for(detection);
            let rect = detection.pixel_box;
            plan.strokes.push(Stroke { rect, color });
            if let Some(label) = &detection.label {
                let text = caption_text(label, detection.confidence);
                let scale = ((rect.width * self.style.font_scale_ratio) as f32).max(MIN_FONT_PX);
                let line_height = self.line_height(scale);
                let lines = self.wrap(&text, scale, line_height, rect.width, rect.height);
                plan.captions.push(Caption {
                    text,
                    lines,
                    x: rect.min_x() + offset,
                    y: rect.min_y() + offset,
                    scale,
                    line_height,
                    color,
                });
            }
        }
        plan
    }

    /// Draw `detections` onto a copy of `source`.
    ///
    /// The result always has the source's dimensions. A surface that cannot be
    /// created or finalized fails this frame with `RenderSurfaceFailure`.
    pub fn render(&self, source: &RgbaImage, detections: &[Detection]) -> OverlayResult<RgbaImage> {
        let start = Instant::now();
        let size = ImageSize::of(source);
        let mut surface = create_surface(source)?;

        let plan = self.plan(detections, size);
        for stroke in &plan.strokes {
            stroke_rect(&mut surface, &stroke.rect, self.style.stroke_width, stroke.color);
        }
        for caption in &plan.captions {
            for (i, line) in caption.lines.iter().enumerate() {
                let y = caption.y + f64::from(caption.line_height) * i as f64;
                draw_text_mut(
                    &mut surface,
                    caption.color.to_rgba(),
                    caption.x.round() as i32,
                    y.round() as i32,
                    caption.scale,
                    &self.font,
                    line,
                );
            }
        }

        if ImageSize::of(&surface) != size {
            return Err(OverlayError::RenderSurfaceFailure {
                reason: "surface size changed while drawing".to_string(),
            });
        }
        log::debug!(
            "rendered {} boxes, {} captions in {:?}",
            plan.strokes.len(),
            plan.captions.len(),
            start.elapsed()
        );
        Ok(surface)
    }
}

fn create_surface(source: &RgbaImage) -> OverlayResult<RgbaImage> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(OverlayError::RenderSurfaceFailure {
            reason: format!("cannot draw on a {}x{} image", width, height),
        });
    }
    RgbaImage::from_raw(width, height, source.as_raw().clone()).ok_or_else(|| {
        OverlayError::RenderSurfaceFailure {
            reason: format!("pixel buffer does not match {}x{}", width, height),
        }
    })
}

/// Stroke the outline of `rect`, `width` pixels wide, centered on its edges.
///
/// Parts outside the surface are clipped by the fill.
fn stroke_rect(surface: &mut RgbaImage, rect: &PixelBox, width: f64, color: Color) {
    let lw = width.round().max(1.0);
    let half = lw / 2.0;
    let left = (rect.min_x() - half).round();
    let top = (rect.min_y() - half).round();
    let right = (rect.max_x().max(rect.min_x()) + half).round();
    let bottom = (rect.max_y().max(rect.min_y()) + half).round();
    let outer_w = (right - left).max(lw);
    let outer_h = (bottom - top).max(lw);
    let inner_h = outer_h - 2.0 * lw;

    let mut bands = vec![
        band(left, top, outer_w, lw),
        band(left, top + outer_h - lw, outer_w, lw),
    ];
    if inner_h >= 1.0 {
        bands.push(band(left, top + lw, lw, inner_h));
        bands.push(band(left + outer_w - lw, top + lw, lw, inner_h));
    }

    let pixel = color.to_rgba();
    for band in bands {
        draw_filled_rect_mut(surface, band, pixel);
    }
}

fn band(x: f64, y: f64, w: f64, h: f64) -> Rect {
    Rect::at(x as i32, y as i32).of_size((w as u32).max(1), (h as u32).max(1))
}
