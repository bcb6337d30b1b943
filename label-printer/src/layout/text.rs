//! Text measurement, shrink-to-fit sizing and glyph painting
//!
//! All sizes are whole pixels. Measurements use the ink bounding box of the
//! laid-out glyphs, so the same text, font and size always produce the same
//! extent and the same glyph placement.

use image::{Rgb, RgbImage};
use rusttype::{Font, Scale, point};

use crate::error::LabelError;
use crate::geometry::Region;

use super::raster::blend;

/// Smallest font size the shrink loop will go down to
pub const MIN_FONT_PX: u32 = 6;

const SANS: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const SANS_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
const MONO: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

/// Fonts used by the layout engine
pub struct FontSet {
    /// Item names and plain text labels
    pub name: Font<'static>,
    /// Item identifiers
    pub mono: Font<'static>,
    /// Badge text
    pub bold: Font<'static>,
}

impl FontSet {
    /// The fonts bundled with the crate
    pub fn embedded() -> Result<Self, LabelError> {
        Ok(Self {
            name: parse_static(SANS, "DejaVuSans")?,
            mono: parse_static(MONO, "DejaVuSansMono")?,
            bold: parse_static(SANS_BOLD, "DejaVuSans-Bold")?,
        })
    }
}

fn parse_static(bytes: &'static [u8], label: &str) -> Result<Font<'static>, LabelError> {
    Font::try_from_bytes(bytes).ok_or_else(|| LabelError::Font(label.to_string()))
}

/// Ink bounds of laid-out text, relative to a pen at (0, baseline 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextExtent {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl TextExtent {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }
}

/// Outcome of the shrink-to-fit loop for one text element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFit {
    /// Final font size in pixels
    pub size: u32,
    /// Measured ink width at `size`, stroke included
    pub width: u32,
    /// Measured ink height at `size`, stroke included
    pub height: u32,
    /// Number of measurements taken
    pub iterations: u32,
    /// The text still overflows at [`MIN_FONT_PX`]
    pub floor_reached: bool,
}

/// Measure the ink extent of `text` at `px`, grown by `stroke` on every side.
pub fn measure(font: &Font<'_>, text: &str, px: u32, stroke: u32) -> TextExtent {
    let scale = Scale::uniform(px as f32);
    let mut extent: Option<TextExtent> = None;

    for glyph in font.layout(text, scale, point(0.0, 0.0)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        extent = Some(match extent {
            None => TextExtent {
                min_x: bb.min.x,
                min_y: bb.min.y,
                max_x: bb.max.x,
                max_y: bb.max.y,
            },
            Some(e) => TextExtent {
                min_x: e.min_x.min(bb.min.x),
                min_y: e.min_y.min(bb.min.y),
                max_x: e.max_x.max(bb.max.x),
                max_y: e.max_y.max(bb.max.y),
            },
        });
    }

    let Some(mut e) = extent else {
        return TextExtent::default();
    };
    let s = stroke as i32;
    e.min_x -= s;
    e.min_y -= s;
    e.max_x += s;
    e.max_y += s;
    e
}

/// Find the largest size at or below `nominal` whose ink fits `max_width` × `max_height`.
///
/// Decrements one pixel at a time and stops at [`MIN_FONT_PX`], so it takes at
/// most `nominal - MIN_FONT_PX + 1` measurements.
pub fn shrink_to_fit(
    font: &Font<'_>,
    text: &str,
    nominal: u32,
    max_width: u32,
    max_height: u32,
    stroke: u32,
) -> TextFit {
    let mut size = nominal.max(MIN_FONT_PX);
    let mut iterations = 0;

    loop {
        let extent = measure(font, text, size, stroke);
        iterations += 1;

        let fits = extent.width() <= max_width && extent.height() <= max_height;
        if fits || size <= MIN_FONT_PX {
            return TextFit {
                size,
                width: extent.width(),
                height: extent.height(),
                iterations,
                floor_reached: !fits,
            };
        }
        size -= 1;
    }
}

/// Shrink `text` into `region` with no padding.
pub fn fit_region(
    font: &Font<'_>,
    text: &str,
    nominal: u32,
    region: Region,
    stroke: u32,
) -> TextFit {
    shrink_to_fit(font, text, nominal, region.width, region.height, stroke)
}

/// Paint `text` so its ink box is centered on (`cx`, `cy`).
///
/// A non-zero `stroke` thickens every glyph by repainting it at each offset
/// within the stroke radius. Pixels falling outside the canvas are clipped.
#[allow(clippy::too_many_arguments)]
pub fn draw_centered(
    canvas: &mut RgbImage,
    font: &Font<'_>,
    text: &str,
    px: u32,
    cx: f32,
    cy: f32,
    stroke: u32,
    color: Rgb<u8>,
) {
    let extent = measure(font, text, px, stroke);
    let ox = (cx - (extent.min_x + extent.max_x) as f32 / 2.0).round() as i32;
    let oy = (cy - (extent.min_y + extent.max_y) as f32 / 2.0).round() as i32;

    let scale = Scale::uniform(px as f32);
    let glyphs: Vec<_> = font.layout(text, scale, point(0.0, 0.0)).collect();
    let s = stroke as i32;
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);

    for dy in -s..=s {
        for dx in -s..=s {
            for glyph in &glyphs {
                let Some(bb) = glyph.pixel_bounding_box() else {
                    continue;
                };
                glyph.draw(|gx, gy, v| {
                    let x = ox + dx + bb.min.x + gx as i32;
                    let y = oy + dy + bb.min.y + gy as i32;
                    if x < 0 || y < 0 || x >= w || y >= h {
                        return;
                    }
                    blend(canvas.get_pixel_mut(x as u32, y as u32), color, v);
                });
            }
        }
    }
}
