//! Inventory label types

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{LabelError, SubmitError};

/// Stand-in for blank operator input
pub const PLACEHOLDER: &str = "<Mangler>";

/// An inventory tag: identifier plus human-readable name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
}

impl InventoryItem {
    /// Construct as-is; empty strings are allowed and render as empty text
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Trim operator input and replace blank fields with [`PLACEHOLDER`]
    pub fn from_input(id: &str, name: &str) -> Self {
        Self::new(sanitize(id), sanitize(name))
    }
}

fn sanitize(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Visual style of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// QR code of the id, name and id text, badge
    #[default]
    Qr,
    /// Code 128 barcode of the id with a caption, badge
    Barcode,
    /// Name only, one line
    Text,
    /// Id and name on two lines
    #[serde(rename = "text_2_lines")]
    TextTwoLine,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Qr,
        Variant::Barcode,
        Variant::Text,
        Variant::TextTwoLine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Qr => "qr",
            Variant::Barcode => "barcode",
            Variant::Text => "text",
            Variant::TextTwoLine => "text_2_lines",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qr" => Ok(Variant::Qr),
            "barcode" => Ok(Variant::Barcode),
            "text" => Ok(Variant::Text),
            "text_2_lines" | "text-2-lines" | "text_two_line" | "text-two-line" => {
                Ok(Variant::TextTwoLine)
            }
            other => Err(SubmitError::UnknownVariant(other.to_string())),
        }
    }
}

/// Rendered label raster (opaque RGB, fixed size per deployment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelImage {
    pixels: RgbImage,
}

impl LabelImage {
    /// Blank white canvas
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
        }
    }

    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    pub(crate) fn as_rgb_mut(&mut self) -> &mut RgbImage {
        &mut self.pixels
    }

    pub fn into_rgb(self) -> RgbImage {
        self.pixels
    }

    /// Raw RGB bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Whether the pixel is dark enough to print black
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        let p = self.pixels.get_pixel(x, y);
        luminance(p) < 128
    }

    /// Number of pixels that print black
    pub fn dark_pixels(&self) -> usize {
        self.pixels.pixels().filter(|p| luminance(p) < 128).count()
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, LabelError> {
        let mut out = Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

pub(crate) fn luminance(p: &Rgb<u8>) -> u8 {
    (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) as u8
}

/// One physical print, owned by the queue until dispatched or dropped
#[derive(Debug, Clone)]
pub struct PrintJob {
    /// Sequence number assigned by the queue on enqueue (0 until then)
    pub id: u64,
    pub image: Arc<LabelImage>,
    pub submitted_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(image: Arc<LabelImage>) -> Self {
        Self {
            id: 0,
            image,
            submitted_at: Utc::now(),
        }
    }
}
