//! ZPL command builder
//!
//! Provides a fluent API for building the ZPL II stream that prints one
//! rendered label as a graphic field.

use tracing::instrument;

use crate::types::LabelImage;

/// ZPL command builder
///
/// Starts the format with `^XA`; [`ZplBuilder::build`] closes it with `^XZ`.
pub struct ZplBuilder {
    buf: String,
}

impl ZplBuilder {
    pub fn new() -> Self {
        let mut buf = String::with_capacity(4096);
        buf.push_str("^XA");
        Self { buf }
    }

    // === Positioning ===

    /// Label home: offset of the whole format from the print head origin (dots)
    pub fn label_home(&mut self, x: u32, y: u32) -> &mut Self {
        self.buf.push_str(&format!("^LH{},{}", x, y));
        self
    }

    /// Field origin relative to label home (dots)
    pub fn field_origin(&mut self, x: u32, y: u32) -> &mut Self {
        self.buf.push_str(&format!("^FO{},{}", x, y));
        self
    }

    // === Graphics ===

    /// Graphic field (`^GFA`) holding `image` as 1-bit ASCII hex.
    ///
    /// Pixels that print dark become set bits; rows are padded to whole bytes.
    pub fn graphic(&mut self, image: &LabelImage) -> &mut Self {
        let bytes = pack_bits(image);
        let row_bytes = image.width().div_ceil(8);
        self.buf.push_str(&format!(
            "^GFA,{total},{total},{row_bytes},",
            total = bytes.len()
        ));
        self.buf.push_str(&hex::encode_upper(&bytes));
        self.buf.push_str("^FS");
        self
    }

    // === Print Control ===

    /// Print quantity for this format
    pub fn quantity(&mut self, n: u32) -> &mut Self {
        self.buf.push_str(&format!("^PQ{}", n.max(1)));
        self
    }

    // === Build ===

    pub fn build(mut self) -> Vec<u8> {
        self.buf.push_str("^XZ");
        self.buf.into_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

impl Default for ZplBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Full format for one label: home offset, graphic at the origin, one copy
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn encode_label(image: &LabelImage, home_x: u32, home_y: u32) -> Vec<u8> {
    let mut b = ZplBuilder::new();
    b.label_home(home_x, home_y)
        .field_origin(0, 0)
        .graphic(image)
        .quantity(1);
    b.build()
}

/// Row-major 1-bit packing, MSB first
fn pack_bits(image: &LabelImage) -> Vec<u8> {
    let (w, h) = (image.width(), image.height());
    let row_bytes = w.div_ceil(8);
    let mut out = Vec::with_capacity((row_bytes * h) as usize);

    for y in 0..h {
        for x_byte in 0..row_bytes {
            let mut byte = 0u8;
            for bit in 0..8 {
                let x = x_byte * 8 + bit;
                if x < w && image.is_dark(x, y) {
                    byte |= 1 << (7 - bit);
                }
            }
            out.push(byte);
        }
    }
    out
}
