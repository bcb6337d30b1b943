//! Mounting a rendered label on a larger output sheet

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::types::LabelImage;

use super::raster::{WHITE, fit_within};

/// Place `label` centered on a white `sheet_w` × `sheet_h` sheet.
///
/// A label larger than the sheet is shrunk (aspect kept, nearest neighbor so
/// bars and modules keep hard edges); a smaller label is never enlarged.
pub fn mount(label: &LabelImage, sheet_w: u32, sheet_h: u32) -> LabelImage {
    let mut sheet = RgbImage::from_pixel(sheet_w.max(1), sheet_h.max(1), WHITE);
    let src = label.as_rgb();

    let placed = if src.width() > sheet.width() || src.height() > sheet.height() {
        let (w, h) = fit_within(src.width(), src.height(), sheet.width(), sheet.height());
        imageops::resize(src, w, h, FilterType::Nearest)
    } else {
        src.clone()
    };

    let x = (sheet.width() - placed.width()) / 2;
    let y = (sheet.height() - placed.height()) / 2;
    imageops::replace(&mut sheet, &placed, x as i64, y as i64);
    LabelImage::from_rgb(sheet)
}
