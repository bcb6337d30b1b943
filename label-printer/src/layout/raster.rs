//! Pixel-level painting helpers shared by the label elements

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::geometry::Region;

pub(crate) const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub(crate) const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Mix `color` into `dst` with coverage `v` (0.0 ..= 1.0)
pub(crate) fn blend(dst: &mut Rgb<u8>, color: Rgb<u8>, v: f32) {
    let v = v.clamp(0.0, 1.0);
    let inv = 1.0 - v;
    for c in 0..3 {
        dst.0[c] = (color.0[c] as f32 * v + dst.0[c] as f32 * inv).round() as u8;
    }
}

/// Fill `region` (clipped to the canvas) with a solid color
pub(crate) fn fill(canvas: &mut RgbImage, region: Region, color: Rgb<u8>) {
    let x_end = (region.x + region.width).min(canvas.width());
    let y_end = (region.y + region.height).min(canvas.height());
    for y in region.y..y_end {
        for x in region.x..x_end {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Paint a one-bit grid (`cols` × `rows` cells, row-major, `true` = dark)
/// into `target` with nearest-neighbor scaling, so cell edges stay hard.
pub(crate) fn blit_cells_nearest(
    canvas: &mut RgbImage,
    cells: &[bool],
    cols: usize,
    rows: usize,
    target: Region,
) {
    if cols == 0 || rows == 0 || target.width == 0 || target.height == 0 {
        return;
    }
    let tw = target.width as usize;
    let th = target.height as usize;
    for py in 0..th {
        let row = py * rows / th;
        let y = target.y + py as u32;
        if y >= canvas.height() {
            break;
        }
        for px in 0..tw {
            let col = px * cols / tw;
            let x = target.x + px as u32;
            if x >= canvas.width() {
                break;
            }
            let color = if cells[row * cols + col] { BLACK } else { WHITE };
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Scale `src` with a smooth filter to fit inside `target` (aspect kept), centered
pub(crate) fn paste_smooth(canvas: &mut RgbImage, src: &RgbImage, target: Region) {
    if src.width() == 0 || src.height() == 0 || target.width == 0 || target.height == 0 {
        return;
    }
    let (w, h) = fit_within(src.width(), src.height(), target.width, target.height);
    let scaled = imageops::resize(src, w, h, FilterType::Triangle);
    let x = target.x + (target.width - w) / 2;
    let y = target.y + (target.height - h) / 2;
    imageops::replace(canvas, &scaled, x as i64, y as i64);
}

/// Largest size with the aspect ratio of `w` × `h` that fits `max_w` × `max_h`
pub(crate) fn fit_within(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let ratio = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
    let nw = ((w as f64 * ratio) as u32).clamp(1, max_w.max(1));
    let nh = ((h as f64 * ratio) as u32).clamp(1, max_h.max(1));
    (nw, nh)
}
