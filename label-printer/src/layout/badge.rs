//! Badge: black rounded pill with white text, or a raster logo

use image::RgbImage;
use rusttype::Font;

use crate::geometry::Region;

use super::raster::{BLACK, WHITE, paste_smooth};
use super::text::{TextFit, draw_centered, shrink_to_fit};

const MAX_RADIUS: u32 = 25;

fn rounded_rect_contains(x: i32, y: i32, w: i32, h: i32, r: i32) -> bool {
    if x >= r && x < w - r {
        return true;
    }
    if y >= r && y < h - r {
        return true;
    }
    let (cx, cy) = if x < r {
        if y < r { (r - 1, r - 1) } else { (r - 1, h - r) }
    } else if y < r {
        (w - r, r - 1)
    } else {
        (w - r, h - r)
    };
    let dx = x - cx;
    let dy = y - cy;
    dx * dx + dy * dy <= r * r
}

/// Corner radius for a pill in `region`
pub fn radius(region: Region) -> u32 {
    (region.height / 2).min(region.width / 2).min(MAX_RADIUS)
}

/// Fill the pill shape
pub fn paint_pill(canvas: &mut RgbImage, region: Region) {
    let r = radius(region) as i32;
    let (w, h) = (region.width as i32, region.height as i32);
    for y in 0..h {
        for x in 0..w {
            if !rounded_rect_contains(x, y, w, h, r) {
                continue;
            }
            let (px, py) = (region.x + x as u32, region.y + y as u32);
            if px < canvas.width() && py < canvas.height() {
                canvas.put_pixel(px, py, BLACK);
            }
        }
    }
}

/// Paint a text badge; returns the text fit for diagnostics
pub fn paint_text(
    canvas: &mut RgbImage,
    font: &Font<'_>,
    text: &str,
    nominal_px: u32,
    region: Region,
) -> TextFit {
    paint_pill(canvas, region);
    let r = radius(region);
    let fit = shrink_to_fit(
        font,
        text,
        nominal_px,
        region.width.saturating_sub(2 * r),
        region.height.saturating_sub(4),
        0,
    );
    draw_centered(
        canvas,
        font,
        text,
        fit.size,
        region.center_x(),
        region.center_y(),
        0,
        WHITE,
    );
    fit
}

/// Paint a logo image scaled smoothly into the badge box
pub fn paint_logo(canvas: &mut RgbImage, logo: &RgbImage, region: Region) {
    paste_smooth(canvas, logo, region);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::text::FontSet;
    use image::Rgb;

    #[test]
    fn test_pill_corners_stay_white() {
        let mut canvas = RgbImage::from_pixel(100, 40, Rgb([255, 255, 255]));
        let region = Region::new(0, 0, 100, 40);
        paint_pill(&mut canvas, region);
        assert_eq!(*canvas.get_pixel(0, 0), WHITE);
        assert_eq!(*canvas.get_pixel(99, 39), WHITE);
        assert_eq!(*canvas.get_pixel(50, 20), BLACK);
        assert_eq!(*canvas.get_pixel(50, 0), BLACK);
    }

    #[test]
    fn test_text_badge_has_white_ink_inside_pill() {
        let fonts = FontSet::embedded().unwrap();
        let mut canvas = RgbImage::from_pixel(300, 50, Rgb([255, 255, 255]));
        let region = Region::new(0, 0, 300, 50);
        let fit = paint_text(&mut canvas, &fonts.bold, "Inventory", 30, region);
        assert!(!fit.floor_reached);
        // white glyph pixels across the middle row of the pill
        assert!((40..260).any(|x| canvas.get_pixel(x, 25)[0] > 200));
    }

    #[test]
    fn test_logo_fills_box_center() {
        let logo = RgbImage::from_pixel(20, 10, Rgb([0, 0, 0]));
        let mut canvas = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        paint_logo(&mut canvas, &logo, Region::new(0, 0, 100, 100));
        // 20x10 scaled to 100x50, vertically centered
        assert_eq!(canvas.get_pixel(50, 50)[0], 0);
        assert_eq!(canvas.get_pixel(50, 10)[0], 255);
    }
}
