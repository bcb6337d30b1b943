//! Physical label geometry
//!
//! Converts label stock measurements (millimeters at a printer DPI) into the
//! pixel canvas the layout engine paints on, and derives the fixed element
//! boxes every variant uses. Nothing here looks at label content.

use serde::{Deserialize, Serialize};

const MM_PER_INCH: f32 = 25.4;

/// Axis-aligned pixel rectangle on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Horizontal center in canvas coordinates
    pub fn center_x(&self) -> f32 {
        self.x as f32 + self.width as f32 / 2.0
    }

    /// Vertical center in canvas coordinates
    pub fn center_y(&self) -> f32 {
        self.y as f32 + self.height as f32 / 2.0
    }
}

/// Label stock and printer resolution, fixed per deployment.
///
/// Defaults describe a 50 × 26 mm label on a 203 dpi thermal printer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub dpi: u32,
    /// Optional larger sheet the label gets mounted on before printing
    pub sheet_mm: Option<(f32, f32)>,
}

impl Default for LabelGeometry {
    fn default() -> Self {
        Self {
            width_mm: 50.0,
            height_mm: 26.0,
            dpi: 203,
            sheet_mm: None,
        }
    }
}

impl LabelGeometry {
    pub fn new(width_mm: f32, height_mm: f32, dpi: u32) -> Self {
        Self {
            width_mm,
            height_mm,
            dpi,
            sheet_mm: None,
        }
    }

    /// Mount rendered labels on a sheet of the given size
    pub fn with_sheet(mut self, width_mm: f32, height_mm: f32) -> Self {
        self.sheet_mm = Some((width_mm, height_mm));
        self
    }

    /// Convert millimeters to whole device pixels (truncating, never below 1)
    pub fn mm_to_px(&self, mm: f32) -> u32 {
        mm_to_px(mm, self.dpi)
    }

    /// Native canvas size in pixels
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.mm_to_px(self.width_mm), self.mm_to_px(self.height_mm))
    }

    /// Sheet size in pixels, if a mount sheet is configured
    pub fn sheet_size(&self) -> Option<(u32, u32)> {
        self.sheet_mm
            .map(|(w, h)| (self.mm_to_px(w), self.mm_to_px(h)))
    }

    /// Element boxes for this canvas
    pub fn regions(&self) -> LayoutRegions {
        let (w, h) = self.canvas_size();
        LayoutRegions::for_canvas(w, h)
    }
}

/// Pixels for a length in millimeters at `dpi`.
pub fn mm_to_px(mm: f32, dpi: u32) -> u32 {
    ((mm / MM_PER_INCH) * dpi as f32).max(1.0) as u32
}

fn frac(v: u32, f: f32) -> u32 {
    (v as f32 * f) as u32
}

/// Fixed element boxes and nominal font sizes, all fractions of the canvas.
///
/// The QR label keeps the square code bottom-left, the badge across the top
/// and the two text lines in the info box to the right of the code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRegions {
    pub canvas: Region,

    // QR variant
    pub qr_code: Region,
    pub qr_badge: Region,
    pub qr_name: Region,
    pub qr_id: Region,
    pub qr_name_px: u32,
    pub qr_id_px: u32,

    // Barcode variant
    pub barcode_badge: Region,
    pub barcode_bars: Region,
    pub barcode_caption: Region,
    pub barcode_module_px: u32,
    pub barcode_caption_px: u32,

    // Text variants
    pub text_line: Region,
    pub text_line_px: u32,
    pub two_line_upper: Region,
    pub two_line_lower: Region,
    pub two_line_px: u32,

    pub badge_px: u32,
}

impl LayoutRegions {
    pub fn for_canvas(lx: u32, ly: u32) -> Self {
        let canvas = Region::new(0, 0, lx, ly);

        // QR: square code of half the label height, info box to its right
        let qr = frac(ly, 0.5);
        let qr_top = ly.saturating_sub(qr + 20);
        let info_x = qr + frac(ly, 0.025);
        let info_w = lx.saturating_sub(frac(ly, 0.55));
        let info_top = ly.saturating_sub(qr + 30);
        let text_w = lx.saturating_sub(qr + 9).min(info_w);
        let name_h = frac(ly, 0.36);
        let name_cy = info_top + frac(ly, 0.2).saturating_sub(5);
        let id_h = frac(ly, 0.15);
        let id_cy = info_top + frac(ly, 0.5).saturating_sub(15);
        let qr_text = |cy: u32, h: u32| {
            let x = info_x + info_w.saturating_sub(text_w) / 2;
            Region::new(x, cy.saturating_sub(h / 2), text_w, h)
        };

        // Barcode: badge on top, bars and caption below
        let barcode_badge_h = (ly as f32 / 3.61) as u32;
        let band_h = barcode_badge_h + 15;
        let caption_h = frac(ly, 0.2);
        let bars_top = band_h + frac(ly, 0.04);
        let bars_h = ly.saturating_sub(bars_top + caption_h + 4).max(1);

        let margin = 10.min(lx / 4);

        Self {
            canvas,

            qr_code: Region::new(0, qr_top, qr, qr),
            qr_badge: Region::new(margin, 15, lx.saturating_sub(2 * margin), ly / 4),
            qr_name: qr_text(name_cy, name_h),
            qr_id: qr_text(id_cy, id_h),
            qr_name_px: ly / 2,
            qr_id_px: (ly as f32 / 5.5) as u32,

            barcode_badge: Region::new(margin, 5, lx.saturating_sub(2 * margin), barcode_badge_h),
            barcode_bars: Region::new(0, bars_top, lx, bars_h),
            barcode_caption: Region::new(0, bars_top + bars_h + 2, lx, caption_h),
            barcode_module_px: (ly / 100).max(1),
            barcode_caption_px: (ly as f32 / 7.0) as u32,

            text_line: canvas,
            text_line_px: (ly as f32 / 1.25) as u32,
            two_line_upper: Region::new(0, 0, lx, ly / 2),
            two_line_lower: Region::new(0, ly / 2, lx, ly - ly / 2),
            two_line_px: (ly as f32 / 2.5) as u32,

            badge_px: (ly as f32 / 6.8) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mm_to_px() {
        assert_eq!(mm_to_px(25.4, 203), 203);
        assert_eq!(mm_to_px(50.0, 203), 399);
        assert_eq!(mm_to_px(26.0, 203), 207);
        assert_eq!(mm_to_px(0.0, 203), 1);
    }

    #[test]
    fn test_default_canvas() {
        let geometry = LabelGeometry::default();
        assert_eq!(geometry.canvas_size(), (399, 207));
        assert_eq!(geometry.sheet_size(), None);
    }

    #[test]
    fn test_sheet_size() {
        let geometry = LabelGeometry::default().with_sheet(50.0, 50.0);
        assert_eq!(geometry.sheet_size(), Some((399, 399)));
    }

    #[test]
    fn test_regions_inside_canvas() {
        let regions = LabelGeometry::default().regions();
        let all = [
            regions.qr_code,
            regions.qr_badge,
            regions.qr_name,
            regions.qr_id,
            regions.barcode_badge,
            regions.barcode_bars,
            regions.barcode_caption,
            regions.text_line,
            regions.two_line_upper,
            regions.two_line_lower,
        ];
        for r in all {
            assert!(r.x + r.width <= 399, "{:?}", r);
            assert!(r.y + r.height <= 207, "{:?}", r);
            assert!(r.width > 0 && r.height > 0, "{:?}", r);
        }
    }

    #[test]
    fn test_qr_text_right_of_code() {
        let regions = LabelGeometry::default().regions();
        assert!(regions.qr_name.x >= regions.qr_code.width);
        assert!(regions.qr_name.y + regions.qr_name.height <= regions.qr_id.y + 1);
    }
}
