//! Label layout engine
//!
//! Turns an [`InventoryItem`] and a [`Variant`] into a fixed-size
//! [`LabelImage`]. Every element box comes from [`LayoutRegions`]; only font
//! sizes depend on content, through the shrink-to-fit loop in [`text`].
//!
//! Paint order is fixed for all variants:
//!
//! 1. white background
//! 2. QR or barcode raster (nearest neighbor, hard module edges)
//! 3. badge (pill with text, or a smoothly scaled logo)
//! 4. text elements, last so nothing covers them
//!
//! Rendering never fails. Text that cannot fit even at [`text::MIN_FONT_PX`]
//! is drawn at that size and may be clipped; the condition is reported in
//! [`RenderReport`] and logged at debug level.

pub mod badge;
pub mod code128;
pub mod mount;
pub mod qr;
pub(crate) mod raster;
pub mod text;

use std::path::PathBuf;

use image::RgbImage;
use rusttype::Font;
use tracing::{debug, error};

use crate::error::LabelError;
use crate::geometry::{LabelGeometry, LayoutRegions, Region};
use crate::types::{InventoryItem, LabelImage, Variant};

use raster::BLACK;
use text::{FontSet, TextFit, draw_centered, fit_region};

/// Stroke applied to the item name on QR labels
const NAME_STROKE: u32 = 1;

/// Badge appearance
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Text drawn in the badge pill
    pub badge_text: String,
    /// Raster logo drawn instead of the pill
    pub badge_logo: Option<PathBuf>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            badge_text: "Inventory".to_string(),
            badge_logo: None,
        }
    }
}

/// What a text element was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Name,
    Id,
    Caption,
    Badge,
}

/// One text element as placed on the label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedText {
    pub role: TextRole,
    /// Box the text had to fit in
    pub allotted: Region,
    pub fit: TextFit,
}

/// Diagnostics collected while rendering one label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub variant: Variant,
    pub texts: Vec<PlacedText>,
}

impl RenderReport {
    /// Whether any text element overflowed at the minimum font size
    pub fn font_floor_reached(&self) -> bool {
        self.texts.iter().any(|t| t.fit.floor_reached)
    }
}

/// Deterministic renderer for one label stock.
///
/// Holds only read-only state, so a shared reference can render from many
/// threads at once.
pub struct LayoutEngine {
    geometry: LabelGeometry,
    regions: LayoutRegions,
    fonts: FontSet,
    badge_text: String,
    badge_logo: Option<RgbImage>,
}

impl LayoutEngine {
    /// Engine with the bundled fonts.
    ///
    /// A badge logo that cannot be loaded is logged and replaced by the text
    /// pill; only unusable font data is an error.
    pub fn new(geometry: LabelGeometry, options: LayoutOptions) -> Result<Self, LabelError> {
        Ok(Self::with_fonts(geometry, options, FontSet::embedded()?))
    }

    pub fn with_fonts(geometry: LabelGeometry, options: LayoutOptions, fonts: FontSet) -> Self {
        let badge_logo = options
            .badge_logo
            .as_ref()
            .and_then(|path| match image::open(path) {
                Ok(img) => Some(img.to_rgb8()),
                Err(e) => {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load badge logo, using text badge"
                    );
                    None
                }
            });

        Self {
            regions: geometry.regions(),
            geometry,
            fonts,
            badge_text: options.badge_text,
            badge_logo,
        }
    }

    pub fn geometry(&self) -> &LabelGeometry {
        &self.geometry
    }

    /// Render `item` in the given variant
    pub fn render(&self, item: &InventoryItem, variant: Variant) -> LabelImage {
        self.render_with_report(item, variant).0
    }

    /// Render and return the text fitting diagnostics alongside the image
    pub fn render_with_report(
        &self,
        item: &InventoryItem,
        variant: Variant,
    ) -> (LabelImage, RenderReport) {
        let (w, h) = self.geometry.canvas_size();
        let mut image = LabelImage::blank(w, h);
        let mut painter = Painter {
            canvas: image.as_rgb_mut(),
            placed: Vec::new(),
        };

        match variant {
            Variant::Qr => self.paint_qr(&mut painter, item),
            Variant::Barcode => self.paint_barcode(&mut painter, item),
            Variant::Text => self.paint_text(&mut painter, item),
            Variant::TextTwoLine => self.paint_two_line(&mut painter, item),
        }

        let report = RenderReport {
            variant,
            texts: painter.placed,
        };
        for t in report.texts.iter().filter(|t| t.fit.floor_reached) {
            debug!(
                variant = %variant,
                role = ?t.role,
                size = t.fit.size,
                width = t.fit.width,
                allotted = t.allotted.width,
                "Font floor reached, text may be clipped"
            );
        }
        (image, report)
    }

    /// Center a rendered label on the configured sheet, if any
    pub fn mount(&self, label: &LabelImage) -> LabelImage {
        match self.geometry.sheet_size() {
            Some((w, h)) => mount::mount(label, w, h),
            None => label.clone(),
        }
    }

    fn paint_qr(&self, p: &mut Painter<'_>, item: &InventoryItem) {
        let r = &self.regions;
        qr::paint(p.canvas, &item.id, r.qr_code);
        self.paint_badge(p, r.qr_badge);
        p.text(
            TextRole::Name,
            &self.fonts.name,
            &item.name,
            r.qr_name_px,
            r.qr_name,
            NAME_STROKE,
        );
        p.text(TextRole::Id, &self.fonts.mono, &item.id, r.qr_id_px, r.qr_id, 0);
    }

    fn paint_barcode(&self, p: &mut Painter<'_>, item: &InventoryItem) {
        let r = &self.regions;
        code128::paint(p.canvas, &item.id, r.barcode_bars, r.barcode_module_px);
        self.paint_badge(p, r.barcode_badge);
        p.text(
            TextRole::Caption,
            &self.fonts.mono,
            &item.id,
            r.barcode_caption_px,
            r.barcode_caption,
            0,
        );
    }

    fn paint_text(&self, p: &mut Painter<'_>, item: &InventoryItem) {
        let r = &self.regions;
        p.text(
            TextRole::Name,
            &self.fonts.name,
            &item.name,
            r.text_line_px,
            r.text_line,
            0,
        );
    }

    fn paint_two_line(&self, p: &mut Painter<'_>, item: &InventoryItem) {
        let r = &self.regions;
        let px = r.two_line_px;
        p.text(TextRole::Id, &self.fonts.mono, &item.id, px, r.two_line_upper, 0);
        p.text(TextRole::Name, &self.fonts.name, &item.name, px, r.two_line_lower, 0);
    }

    fn paint_badge(&self, p: &mut Painter<'_>, region: Region) {
        match &self.badge_logo {
            Some(logo) => badge::paint_logo(p.canvas, logo, region),
            None => {
                let fit = badge::paint_text(
                    p.canvas,
                    &self.fonts.bold,
                    &self.badge_text,
                    self.regions.badge_px,
                    region,
                );
                p.placed.push(PlacedText {
                    role: TextRole::Badge,
                    allotted: region,
                    fit,
                });
            }
        }
    }
}

struct Painter<'a> {
    canvas: &'a mut RgbImage,
    placed: Vec<PlacedText>,
}

impl Painter<'_> {
    fn text(
        &mut self,
        role: TextRole,
        font: &Font<'_>,
        value: &str,
        nominal: u32,
        region: Region,
        stroke: u32,
    ) {
        let fit = fit_region(font, value, nominal, region, stroke);
        draw_centered(
            self.canvas,
            font,
            value,
            fit.size,
            region.center_x(),
            region.center_y(),
            stroke,
            BLACK,
        );
        self.placed.push(PlacedText {
            role,
            allotted: region,
            fit,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LabelGeometry::default(), LayoutOptions::default()).unwrap()
    }

    fn item() -> InventoryItem {
        InventoryItem::new("A6500-01", "Sony A6500")
    }

    #[test]
    fn test_every_variant_has_canvas_size() {
        let engine = engine();
        for variant in Variant::ALL {
            let image = engine.render(&item(), variant);
            assert_eq!((image.width(), image.height()), (399, 207), "{}", variant);
            assert!(image.dark_pixels() > 0, "{} rendered blank", variant);
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let engine = engine();
        for variant in Variant::ALL {
            let a = engine.render(&item(), variant);
            let b = engine.render(&item(), variant);
            assert_eq!(a.as_bytes(), b.as_bytes(), "{}", variant);
        }
    }

    #[test]
    fn test_report_roles() {
        let engine = engine();
        let roles = |v| {
            engine
                .render_with_report(&item(), v)
                .1
                .texts
                .iter()
                .map(|t| t.role)
                .collect::<Vec<_>>()
        };
        assert_eq!(roles(Variant::Qr), vec![TextRole::Badge, TextRole::Name, TextRole::Id]);
        assert_eq!(roles(Variant::Barcode), vec![TextRole::Badge, TextRole::Caption]);
        assert_eq!(roles(Variant::Text), vec![TextRole::Name]);
        assert_eq!(roles(Variant::TextTwoLine), vec![TextRole::Id, TextRole::Name]);
    }

    #[test]
    fn test_long_name_shrinks_and_fits() {
        let engine = engine();
        let long = InventoryItem::new("X1", "Manfrotto 504X Fluid Video Head with Legs");
        let (_, report) = engine.render_with_report(&long, Variant::Text);
        let t = &report.texts[0];
        assert!(t.fit.size < engine.regions.text_line_px);
        assert!(t.fit.width <= t.allotted.width);
        assert!(!report.font_floor_reached());
    }

    #[test]
    fn test_floor_reached_still_renders() {
        let engine = engine();
        let huge = InventoryItem::new("X", "W".repeat(200));
        let (image, report) = engine.render_with_report(&huge, Variant::Text);
        assert!(report.font_floor_reached());
        assert!(image.dark_pixels() > 0);
    }

    #[test]
    fn test_empty_item_renders() {
        let engine = engine();
        let empty = InventoryItem::new("", "");
        for variant in Variant::ALL {
            let image = engine.render(&empty, variant);
            assert_eq!(image.width(), 399);
        }
    }

    #[test]
    fn test_missing_logo_falls_back_to_pill() {
        let options = LayoutOptions {
            badge_text: "Inventory".into(),
            badge_logo: Some(PathBuf::from("/nonexistent/logo.png")),
        };
        let engine = LayoutEngine::new(LabelGeometry::default(), options).unwrap();
        let (_, report) = engine.render_with_report(&item(), Variant::Qr);
        assert_eq!(report.texts[0].role, TextRole::Badge);
    }

    #[test]
    fn test_mount_uses_sheet() {
        let geometry = LabelGeometry::default().with_sheet(50.0, 50.0);
        let engine = LayoutEngine::new(geometry, LayoutOptions::default()).unwrap();
        let label = engine.render(&item(), Variant::Text);
        let mounted = engine.mount(&label);
        assert_eq!((mounted.width(), mounted.height()), (399, 399));

        // no sheet configured: unchanged
        assert_eq!(self::engine().mount(&label), label);
    }
}
