//! QR matrix generation

use image::RgbImage;
use qrcode::{Color, EcLevel, QrCode};
use tracing::warn;

use crate::geometry::Region;

use super::raster::blit_cells_nearest;

/// Square module matrix without border, row-major, `true` = dark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    pub width: usize,
    pub modules: Vec<bool>,
}

impl QrMatrix {
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }
}

/// Encode `data` at the smallest version that holds it.
///
/// Tries medium error correction first and falls back to low for data that
/// only fits there. `None` when no QR version can hold the data.
pub fn encode(data: &str) -> Option<QrMatrix> {
    for level in [EcLevel::M, EcLevel::L] {
        if let Ok(code) = QrCode::with_error_correction_level(data.as_bytes(), level) {
            let modules = code
                .to_colors()
                .into_iter()
                .map(|c| c == Color::Dark)
                .collect();
            return Some(QrMatrix {
                width: code.width(),
                modules,
            });
        }
    }
    None
}

/// Paint the QR code for `data` into `region`, scaled nearest-neighbor.
///
/// Returns the matrix that was painted; leaves the region untouched when the
/// data cannot be encoded.
pub fn paint(canvas: &mut RgbImage, data: &str, region: Region) -> Option<QrMatrix> {
    let Some(matrix) = encode(data) else {
        warn!(len = data.len(), "Data too long for a QR code, leaving area blank");
        return None;
    };
    blit_cells_nearest(canvas, &matrix.modules, matrix.width, matrix.width, region);
    Some(matrix)
}
