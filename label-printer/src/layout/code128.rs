//! Code 128 symbology
//!
//! Encoding is done by `barcoders`. Code set C is used for even-length
//! all-digit data, code set B for everything else. Characters outside
//! printable ASCII cannot be expressed in code set B and are encoded as `?`.

use barcoders::sym::code128::Code128;
use image::RgbImage;
use tracing::warn;

use crate::geometry::Region;

use super::raster::{WHITE, blit_cells_nearest, fill};

/// Quiet zone on each side, in modules
pub const QUIET_MODULES: u32 = 10;

/// Character-set selectors understood by `barcoders`
const SET_B: char = '\u{181}';
const SET_C: char = '\u{106}';

/// Prefix `data` with the code set it is encoded in
fn with_code_set(data: &str) -> String {
    let use_c = data.len() % 2 == 0 && data.bytes().all(|b| b.is_ascii_digit());
    if use_c {
        format!("{}{}", SET_C, data)
    } else {
        std::iter::once(SET_B)
            .chain(
                data.chars()
                    .map(|ch| if (' '..='~').contains(&ch) { ch } else { '?' }),
            )
            .collect()
    }
}

/// Encode `data` into modules (`true` = bar), without quiet zones.
///
/// `None` when there is nothing to encode or the encoder refuses the data.
pub fn encode(data: &str) -> Option<Vec<bool>> {
    if data.is_empty() {
        return None;
    }
    match Code128::new(with_code_set(data)) {
        Ok(code) => Some(code.encode().into_iter().map(|m| m == 1).collect()),
        Err(e) => {
            warn!(error = %e, len = data.len(), "Data cannot be encoded as Code 128");
            None
        }
    }
}

/// Width in pixels of the symbol with quiet zones at `module_px`
pub fn natural_width(modules: usize, module_px: u32) -> u32 {
    (modules as u32 + 2 * QUIET_MODULES) * module_px
}

/// Paint the barcode for `data` centered in `region`.
///
/// Bars are `module_px` wide. A symbol wider than the region is scaled down
/// to the region width (nearest neighbor), never cropped. Returns the painted
/// width in pixels; 0 leaves the region untouched.
pub fn paint(canvas: &mut RgbImage, data: &str, region: Region, module_px: u32) -> u32 {
    let Some(modules) = encode(data) else {
        return 0;
    };
    let module_px = module_px.max(1);

    let mut cells = vec![false; QUIET_MODULES as usize];
    cells.extend_from_slice(&modules);
    cells.extend(std::iter::repeat_n(false, QUIET_MODULES as usize));

    let natural = natural_width(modules.len(), module_px);
    let width = natural.min(region.width);
    let target = Region::new(
        region.x + (region.width - width) / 2,
        region.y,
        width,
        region.height,
    );

    fill(canvas, target, WHITE);
    blit_cells_nearest(canvas, &cells, cells.len(), 1, target);
    width
}
