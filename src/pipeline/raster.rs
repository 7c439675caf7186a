//! Raster image normalisation: JPEG (or any decodable raster) → PNG.
//!
//! The image is decoded at its natural pixel size, converted to RGBA8 and
//! encoded as PNG. No scaling or colour correction is applied.

use super::encode::encode_png;
use crate::error::UnitError;
use image::DynamicImage;
use tracing::debug;

/// Decode `bytes` and re-encode them as PNG.
///
/// Blocking; callers on the async side run this through `spawn_blocking`.
pub fn reencode_to_png(bytes: &[u8]) -> Result<Vec<u8>, UnitError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| UnitError::Decode {
        detail: e.to_string(),
    })?;
    debug!(
        "Decoded raster image {}x{} ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    let rgba = DynamicImage::ImageRgba8(decoded.to_rgba8());
    encode_png(&rgba)
}
