//! PNG encoding: `DynamicImage` → PNG bytes.
//!
//! Every converted unit leaves the pipeline as PNG. Encoding is lossless, so
//! a rendered page or a re-encoded photo keeps every pixel it had.

use crate::error::UnitError;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG.
///
/// An empty result is an encode failure.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, UnitError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| UnitError::Encode {
            detail: e.to_string(),
        })?;

    if buf.is_empty() {
        return Err(UnitError::Encode {
            detail: "encoder produced no data".into(),
        });
    }

    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
