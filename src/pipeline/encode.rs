//! Image encoding: `DynamicImage` → PNG bytes for the OCR engine's stdin.
//!
//! PNG is lossless; JPEG artefacts around glyph edges measurably hurt
//! tesseract accuracy on accented characters. Pages never touch the disk.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a raster as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );

    Ok(buf)
}
