//! Image encoding: base64 payloads ⇄ [`IconArtifact`], `DynamicImage` → PNG.
//!
//! The image API returns icons as base64 strings inside JSON; the export
//! stage needs PNG bytes from a decoded raster. Both conversions live here
//! so the network and file-system stages stay free of codec details.

use crate::error::InfographicError;
use crate::output::IconArtifact;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode a base64 image payload into an [`IconArtifact`].
///
/// The bytes are sniffed with `image::guess_format`; a payload that is not a
/// recognisable raster is rejected rather than embedded as a broken icon.
pub fn icon_from_base64(b64: &str, mime_type: &str) -> Result<IconArtifact, InfographicError> {
    let data = STANDARD
        .decode(b64.trim())
        .map_err(|e| InfographicError::IconGenerationFailed {
            detail: format!("invalid base64 image payload: {e}"),
        })?;

    image::guess_format(&data).map_err(|e| InfographicError::IconGenerationFailed {
        detail: format!("image payload is not a known format: {e}"),
    })?;

    debug!("Decoded icon → {} bytes ({})", data.len(), mime_type);
    Ok(IconArtifact::new(mime_type, data))
}

/// Encode a raster image as PNG bytes.
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

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let png = encode_png(&red_square()).expect("encode should succeed");
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn decode_png_payload() {
        let png = encode_png(&red_square()).unwrap();
        let b64 = STANDARD.encode(&png);
        let icon = icon_from_base64(&b64, "image/png").unwrap();
        assert_eq!(icon.mime_type, "image/png");
        assert_eq!(icon.data, png);
    }

    #[test]
    fn reject_invalid_base64() {
        let err = icon_from_base64("%%%not-base64%%%", "image/png").unwrap_err();
        assert!(matches!(err, InfographicError::IconGenerationFailed { .. }));
    }

    #[test]
    fn reject_non_image_bytes() {
        let b64 = STANDARD.encode(b"plain text, not an image");
        assert!(icon_from_base64(&b64, "image/png").is_err());
    }
}
