//! Decoding uploads and encoding previews.

use image::{ImageFormat, RgbImage};

use crate::error::InputError;

/// Decode an uploaded PNG or JPEG into RGB. Alpha, if any, is dropped.
pub fn decode_upload(bytes: &[u8]) -> Result<RgbImage, InputError> {
    let format = image::guess_format(bytes)
        .map_err(|_| InputError::UnsupportedFormat("unrecognized data".to_string()))?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg => {}
        other => return Err(InputError::UnsupportedFormat(format!("{other:?}"))),
    }

    let img = image::load_from_memory_with_format(bytes, format)?;
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(InputError::EmptyImage);
    }
    tracing::debug!(
        format = ?format,
        width = rgb.width(),
        height = rgb.height(),
        "Decoded upload"
    );
    Ok(rgb)
}

/// PNG-encode an image for preview.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    {
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, ImageFormat::Png)?;
    }
    Ok(buf)
}
