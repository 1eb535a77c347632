/// Image decoding via the image crate, with format sniffing.

use crate::error::AppError;
use image::ImageReader;
use std::io::Cursor;

#[derive(Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, row-major, 4 bytes per pixel
    pub data: Vec<u8>,
}

pub const BYTES_PER_PIXEL: usize = 4;

/// Decode image bytes into RGBA pixel data.
pub fn decode_image(data: &[u8]) -> Result<DecodedImage, AppError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::ImageDecode(format!("Format detection: {e}")))?
        .decode()?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();
    if width == 0 || height == 0 {
        return Err(AppError::ImageDecode(format!(
            "Image has no pixels ({width}x{height})"
        )));
    }

    Ok(DecodedImage {
        width,
        height,
        data: rgba.into_raw(),
    })
}

/// Read true pixel dimensions from the image header without decoding pixels.
///
/// There is no default size: an unreadable header is an error.
pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32), AppError> {
    let dims = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::ImageDecode(format!("Format detection: {e}")))?
        .into_dimensions()
        .map_err(|e| AppError::ImageDecode(format!("Dimensions unavailable: {e}")))?;
    Ok(dims)
}
