/// Extract pixel rectangles from decoded images and re-encode them as PNG.

use super::decode::{DecodedImage, BYTES_PER_PIXEL};
use crate::error::AppError;
use crate::postprocess::mapping::PixelRect;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Copy exactly `rect` out of `img` (no resampling) and encode it as PNG.
pub fn crop_png(img: &DecodedImage, rect: &PixelRect) -> Result<Vec<u8>, AppError> {
    let pixels = crop_pixels(img, rect)?;

    let crop = RgbaImage::from_raw(rect.width, rect.height, pixels).ok_or_else(|| {
        AppError::Internal("Crop buffer does not match crop dimensions".to_string())
    })?;

    let mut out = Cursor::new(Vec::new());
    crop.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Row-by-row copy of the RGBA pixels inside `rect`.
fn crop_pixels(img: &DecodedImage, rect: &PixelRect) -> Result<Vec<u8>, AppError> {
    if rect.width == 0 || rect.height == 0 {
        return Err(AppError::ImageDecode(format!(
            "Empty crop rectangle {}x{}",
            rect.width, rect.height
        )));
    }

    let x_end = rect.x as u64 + rect.width as u64;
    let y_end = rect.y as u64 + rect.height as u64;
    if x_end > img.width as u64 || y_end > img.height as u64 {
        return Err(AppError::ImageDecode(format!(
            "Crop rectangle {rect:?} exceeds image bounds {}x{}",
            img.width, img.height
        )));
    }

    let stride = img.width as usize * BYTES_PER_PIXEL;
    let row_bytes = rect.width as usize * BYTES_PER_PIXEL;
    let mut crop_data = Vec::with_capacity(row_bytes * rect.height as usize);

    for y in rect.y as usize..y_end as usize {
        let row_start = y * stride + rect.x as usize * BYTES_PER_PIXEL;
        crop_data.extend_from_slice(&img.data[row_start..row_start + row_bytes]);
    }

    Ok(crop_data)
}
