/// Normalized (0-1000 grid) boxes to padded, clamped pixel rectangles.
///
/// The vision model reports boxes on a resolution independent 1000x1000 grid.
/// Mapping scales them to the true image size, grows them by a 5% safety pad
/// (never less than one pixel per side) so label edges are not clipped, and
/// clamps the result to the image.

use serde::{Deserialize, Serialize};

/// Side length of the normalized coordinate grid.
pub const GRID: f64 = 1000.0;

/// Box on the 0-1000 grid, field order as the model returns it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub ymin: f64,
    pub xmin: f64,
    pub ymax: f64,
    pub xmax: f64,
}

impl NormalizedBox {
    /// Order each axis so min <= max; NaN reads as 0.
    ///
    /// Out-of-grid values are kept: the origin-first clamp in
    /// [`map_to_pixel_rect`] brings the padded rectangle back inside the image.
    pub fn sanitized(&self) -> NormalizedBox {
        let finite = |v: f64| if v.is_nan() { 0.0 } else { v };
        let (ymin, ymax) = ordered(finite(self.ymin), finite(self.ymax));
        let (xmin, xmax) = ordered(finite(self.xmin), finite(self.xmax));
        NormalizedBox { ymin, xmin, ymax, xmax }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Crop rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map a normalized box onto an `image_width` x `image_height` image.
///
/// Steps:
/// 1. scale = dimension / 1000
/// 2. x = floor(xmin * sx), y = floor(ymin * sy),
///    w = ceil((xmax - xmin) * sx), h = ceil((ymax - ymin) * sy)
/// 3. pad = max(1, floor(extent * 0.05)) per axis, applied on both sides
/// 4. clamp the origin to 0 first, then bound the extent by the space left
///    after the clamped origin
///
/// Each axis is ordered first, so for any non-empty image the result has
/// width and height >= 1 and lies fully inside the image, even for boxes that
/// reach past the grid.
pub fn map_to_pixel_rect(bbox: &NormalizedBox, image_width: u32, image_height: u32) -> PixelRect {
    let b = bbox.sanitized();
    let (x, width) = map_axis(b.xmin, b.xmax, image_width);
    let (y, height) = map_axis(b.ymin, b.ymax, image_height);
    PixelRect { x, y, width, height }
}

fn map_axis(min: f64, max: f64, size: u32) -> (u32, u32) {
    let size = size as i64;
    let scale = size as f64 / GRID;

    let start = ((min * scale).floor() as i64).min(size);
    let extent = ((max - min) * scale).ceil() as i64;

    // floor(extent * 0.05) for non-negative integers
    let pad = (extent / 20).max(1);

    let padded_start = start.saturating_sub(pad);
    let padded_extent = extent.saturating_add(pad.saturating_mul(2));

    let clamped_start = padded_start.max(0);
    let clamped_extent = padded_extent.min(size - clamped_start).max(0);

    (clamped_start as u32, clamped_extent as u32)
}
