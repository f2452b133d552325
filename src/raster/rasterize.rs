//! # Rasterizer Adapter
//!
//! Turns a decoded page (RGB, 8 bits per channel, at whatever resolution the
//! PDF renderer produced) into a [`RasterImage`] exactly `target_width_dots`
//! wide.
//!
//! ## Order of Operations
//!
//! ```text
//! rotate (optional, 90° clockwise) → scale to target width → BT.601 luma
//! ```
//!
//! The order is fixed; thresholding happens afterwards on the final luma
//! buffer, so the global average is computed on the scaled, rotated page.
//!
//! ## Scaling
//!
//! A single factor `target_width_dots / rotated_width` is applied to both
//! axes with bilinear resampling ([`FilterType::Triangle`]). The output height
//! is `floor(rotated_height * factor)` and is never chosen independently.

use std::borrow::Cow;

use image::{RgbImage, imageops, imageops::FilterType};
use tracing::debug;

use super::{MAX_WIDTH_DOTS, RasterImage};
use crate::error::{LabelprintError, Result};

/// Rasterize one decoded page.
///
/// ## Errors
///
/// - `InvalidInput` if the source has a zero dimension
/// - `InvalidInput` if `target_width_dots` is 0 or above [`MAX_WIDTH_DOTS`]
/// - `InvalidInput` if the scaled height rounds down to 0 rows
///
/// ## Example
///
/// ```
/// use image::{Rgb, RgbImage};
/// use labelprint::raster::rasterize;
///
/// let page = RgbImage::from_pixel(100, 50, Rgb([255, 255, 255]));
/// let raster = rasterize(&page, 200, false).unwrap();
/// assert_eq!((raster.width(), raster.height()), (200, 100));
/// ```
pub fn rasterize(src: &RgbImage, target_width_dots: usize, rotate90: bool) -> Result<RasterImage> {
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(LabelprintError::InvalidInput(format!(
            "source image has zero dimension ({}x{})",
            src_w, src_h
        )));
    }
    if target_width_dots == 0 {
        return Err(LabelprintError::InvalidInput(
            "target width must be at least 1 dot".to_string(),
        ));
    }
    if target_width_dots > MAX_WIDTH_DOTS {
        return Err(LabelprintError::InvalidInput(format!(
            "target width {} exceeds {} dots",
            target_width_dots, MAX_WIDTH_DOTS
        )));
    }

    let rotated: Cow<'_, RgbImage> = if rotate90 {
        debug!("Rotating page 90 degrees clockwise");
        Cow::Owned(imageops::rotate90(src))
    } else {
        Cow::Borrowed(src)
    };

    let (w, h) = rotated.dimensions();
    let scale = target_width_dots as f64 / w as f64;
    let dst_w = target_width_dots as u32;
    let dst_h = (h as f64 * scale).floor() as u32;
    if dst_h == 0 {
        return Err(LabelprintError::InvalidInput(format!(
            "page {}x{} scales to zero rows at {} dots wide",
            w, h, target_width_dots
        )));
    }

    let scaled = if (dst_w, dst_h) == (w, h) {
        rotated.into_owned()
    } else {
        imageops::resize(&*rotated, dst_w, dst_h, FilterType::Triangle)
    };
    debug!(
        "Scaled page {}x{} -> {}x{} (factor {:.4})",
        w, h, dst_w, dst_h, scale
    );

    to_luma(&scaled)
}

/// Convert an RGB image to BT.601 luminance without resampling.
pub fn to_luma(img: &RgbImage) -> Result<RasterImage> {
    let luma = img
        .pixels()
        .map(|p| luma_bt601(p[0], p[1], p[2]))
        .collect();
    RasterImage::new(img.width() as usize, img.height() as usize, luma)
}

/// ITU-R BT.601 luma: `0.299 R + 0.587 G + 0.114 B`.
///
/// Evaluated in 16.16 fixed point on 16-bit channels (`c * 0x101`), with
/// rounding, so results are identical on every platform:
///
/// ```text
/// Y = (19595·R16 + 38470·G16 + 7471·B16 + 2^15) >> 24
/// ```
///
/// The weights sum to 65536, so white stays 255 and black stays 0.
#[inline]
pub fn luma_bt601(r: u8, g: u8, b: u8) -> u8 {
    let r = r as u32 * 0x101;
    let g = g as u32 * 0x101;
    let b = b as u32 * 0x101;
    ((19595 * r + 38470 * g + 7471 * b + (1 << 15)) >> 24) as u8
}

// ============================================================================
// TESTS
// ============================================================================
