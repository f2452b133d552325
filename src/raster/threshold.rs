//! # Global Average Threshold
//!
//! Converts a luminance raster to a 1-bit [`BitBuffer`] using a single
//! threshold: the integer-truncated mean brightness of the whole image.
//!
//! ```text
//! average = Σ luma / (width × height)        (integer division)
//! dark    = luma <= average
//! bit     = dark XOR invert
//! ```
//!
//! ## Uniform Images
//!
//! When every pixel has the same value, `luma <= average` holds everywhere and
//! the whole page is dark (all 1s, or all 0s when inverted). This is the
//! expected behaviour, not a special case.
//!
//! ## Invert
//!
//! `invert` here swaps which value marks dark content in the *canonical*
//! buffer. It is independent of the printer-polarity flag applied by the
//! encoders when packing bits.

use tracing::debug;

use super::{BitBuffer, RasterImage};

/// Threshold a raster against its own average brightness.
///
/// ## Example
///
/// ```
/// use labelprint::raster::{RasterImage, threshold};
///
/// let img = RasterImage::new(4, 1, vec![0, 50, 200, 250]).unwrap();
/// // average = 500 / 4 = 125
/// assert_eq!(threshold(&img, false).pixels(), &[1, 1, 0, 0]);
/// assert_eq!(threshold(&img, true).pixels(), &[0, 0, 1, 1]);
/// ```
pub fn threshold(img: &RasterImage, invert: bool) -> BitBuffer {
    let average = average_brightness(img);

    let pixels: Vec<u8> = img
        .luma()
        .iter()
        .map(|&v| ((v <= average) != invert) as u8)
        .collect();

    let bits = BitBuffer::from_parts(img.width(), img.height(), pixels);
    let total = bits.pixels().len();
    let ones = bits.count_ones();
    let dark = if invert { total - ones } else { ones };
    debug!(
        "Average brightness: {} ({} of {} pixels dark, {:.1}%)",
        average,
        dark,
        total,
        dark as f64 * 100.0 / total as f64
    );

    bits
}

/// Integer-truncated mean luminance of the whole image.
pub fn average_brightness(img: &RasterImage) -> u8 {
    let sum: u64 = img.luma().iter().map(|&v| v as u64).sum();
    // RasterImage guarantees a non-empty buffer
    (sum / img.luma().len() as u64) as u8
}

// ============================================================================
// TESTS
// ============================================================================
