//! # Page Padder
//!
//! Right-pads every row of a [`BitBuffer`] with 0 so the width becomes a
//! multiple of 8, producing a canonical [`Page`].
//!
//! ```text
//! width_bytes  = ceil(W / 8)
//! padded_width = width_bytes × 8
//!
//! W = 13:  ██░██░░██░███ → ██░██░░██░███░░░   (3 zero columns)
//! ```

use super::{BitBuffer, Page};

/// Pad a bit buffer to a byte-aligned page.
///
/// Already aligned buffers are moved into the page unchanged, which makes
/// padding idempotent.
///
/// ## Example
///
/// ```
/// use labelprint::raster::{BitBuffer, pad};
///
/// let bits = BitBuffer::new(3, 2, vec![1, 1, 1, 0, 1, 0]).unwrap();
/// let page = pad(bits);
/// assert_eq!(page.width(), 8);
/// assert_eq!(page.row(0), &[1, 1, 1, 0, 0, 0, 0, 0]);
/// assert_eq!(page.row(1), &[0, 1, 0, 0, 0, 0, 0, 0]);
/// ```
pub fn pad(bits: BitBuffer) -> Page {
    let width = bits.width();
    let height = bits.height();
    let padded_width = padded_width(width);

    if padded_width == width {
        return Page::from_parts(bits.into_pixels(), width, height);
    }

    let src = bits.pixels();
    let mut pixels = vec![0u8; padded_width * height];
    for (dst_row, src_row) in pixels
        .chunks_exact_mut(padded_width)
        .zip(src.chunks_exact(width))
    {
        dst_row[..width].copy_from_slice(src_row);
    }

    Page::from_parts(pixels, padded_width, height)
}

/// Smallest multiple of 8 that is `>= width`.
#[inline]
pub fn padded_width(width: usize) -> usize {
    width.div_ceil(8) * 8
}

// ============================================================================
// TESTS
// ============================================================================
