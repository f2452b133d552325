//! # Raster Pipeline
//!
//! Converts a decoded page image into the canonical [`Page`] consumed by the
//! protocol encoders.
//!
//! ```text
//! RgbImage ──rasterize──► RasterImage ──threshold──► BitBuffer ──pad──► Page
//!           (rotate,      (8-bit luma)   (global     (1 byte per   (width % 8 == 0)
//!            scale, luma)                 average)    pixel, 0/1)
//! ```
//!
//! ## Polarity
//!
//! In a [`BitBuffer`] and a [`Page`], `1` means "ink" in canonical polarity:
//! dark content is `1` unless the thresholder's own `invert` flag was set.
//! Printer polarity is a separate, later decision made by the bit packer
//! (see [`pack`]).
//!
//! ## Module Structure
//!
//! - [`rasterize`]: rotation, aspect-preserving scale, BT.601 luma
//! - [`threshold`]: global average-brightness threshold
//! - [`pad`]: right-pad rows to a multiple of 8
//! - [`pack`]: MSB-first bit packing with printer polarity

pub mod pack;
pub mod pad;
pub mod rasterize;
pub mod threshold;

pub use pad::pad;
pub use rasterize::rasterize;
pub use threshold::threshold;

use crate::error::{LabelprintError, Result};

/// Widest page both encoders can address: ESC/POS carries the row width in
/// bytes as a 16-bit `xL xH` pair.
pub const MAX_WIDTH_DOTS: usize = u16::MAX as usize * 8;

// ============================================================================
// RASTER IMAGE
// ============================================================================

/// 8-bit luminance image, row-major, no alpha.
///
/// Produced once per page and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    luma: Vec<u8>,
}

impl RasterImage {
    /// Wrap a luminance buffer.
    ///
    /// Fails with `InvalidInput` if either dimension is zero or the buffer
    /// length is not `width * height`.
    pub fn new(width: usize, height: usize, luma: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LabelprintError::InvalidInput(format!(
                "raster image must have non-zero dimensions, got {}x{}",
                width, height
            )));
        }
        if luma.len() != width * height {
            return Err(LabelprintError::InvalidInput(format!(
                "luminance buffer holds {} bytes, expected {} ({}x{})",
                luma.len(),
                width * height,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// A raster where every pixel has the same luminance.
    pub fn uniform(width: usize, height: usize, value: u8) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major luminance values.
    #[inline]
    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    /// Luminance at (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.luma[y * self.width + x]
    }
}

// ============================================================================
// BIT BUFFER
// ============================================================================

/// One byte per pixel, each exactly 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl BitBuffer {
    /// Wrap a 0/1 pixel buffer, validating length and values.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        check_bits(width, height, &pixels)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Constructor for producers that already guarantee the invariants.
    pub(crate) fn from_parts(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Number of pixels set to 1.
    pub fn count_ones(&self) -> usize {
        self.pixels.iter().filter(|&&p| p == 1).count()
    }
}

// ============================================================================
// PAGE
// ============================================================================

/// # Canonical Page
///
/// The unit both encoders consume.
///
/// ## Invariants
///
/// | Invariant | Checked by |
/// |-----------|------------|
/// | `width % 8 == 0` | [`Page::new`] |
/// | `width <= MAX_WIDTH_DOTS` | [`Page::new`], [`rasterize`] |
/// | `pixels.len() == width * height` | [`Page::new`] |
/// | every pixel is 0 or 1 | [`Page::new`] |
///
/// Padding columns added by [`pad`] are 0 (non-printing in canonical
/// polarity). A page is created once per source page and consumed by one
/// encoder call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
}

impl Page {
    /// Build a page, enforcing every invariant.
    ///
    /// Fails with `Precondition` when the width is not byte-aligned or the
    /// buffer is malformed.
    pub fn new(pixels: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        if width % 8 != 0 {
            return Err(LabelprintError::Precondition(format!(
                "page width {} is not a multiple of 8",
                width
            )));
        }
        if width > MAX_WIDTH_DOTS {
            return Err(LabelprintError::Precondition(format!(
                "page width {} exceeds {} dots",
                width, MAX_WIDTH_DOTS
            )));
        }
        check_bits(width, height, &pixels).map_err(|e| match e {
            LabelprintError::InvalidInput(msg) => LabelprintError::Precondition(msg),
            other => other,
        })?;
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// Constructor for the padder, which guarantees the invariants.
    pub(crate) fn from_parts(pixels: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(width % 8, 0);
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width in bytes once packed (always `width / 8`).
    #[inline]
    pub fn width_bytes(&self) -> usize {
        self.width / 8
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Canonical pixels of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Iterate over rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks_exact panics on 0; a zero-width page has no rows to yield
        self.pixels.chunks_exact(self.width.max(1))
    }
}

fn check_bits(width: usize, height: usize, pixels: &[u8]) -> Result<()> {
    if pixels.len() != width * height {
        return Err(LabelprintError::InvalidInput(format!(
            "pixel buffer holds {} values, expected {} ({}x{})",
            pixels.len(),
            width * height,
            width,
            height
        )));
    }
    if let Some(pos) = pixels.iter().position(|&p| p > 1) {
        return Err(LabelprintError::InvalidInput(format!(
            "pixel {} has value {}, expected 0 or 1",
            pos, pixels[pos]
        )));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_image_rejects_zero_dimensions() {
        assert!(RasterImage::new(0, 4, vec![]).is_err());
        assert!(RasterImage::new(4, 0, vec![]).is_err());
    }

    #[test]
    fn test_raster_image_rejects_wrong_length() {
        let err = RasterImage::new(4, 4, vec![0; 15]).unwrap_err();
        assert!(matches!(err, LabelprintError::InvalidInput(_)));
    }

    #[test]
    fn test_raster_image_get() {
        let img = RasterImage::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(img.get(1, 0), 2);
        assert_eq!(img.get(0, 1), 3);
    }

    #[test]
    fn test_bit_buffer_rejects_non_binary() {
        assert!(BitBuffer::new(2, 1, vec![0, 2]).is_err());
        assert!(BitBuffer::new(2, 1, vec![0, 1]).is_ok());
    }

    #[test]
    fn test_page_requires_byte_aligned_width() {
        let err = Page::new(vec![0; 12], 12, 1).unwrap_err();
        assert!(matches!(err, LabelprintError::Precondition(_)));
    }

    #[test]
    fn test_page_rejects_bad_buffer_as_precondition() {
        let err = Page::new(vec![0; 7], 8, 1).unwrap_err();
        assert!(matches!(err, LabelprintError::Precondition(_)));

        let err = Page::new(vec![3; 8], 8, 1).unwrap_err();
        assert!(matches!(err, LabelprintError::Precondition(_)));
    }

    #[test]
    fn test_page_rejects_width_beyond_header_range() {
        let width = MAX_WIDTH_DOTS + 8;
        let err = Page::new(vec![0; width], width, 1).unwrap_err();
        assert!(matches!(err, LabelprintError::Precondition(_)));

        let page = Page::new(vec![0; MAX_WIDTH_DOTS], MAX_WIDTH_DOTS, 1).unwrap();
        assert_eq!(page.width_bytes(), u16::MAX as usize);
    }

    #[test]
    fn test_page_rows() {
        let mut pixels = vec![0; 16];
        pixels[8] = 1;
        let page = Page::new(pixels, 8, 2).unwrap();
        assert_eq!(page.width_bytes(), 1);
        assert_eq!(page.rows().count(), 2);
        assert_eq!(page.row(1)[0], 1);
    }
}
