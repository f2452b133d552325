//! # Page Preview
//!
//! Renders canonical pages to PNG so a job can be checked without paper.
//!
//! Canonical `1` pixels are drawn black and `0` pixels white, which is what
//! the printer produces when the encoder polarity matches the firmware.
//! Padding columns show up as a white strip on the right.
//!
//! ## Example
//!
//! ```
//! use labelprint::preview::render_png;
//! use labelprint::raster::Page;
//!
//! let page = Page::new(vec![1; 8 * 2], 8, 2).unwrap();
//! let png = render_png(&page).unwrap();
//! assert_eq!(&png[1..4], b"PNG");
//! ```

use std::path::Path;

use image::{GrayImage, ImageEncoder, Luma};

use crate::error::{LabelprintError, Result};
use crate::raster::Page;

/// Draw a page as an 8-bit grayscale image.
pub fn page_to_image(page: &Page) -> GrayImage {
    let mut img = GrayImage::new(page.width() as u32, page.height() as u32);
    for (y, row) in page.rows().enumerate() {
        for (x, &bit) in row.iter().enumerate() {
            let color = if bit == 1 { 0u8 } else { 255u8 };
            img.put_pixel(x as u32, y as u32, Luma([color]));
        }
    }
    img
}

/// Encode a page as PNG bytes.
pub fn render_png(page: &Page) -> Result<Vec<u8>> {
    let img = page_to_image(page);
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .map_err(|e| LabelprintError::Image(e.to_string()))?;
    Ok(png_bytes)
}

/// Write a page preview to a PNG file.
pub fn save_png(page: &Page, path: &Path) -> Result<()> {
    std::fs::write(path, render_png(page)?)?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ink_is_black() {
        let page = Page::new(vec![1, 0, 0, 0, 0, 0, 0, 1], 8, 1).unwrap();
        let img = page_to_image(&page);
        assert_eq!(img.get_pixel(0, 0).0, [0]);
        assert_eq!(img.get_pixel(1, 0).0, [255]);
        assert_eq!(img.get_pixel(7, 0).0, [0]);
    }

    #[test]
    fn test_png_round_trip_dimensions() {
        let page = Page::new(vec![0; 24 * 5], 24, 5).unwrap();
        let png = render_png(&page).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 5));
    }
}
