//! # Print Pipeline
//!
//! Glues the page source, raster stages and encoders into one job.
//!
//! ```text
//! document ─► PageSource ─► [RgbImage] ─┬─ page 1: rotate → scale → luma → threshold → pad ─┐
//!                                       ├─ page 2: ...                                      ├─► [Page] ─► encoder ─► bytes
//!                                       └─ page n: ...                                      ┘
//! ```
//!
//! Pages are independent, so they are rasterized in parallel on the rayon
//! pool; the output keeps the input order. Encoding is a single pass over
//! the finished pages and either returns the whole buffer or nothing.

use std::path::Path;

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{LabelprintError, Result};
use crate::pdf::PageSource;
use crate::printer::{CommandSet, PrintOptions};
use crate::protocol::{escpos, tspl};
use crate::raster::{self, Page};

/// A fully encoded job.
#[derive(Debug, Clone)]
pub struct PrintJob {
    /// Canonical pages the commands were built from
    pub pages: Vec<Page>,
    /// Command stream ready for a transport
    pub commands: Vec<u8>,
}

/// Rasterize one page image at the given dot width.
pub fn rasterize_page(img: &RgbImage, options: &PrintOptions, width_dots: usize) -> Result<Page> {
    let luma = raster::rasterize(img, width_dots, options.rotate)?;
    let bits = raster::threshold(&luma, options.invert);
    Ok(raster::pad(bits))
}

/// Rasterize page images in parallel, preserving order.
pub fn rasterize_pages(images: &[RgbImage], options: &PrintOptions) -> Result<Vec<Page>> {
    if images.is_empty() {
        return Err(LabelprintError::InvalidInput("document has no pages".into()));
    }
    let width_dots = options.target_width_dots()?;
    debug!(
        "Rasterizing {} pages at {} dots wide (rotate: {}, invert: {})",
        images.len(),
        width_dots,
        options.rotate,
        options.invert
    );

    images
        .par_iter()
        .map(|img| rasterize_page(img, options, width_dots))
        .collect()
}

/// Encode finished pages with the configured command set.
pub fn encode(pages: &[Page], options: &PrintOptions) -> Vec<u8> {
    match options.command_set {
        CommandSet::EscPos => escpos::encode_with(pages, &options.escpos_options()),
        CommandSet::Tspl => tspl::encode(pages, &options.tspl_options()),
    }
}

/// Rasterize and encode already-decoded page images.
pub fn job_from_images(images: &[RgbImage], options: &PrintOptions) -> Result<PrintJob> {
    let pages = rasterize_pages(images, options)?;
    let commands = encode(&pages, options);
    info!(
        "Encoded {} page(s) as {}: {} bytes",
        pages.len(),
        options.command_set,
        commands.len()
    );
    debug!("First bytes: {}", hex_preview(&commands, 64));
    Ok(PrintJob { pages, commands })
}

/// Render a document from disk and encode it.
pub fn build_job(source: &dyn PageSource, path: &Path, options: &PrintOptions) -> Result<PrintJob> {
    let images = source.render_pages(path)?;
    info!("Loaded {} page(s) from {}", images.len(), path.display());
    job_from_images(&images, options)
}

/// Render an in-memory document and encode it.
pub fn build_job_from_bytes(
    source: &dyn PageSource,
    data: &[u8],
    options: &PrintOptions,
) -> Result<PrintJob> {
    let images = source.render_bytes(data)?;
    info!("Loaded {} page(s) from {} byte document", images.len(), data.len());
    job_from_images(&images, options)
}

/// Hex dump of at most `limit` leading bytes, space separated.
///
/// ```
/// use labelprint::pipeline::hex_preview;
///
/// assert_eq!(hex_preview(&[0x1B, 0x40, 0x0A], 2), "1b 40 ...");
/// assert_eq!(hex_preview(&[0x1B, 0x40], 64), "1b 40");
/// ```
pub fn hex_preview(data: &[u8], limit: usize) -> String {
    let mut out = data
        .iter()
        .take(limit)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if data.len() > limit {
        out.push_str(" ...");
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Black left half, white right half.
    fn half_black(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    fn options(command_set: CommandSet, width_dots: u32) -> PrintOptions {
        PrintOptions {
            command_set,
            width_dots: Some(width_dots),
            ..Default::default()
        }
    }

    #[test]
    fn test_rasterize_pages_scales_and_pads() {
        let pages = rasterize_pages(&[half_black(20, 10)], &options(CommandSet::EscPos, 12)).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].width(), 16);
        assert_eq!(pages[0].height(), 6);
        // padding columns are canonical 0
        assert!(pages[0].rows().all(|row| row[12..].iter().all(|&p| p == 0)));
    }

    #[test]
    fn test_dark_content_is_canonical_one() {
        let pages = rasterize_pages(&[half_black(16, 4)], &options(CommandSet::EscPos, 16)).unwrap();
        let row = pages[0].row(0);
        assert_eq!(&row[..4], &[1, 1, 1, 1]);
        assert_eq!(&row[12..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_rasterize_preserves_page_order() {
        let images: Vec<RgbImage> = (1..=6).map(|h| half_black(16, h * 2)).collect();
        let pages = rasterize_pages(&images, &options(CommandSet::Tspl, 16)).unwrap();
        let heights: Vec<usize> = pages.iter().map(Page::height).collect();
        assert_eq!(heights, vec![2, 4, 6, 8, 10, 12]);
    }

    #[test]
    fn test_no_pages_is_invalid() {
        assert!(matches!(
            rasterize_pages(&[], &PrintOptions::default()),
            Err(LabelprintError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_encode_dispatches_on_command_set() {
        let images = [half_black(16, 8)];
        let escpos = job_from_images(&images, &options(CommandSet::EscPos, 16)).unwrap();
        assert_eq!(&escpos.commands[..2], &[0x1B, 0x40]);
        assert_eq!(
            escpos.commands.len(),
            escpos::encoded_len(&escpos.pages, false)
        );

        let tspl = job_from_images(&images, &options(CommandSet::Tspl, 16)).unwrap();
        assert!(tspl.commands.starts_with(b"SIZE 58 mm,10 mm\r\n"));
    }

    #[test]
    fn test_default_polarity_sends_ink_as_zero_bits() {
        let job = job_from_images(&[half_black(16, 1)], &options(CommandSet::EscPos, 16)).unwrap();
        // preamble (5) + header (8), then the two row bytes
        assert_eq!(&job.commands[13..15], &[0x00, 0xFF]);
    }

    #[test]
    fn test_printer_invert_sends_ink_as_one_bits() {
        let mut opts = options(CommandSet::EscPos, 16);
        opts.printer_invert = true;
        let job = job_from_images(&[half_black(16, 1)], &opts).unwrap();
        assert_eq!(&job.commands[13..15], &[0xFF, 0x00]);
    }

    #[test]
    fn test_both_inverts_compose() {
        let mut opts = options(CommandSet::EscPos, 16);
        opts.invert = true;
        opts.printer_invert = true;
        let job = job_from_images(&[half_black(16, 1)], &opts).unwrap();
        // light half is canonical 1 and goes out unflipped
        assert_eq!(&job.pages[0].row(0)[..8], &[0u8; 8]);
        assert_eq!(&job.commands[13..15], &[0x00, 0xFF]);

        opts.printer_invert = false;
        let job = job_from_images(&[half_black(16, 1)], &opts).unwrap();
        assert_eq!(&job.commands[13..15], &[0xFF, 0x00]);
    }

    #[test]
    fn test_rotated_page_is_scaled_then_thresholded() {
        // Top half dark; clockwise rotation moves it to the right
        let src = RgbImage::from_fn(32, 16, |_, y| {
            if y < 8 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let mut opts = options(CommandSet::EscPos, 8);
        opts.rotate = true;
        let pages = rasterize_pages(&[src], &opts).unwrap();

        assert_eq!((pages[0].width(), pages[0].height()), (8, 16));
        for row in pages[0].rows() {
            assert_eq!(row, &[0, 0, 0, 0, 1, 1, 1, 1]);
        }
    }

    #[test]
    fn test_hex_preview() {
        assert_eq!(hex_preview(&[], 64), "");
        assert_eq!(hex_preview(&[0x00, 0xFF, 0x10], 3), "00 ff 10");
        assert_eq!(hex_preview(&[0x00, 0xFF, 0x10], 1), "00 ...");
    }
}
