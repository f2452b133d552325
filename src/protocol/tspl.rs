//! # TSPL Commands
//!
//! Text command language used by TSC-style label printers. Every command is an
//! ASCII line terminated by `\r\n`; the only binary payload is the data of a
//! `BITMAP` command, which follows its header on the same line.
//!
//! ## Label Layout
//!
//! ```text
//! SIZE 58 mm,40 mm          label size
//! GAP 2 mm,0 mm             gap between labels
//! DIRECTION 1               print direction
//! SPEED 4                   inches per second
//! DENSITY 8                 darkness 0-15
//! CLS                       clear image buffer
//! BITMAP x,y,wb,h,0,<raw>   wb×h packed bytes, mode 0 (overwrite)
//! PRINT 1,1                 one set, one copy
//! ```
//!
//! Pages never share setup: each page re-emits the full block.
//!
//! [`TsplBuilder`] is shared by the page encoder and the diagnostic
//! generators in [`crate::diagnostics`], so every format string lives here.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::raster::{Page, pack};

/// Line terminator for every TSPL command
pub const CRLF: &[u8] = b"\r\n";

/// Smallest label height derived from an image, in mm
pub const MIN_DERIVED_HEIGHT_MM: u32 = 10;

// ============================================================================
// COMMAND BUILDER
// ============================================================================

/// # TSPL Command Builder
///
/// Accumulates TSPL commands into a byte buffer.
///
/// ```
/// use labelprint::protocol::tspl::TsplBuilder;
///
/// let mut b = TsplBuilder::new();
/// b.setup(58, 40, 4, 8).bar(10, 20, 2, 30).print(1, 1);
/// let out = String::from_utf8(b.build()).unwrap();
/// assert!(out.starts_with("SIZE 58 mm,40 mm\r\nGAP 2 mm,0 mm\r\n"));
/// assert!(out.ends_with("BAR 10,20,2,30\r\nPRINT 1,1\r\n"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct TsplBuilder {
    buf: Vec<u8>,
}

impl TsplBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-sized buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append one raw command line and its terminator.
    pub fn line(&mut self, command: impl Display) -> &mut Self {
        self.buf.extend_from_slice(command.to_string().as_bytes());
        self.buf.extend_from_slice(CRLF);
        self
    }

    /// `SIZE w mm,h mm`
    pub fn size_mm(&mut self, width_mm: u32, height_mm: u32) -> &mut Self {
        self.line(format_args!("SIZE {} mm,{} mm", width_mm, height_mm))
    }

    /// `GAP g mm,o mm`
    pub fn gap_mm(&mut self, gap_mm: u32, offset_mm: u32) -> &mut Self {
        self.line(format_args!("GAP {} mm,{} mm", gap_mm, offset_mm))
    }

    /// `DIRECTION n`
    pub fn direction(&mut self, direction: u8) -> &mut Self {
        self.line(format_args!("DIRECTION {}", direction))
    }

    /// `SPEED n`
    pub fn speed(&mut self, speed: u32) -> &mut Self {
        self.line(format_args!("SPEED {}", speed))
    }

    /// `DENSITY n`
    pub fn density(&mut self, density: u32) -> &mut Self {
        self.line(format_args!("DENSITY {}", density))
    }

    /// `CLS` - clear the image buffer
    pub fn cls(&mut self) -> &mut Self {
        self.line("CLS")
    }

    /// Standard label setup: `SIZE`, `GAP 2 mm,0 mm`, `DIRECTION 1`,
    /// `SPEED`, `DENSITY`, `CLS`.
    pub fn setup(&mut self, width_mm: u32, height_mm: u32, speed: u32, density: u32) -> &mut Self {
        self.size_mm(width_mm, height_mm)
            .gap_mm(2, 0)
            .direction(1)
            .speed(speed)
            .density(density)
            .cls()
    }

    /// `BITMAP x,y,width_bytes,height,0,<data>`
    ///
    /// `data` must hold `width_bytes * height` packed bytes. The binary payload
    /// directly follows the last comma and is terminated by `\r\n`.
    pub fn bitmap(
        &mut self,
        x: i32,
        y: i32,
        width_bytes: usize,
        height: usize,
        data: &[u8],
    ) -> &mut Self {
        debug_assert_eq!(data.len(), width_bytes * height);
        self.buf.extend_from_slice(
            format!("BITMAP {},{},{},{},0,", x, y, width_bytes, height).as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(CRLF);
        self
    }

    /// `BAR x,y,width,height` - filled rectangle
    pub fn bar(&mut self, x: i32, y: i32, width: i32, height: i32) -> &mut Self {
        self.line(format_args!("BAR {},{},{},{}", x, y, width, height))
    }

    /// `BOX x0,y0,x1,y1,thickness` - rectangle outline
    pub fn draw_box(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, thickness: i32) -> &mut Self {
        self.line(format_args!(
            "BOX {},{},{},{},{}",
            x0, y0, x1, y1, thickness
        ))
    }

    /// `TEXT x,y,"font",rotation,x_mul,y_mul,"content"`
    ///
    /// Double quotes in `content` are escaped as `\["]`.
    pub fn text(&mut self, x: i32, y: i32, font: &str, content: &str) -> &mut Self {
        self.line(format_args!(
            "TEXT {},{},\"{}\",0,1,1,\"{}\"",
            x,
            y,
            font,
            escape_text(content)
        ))
    }

    /// `PRINT sets,copies`
    pub fn print(&mut self, sets: u32, copies: u32) -> &mut Self {
        self.line(format_args!("PRINT {},{}", sets, copies))
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

fn escape_text(content: &str) -> String {
    content.replace('"', "\\[\"]")
}

// ============================================================================
// PAGE ENCODER
// ============================================================================

/// Label parameters for [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsplOptions {
    /// Label width in mm
    pub paper_width_mm: u32,
    /// Label height in mm; 0 derives it from each page's height
    pub paper_height_mm: u32,
    pub speed: u32,
    pub density: u32,
    /// Horizontal offset of the bitmap in dots
    pub margin_x: i32,
    /// Vertical offset of the bitmap in dots
    pub margin_y: i32,
    /// Printer polarity. `false` flips every canonical bit before packing.
    pub invert: bool,
}

impl Default for TsplOptions {
    fn default() -> Self {
        Self {
            paper_width_mm: 58,
            paper_height_mm: 0,
            speed: 4,
            density: 8,
            margin_x: 0,
            margin_y: 0,
            invert: false,
        }
    }
}

impl TsplOptions {
    /// Height in the `SIZE` command for a page `height_dots` tall.
    ///
    /// Configured height when non-zero, otherwise `max(10, height_dots / 8)`.
    pub fn label_height_mm(&self, height_dots: usize) -> u32 {
        if self.paper_height_mm > 0 {
            self.paper_height_mm
        } else {
            let derived = u32::try_from(height_dots / 8).unwrap_or(u32::MAX);
            derived.max(MIN_DERIVED_HEIGHT_MM)
        }
    }
}

/// Encode pages as TSPL, one complete label per page.
///
/// ## Example
///
/// ```
/// use labelprint::protocol::tspl::{self, TsplOptions};
/// use labelprint::raster::Page;
///
/// let page = Page::new(vec![1; 64], 8, 8).unwrap();
/// let options = TsplOptions { paper_width_mm: 30, invert: true, ..Default::default() };
/// let out = tspl::encode(&[page], &options);
///
/// let text = String::from_utf8_lossy(&out);
/// assert!(text.starts_with("SIZE 30 mm,10 mm\r\n"));
/// assert!(text.ends_with("\r\nPRINT 1,1\r\n"));
/// ```
pub fn encode(pages: &[Page], options: &TsplOptions) -> Vec<u8> {
    let capacity = pages
        .iter()
        .map(|p| p.width_bytes() * p.height() + 128)
        .sum();
    let mut builder = TsplBuilder::with_capacity(capacity);

    for (i, page) in pages.iter().enumerate() {
        let height_mm = options.label_height_mm(page.height());
        debug!(
            "TSPL page {} ({}x{} dots, label {}x{} mm)",
            i + 1,
            page.width(),
            page.height(),
            options.paper_width_mm,
            height_mm
        );

        let mut data = Vec::with_capacity(page.width_bytes() * page.height());
        for y in 0..page.height() {
            pack::pack_row_into(&mut data, page.row(y), options.invert);
        }

        builder
            .setup(
                options.paper_width_mm,
                height_mm,
                options.speed,
                options.density,
            )
            .bitmap(
                options.margin_x,
                options.margin_y,
                page.width_bytes(),
                page.height(),
                &data,
            )
            .print(1, 1);
    }

    builder.build()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SETUP_30X10: &str =
        "SIZE 30 mm,10 mm\r\nGAP 2 mm,0 mm\r\nDIRECTION 1\r\nSPEED 4\r\nDENSITY 8\r\nCLS\r\n";

    fn page(width: usize, height: usize, value: u8) -> Page {
        Page::new(vec![value; width * height], width, height).unwrap()
    }

    fn options_30mm(invert: bool) -> TsplOptions {
        TsplOptions {
            paper_width_mm: 30,
            paper_height_mm: 0,
            invert,
            ..Default::default()
        }
    }

    #[test]
    fn test_builder_setup_block() {
        let mut b = TsplBuilder::new();
        b.setup(30, 10, 4, 8);
        assert_eq!(b.as_bytes(), SETUP_30X10.as_bytes());
    }

    #[test]
    fn test_builder_shapes() {
        let mut b = TsplBuilder::new();
        b.draw_box(2, 2, 462, 318, 4).bar(0, 0, 2, 10).text(50, 80, "3", "Check margins");
        assert_eq!(
            String::from_utf8(b.build()).unwrap(),
            "BOX 2,2,462,318,4\r\nBAR 0,0,2,10\r\nTEXT 50,80,\"3\",0,1,1,\"Check margins\"\r\n"
        );
    }

    #[test]
    fn test_text_escapes_quotes() {
        let mut b = TsplBuilder::new();
        b.text(0, 0, "1", "say \"hi\"");
        assert_eq!(
            b.as_bytes(),
            b"TEXT 0,0,\"1\",0,1,1,\"say \\[\"]hi\\[\"]\"\r\n"
        );
    }

    #[test]
    fn test_encode_all_black_8x8() {
        let out = encode(&[page(8, 8, 1)], &options_30mm(true));

        let mut expected = SETUP_30X10.as_bytes().to_vec();
        expected.extend_from_slice(b"BITMAP 0,0,1,8,0,");
        expected.extend_from_slice(&[0xFF; 8]);
        expected.extend_from_slice(b"\r\nPRINT 1,1\r\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_encode_flips_bits_when_not_inverted() {
        let out = encode(&[page(8, 8, 1)], &options_30mm(false));
        let header = b"BITMAP 0,0,1,8,0,";
        let start = out
            .windows(header.len())
            .position(|w| w == header)
            .unwrap()
            + header.len();
        assert_eq!(&out[start..start + 8], &[0x00; 8]);
    }

    #[test]
    fn test_derived_height() {
        let options = options_30mm(true);
        assert_eq!(options.label_height_mm(8), 10);
        assert_eq!(options.label_height_mm(79), 10);
        assert_eq!(options.label_height_mm(320), 40);
        assert_eq!(options.label_height_mm(327), 40);
    }

    #[test]
    fn test_explicit_height_wins() {
        let options = TsplOptions {
            paper_height_mm: 25,
            ..Default::default()
        };
        assert_eq!(options.label_height_mm(8000), 25);
    }

    #[test]
    fn test_margins_in_bitmap_header() {
        let options = TsplOptions {
            margin_x: 16,
            margin_y: 4,
            ..Default::default()
        };
        let out = String::from_utf8_lossy(&encode(&[page(16, 2, 0)], &options)).into_owned();
        assert!(out.contains("BITMAP 16,4,2,2,0,"));
    }

    #[test]
    fn test_each_page_repeats_setup() {
        let out = encode(&[page(8, 8, 0), page(8, 8, 0)], &options_30mm(true));
        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.matches("SIZE 30 mm,10 mm\r\n").count(), 2);
        assert_eq!(text.matches("CLS\r\n").count(), 2);
        assert_eq!(text.matches("PRINT 1,1\r\n").count(), 2);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(encode(&[], &TsplOptions::default()).is_empty());
    }
}
