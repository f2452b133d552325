//! # ESC/POS Commands
//!
//! Binary command set used by most 58/80 mm receipt printers.
//!
//! ## Job Layout
//!
//! ```text
//! [10 04 02]                     optional printer-detect query (probe)
//! 1B 40                          ESC @      initialize
//! 1B 33 00                       ESC 3 0    line spacing 0
//! ┌ per page ───────────────────────────────────────────────┐
//! │ per row: 1D 76 30 m xL xH 01 00 d1..dk   GS v 0, 1 row   │
//! │ 1D 56 42 01                             GS V B 1  cut    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every image row is sent as its own one-dot-high `GS v 0` block; with line
//! spacing at zero the rows abut without gaps.
//!
//! ## Byte Count
//!
//! ```text
//! len = 5 + Σ pages (height × (width/8 + 8) + 4)      (+3 with probe)
//! ```

use tracing::debug;

use crate::raster::{Page, pack};

// ============================================================================
// CONTROL BYTES
// ============================================================================

/// ESC (Escape) - command prefix
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - extended command prefix
pub const GS: u8 = 0x1D;

/// DLE (Data Link Escape) - real-time command prefix
pub const DLE: u8 = 0x10;

/// US (Unit Separator) - vendor command prefix
pub const US: u8 = 0x1F;

/// LF (Line Feed) - print buffer and advance one line
pub const LF: u8 = 0x0A;

/// Size of the `GS v 0` header preceding each row
pub const RASTER_HEADER_LEN: usize = 8;

// ============================================================================
// BASIC COMMANDS
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// | Format | Bytes |
/// |--------|-------|
/// | ASCII  | ESC @ |
/// | Hex    | 1B 40 |
///
/// ```
/// use labelprint::protocol::escpos;
///
/// assert_eq!(escpos::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Set Line Spacing (ESC 3 n)
///
/// Line spacing in dots. The image encoder uses `n = 0` so consecutive
/// one-row raster blocks touch.
///
/// | Format | Bytes    |
/// |--------|----------|
/// | ASCII  | ESC 3 n  |
/// | Hex    | 1B 33 n  |
#[inline]
pub fn line_spacing(n: u8) -> Vec<u8> {
    vec![ESC, b'3', n]
}

/// # Feed and Partial Cut (GS V B n)
///
/// Feeds `n` lines then cuts. The encoder always uses `n = 1`.
///
/// | Format | Bytes        |
/// |--------|--------------|
/// | ASCII  | GS V B 1     |
/// | Hex    | 1D 56 42 01  |
#[inline]
pub fn cut() -> Vec<u8> {
    vec![GS, b'V', b'B', 0x01]
}

/// # Printer Detect Query (DLE EOT STX)
///
/// Real-time status request; compatible printers answer with one status
/// byte. Bytes `10 04 02`.
#[inline]
pub fn query() -> Vec<u8> {
    vec![DLE, 0x04, 0x02]
}

/// # Self-Test (US VT EOT)
///
/// Vendor command that prints the printer's own test page on common
/// portable printers. Bytes `1F 11 04`.
#[inline]
pub fn self_test() -> Vec<u8> {
    vec![US, 0x11, 0x04]
}

/// # Beep (ESC B m n)
///
/// Sounds the buzzer `m` times for `n × 50 ms`. The diagnostic uses
/// `m = n = 3`: bytes `1B 42 03 03`.
#[inline]
pub fn beep() -> Vec<u8> {
    vec![ESC, b'B', 0x03, 0x03]
}

/// # Line Feed (LF)
#[inline]
pub fn line_feed() -> Vec<u8> {
    vec![LF]
}

// ============================================================================
// RASTER GRAPHICS (GS v 0)
// ============================================================================

/// # Raster Row Header (GS v 0 m xL xH yL yH)
///
/// | Byte | Value | Meaning |
/// |------|-------|---------|
/// | 0-2  | `1D 76 30` | GS v 0 |
/// | 3    | `mode & 1` | raster mode, low bit only |
/// | 4-5  | `xL xH` | width in bytes, little-endian |
/// | 6-7  | `01 00` | height: one dot row |
///
/// Only bit 0 of `mode` reaches the printer. Higher bits (double height,
/// quadruple) are accepted and ignored.
///
/// ```
/// use labelprint::protocol::escpos;
///
/// assert_eq!(
///     escpos::raster_row_header(3, 300),
///     [0x1D, 0x76, 0x30, 0x01, 0x2C, 0x01, 0x01, 0x00]
/// );
/// ```
#[inline]
pub fn raster_row_header(mode: u8, width_bytes: u16) -> [u8; RASTER_HEADER_LEN] {
    let [xl, xh] = width_bytes.to_le_bytes();
    [GS, b'v', b'0', mode & 1, xl, xh, 0x01, 0x00]
}

/// Append one page as per-row raster blocks followed by a cut.
fn push_page(buf: &mut Vec<u8>, page: &Page, mode: u8, invert: bool) {
    let width_bytes = page.width_bytes();
    // Page::new caps the width at MAX_WIDTH_DOTS, so this always fits xL/xH
    debug_assert!(width_bytes <= u16::MAX as usize);
    let header = raster_row_header(mode, width_bytes as u16);

    for y in 0..page.height() {
        buf.extend_from_slice(&header);
        pack::pack_row_into(buf, page.row(y), invert);
    }
    buf.extend(cut());
}

// ============================================================================
// ENCODER
// ============================================================================

/// Options for [`encode_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscPosOptions {
    /// Raster mode; only bit 0 is encoded.
    pub mode: u8,
    /// Printer polarity. `false` flips every canonical bit before packing.
    pub invert: bool,
    /// Prefix the job with the `DLE EOT STX` printer-detect query.
    pub probe: bool,
}

/// Encode pages as an ESC/POS byte stream.
///
/// Emits `ESC @`, `ESC 3 0` once, then every page row by row, each page
/// followed by a cut.
///
/// ## Example
///
/// ```
/// use labelprint::protocol::escpos;
/// use labelprint::raster::Page;
///
/// let page = Page::new(vec![1; 16 * 8], 16, 8).unwrap();
/// let out = escpos::encode(&[page], 0, true);
///
/// assert_eq!(&out[..5], &[0x1B, 0x40, 0x1B, 0x33, 0x00]);
/// assert_eq!(&out[5..15], &[0x1D, 0x76, 0x30, 0x00, 0x02, 0x00, 0x01, 0x00, 0xFF, 0xFF]);
/// assert_eq!(&out[out.len() - 4..], &[0x1D, 0x56, 0x42, 0x01]);
/// ```
pub fn encode(pages: &[Page], mode: u8, invert: bool) -> Vec<u8> {
    encode_with(
        pages,
        &EscPosOptions {
            mode,
            invert,
            probe: false,
        },
    )
}

/// Encode pages with explicit [`EscPosOptions`].
pub fn encode_with(pages: &[Page], options: &EscPosOptions) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(pages, options.probe));

    if options.probe {
        buf.extend(query());
    }
    buf.extend(init());
    buf.extend(line_spacing(0));

    for (i, page) in pages.iter().enumerate() {
        debug!(
            "ESC/POS page {} ({}x{}, mode {})",
            i + 1,
            page.width(),
            page.height(),
            options.mode
        );
        push_page(&mut buf, page, options.mode, options.invert);
    }

    buf
}

/// Exact length of the stream [`encode_with`] produces.
pub fn encoded_len(pages: &[Page], probe: bool) -> usize {
    let probe_len = if probe { query().len() } else { 0 };
    probe_len
        + init().len()
        + line_spacing(0).len()
        + pages
            .iter()
            .map(|p| p.height() * (p.width_bytes() + RASTER_HEADER_LEN) + cut().len())
            .sum::<usize>()
}

// ============================================================================
// TESTS
// ============================================================================
