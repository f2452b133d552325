//! # Bit Packing
//!
//! Packs canonical 0/1 pixels into bytes for both printer languages.
//!
//! ## Layout
//!
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//!
//! ```text
//! Pixels 1 1 0 0 1 0 1 0  →  0xCA
//! ```
//!
//! ## Printer Polarity
//!
//! Both encoders take an `invert` flag describing the firmware's polarity,
//! not the user's intent:
//!
//! | `invert` | canonical 1 | canonical 0 |
//! |----------|-------------|-------------|
//! | `false`  | bit 0       | bit 1       |
//! | `true`   | bit 1       | bit 0       |
//!
//! This is layered on top of the thresholder's own invert flag; the two are
//! never merged.

/// Pack one row of canonical pixels, appending the bytes to `out`.
///
/// A trailing partial group is padded with canonical 0 pixels, which are then
/// subject to the same polarity flip as every other pixel.
pub fn pack_row_into(out: &mut Vec<u8>, row: &[u8], invert: bool) {
    for group in row.chunks(8) {
        let mut byte = 0u8;
        for bit in 0..8 {
            let canonical = group.get(bit).copied().unwrap_or(0) & 1;
            let value = if invert { canonical } else { canonical ^ 1 };
            byte |= value << (7 - bit);
        }
        out.push(byte);
    }
}

/// Pack one row of canonical pixels into a new byte vector.
///
/// ## Example
///
/// ```
/// use labelprint::raster::pack::pack_row;
///
/// let row = [1, 1, 0, 0, 1, 0, 1, 0];
/// assert_eq!(pack_row(&row, true), vec![0xCA]);
/// assert_eq!(pack_row(&row, false), vec![0x35]);
/// ```
pub fn pack_row(row: &[u8], invert: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(row.len().div_ceil(8));
    pack_row_into(&mut out, row, invert);
    out
}

// ============================================================================
// TESTS
// ============================================================================
