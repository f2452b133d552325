//! # Printer Command Languages
//!
//! Encoders that turn canonical [`Page`](crate::raster::Page)s into the byte
//! streams understood by thermal printers.
//!
//! ## Module Structure
//!
//! - [`escpos`]: ESC/POS raster (`GS v 0`) for receipt printers
//! - [`tspl`]: TSPL `BITMAP` labels for label printers
//!
//! ## Usage Example
//!
//! ```
//! use labelprint::protocol::{escpos, tspl};
//! use labelprint::raster::Page;
//!
//! let page = Page::new(vec![0; 16 * 4], 16, 4).unwrap();
//!
//! let receipt = escpos::encode(std::slice::from_ref(&page), 0, false);
//! let label = tspl::encode(&[page], &tspl::TsplOptions::default());
//!
//! assert_eq!(&receipt[..2], &[0x1B, 0x40]);
//! assert!(label.starts_with(b"SIZE 58 mm,"));
//! ```
//!
//! ## Bit Polarity
//!
//! Both encoders share [`crate::raster::pack`]: with `invert = false` every
//! canonical bit is flipped on the wire, with `invert = true` it is sent
//! as is.

pub mod escpos;
pub mod tspl;
