//! # labelprint - PDF to Thermal Printer Library
//!
//! labelprint turns PDF pages into monochrome rasters and sends them to
//! 203 DPI thermal printers. It provides:
//!
//! - **Rasterization**: scale to the paper width, BT.601 luma, threshold, pad
//! - **Protocol encoding**: ESC/POS `GS v 0` raster images and TSPL `BITMAP` labels
//! - **Diagnostics**: calibration grid, density sweep, DPI ruler, printer queries
//! - **Transport**: serial/Bluetooth RFCOMM, the Wi-Fi HTTP bridge, files
//! - **Server**: an HTTP print service
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use labelprint::{
//!     pdf::Pdftoppm,
//!     pipeline,
//!     printer::{CommandSet, PrintOptions},
//!     transport::SerialTransport,
//!     Transport,
//! };
//!
//! let options = PrintOptions {
//!     command_set: CommandSet::Tspl,
//!     paper_height_mm: 40,
//!     ..Default::default()
//! };
//!
//! // Render, rasterize and encode every page
//! let job = pipeline::build_job(&Pdftoppm::default(), Path::new("label.pdf"), &options)?;
//!
//! // Send to printer
//! let mut transport = SerialTransport::open("/dev/rfcomm0", 115200)?;
//! transport.write_all(&job.commands)?;
//!
//! # Ok::<(), labelprint::LabelprintError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`raster`] | Scaling, thresholding, padding, bit packing |
//! | [`protocol`] | ESC/POS and TSPL encoders |
//! | [`pipeline`] | Document to command stream |
//! | [`pdf`] | Page sources (`pdftoppm`, image files) |
//! | [`preview`] | PNG previews of rasterized pages |
//! | [`diagnostics`] | Calibration and printer test commands |
//! | [`transport`] | Communication backends |
//! | [`printer`] | Print options and command set selection |
//! | [`server`] | HTTP print service |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Tested with 58 mm ESC/POS receipt printers and TSPL label printers at
//! 203 DPI. 58 and 80 mm paper have fixed dot widths in
//! [`printer::PrintOptions::target_width_dots`]; any other width is computed
//! as `floor(mm * dpi / 25.4)`, or set directly with `width_dots`.

pub mod diagnostics;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod preview;
pub mod printer;
pub mod protocol;
pub mod raster;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use error::LabelprintError;
pub use printer::{CommandSet, PrintOptions};
pub use raster::Page;
pub use transport::Transport;
