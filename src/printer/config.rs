//! # Print Configuration
//!
//! Per-job settings shared by the CLI, the HTTP service and the pipeline.
//!
//! ## Paper Width Defaults
//!
//! When no explicit dot width is given, the raster width follows the paper:
//!
//! | Paper | ESC/POS | TSPL |
//! |-------|---------|------|
//! | 58 mm | 384 dots | 464 dots |
//! | 80 mm | 576 dots | 640 dots |
//! | other | `floor(mm × dpi / 25.4)` | `floor(mm × dpi / 25.4)` |
//!
//! Receipt printers with 58 mm paper only print 48 mm of it, hence the
//! narrower ESC/POS widths.
//!
//! ## Usage
//!
//! ```
//! use labelprint::printer::{CommandSet, PrintOptions};
//!
//! let options = PrintOptions {
//!     command_set: "tspl".parse().unwrap(),
//!     ..Default::default()
//! };
//! assert_eq!(options.command_set, CommandSet::Tspl);
//! assert_eq!(options.target_width_dots().unwrap(), 464);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diagnostics::CalibrationParams;
use crate::error::{LabelprintError, Result};
use crate::protocol::escpos::EscPosOptions;
use crate::protocol::tspl::TsplOptions;

// ============================================================================
// COMMAND SET
// ============================================================================

/// Printer command language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CommandSet {
    /// ESC/POS raster (`GS v 0`) for receipt printers
    #[default]
    EscPos,
    /// TSPL `BITMAP` labels for label printers
    Tspl,
}

impl CommandSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EscPos => "escpos",
            Self::Tspl => "tspl",
        }
    }
}

impl fmt::Display for CommandSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandSet {
    type Err = LabelprintError;

    /// Accepts `"tspl"`, `"escpos"` and `"esc/pos"`, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "escpos" | "esc/pos" => Ok(Self::EscPos),
            "tspl" => Ok(Self::Tspl),
            other => Err(LabelprintError::InvalidInput(format!(
                "unknown command set '{}', use 'escpos' or 'tspl'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for CommandSet {
    type Error = LabelprintError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ============================================================================
// PRINT OPTIONS
// ============================================================================

/// # Print Options
///
/// Everything needed to turn a document into a command stream.
///
/// ## Two Invert Flags
///
/// - **invert**: thresholder polarity. Swaps which pixels are canonical 1.
/// - **printer_invert**: encoder polarity. `false` flips every bit on the
///   wire, `true` sends canonical bits unchanged.
///
/// Both default to `false`, which prints dark content as ink on the common
/// firmware that treats a 0 bit as a burned dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Paper width in mm
    pub paper_width_mm: u32,
    /// Paper height in mm; 0 derives the label height from each page
    pub paper_height_mm: u32,
    /// Rasterization resolution, also used for the width fallback
    pub dpi: u32,
    /// Explicit raster width in dots, overriding the paper table
    pub width_dots: Option<u32>,
    /// Horizontal offset in dots (TSPL only)
    pub margin_x: i32,
    /// Vertical offset in dots (TSPL only)
    pub margin_y: i32,
    /// ESC/POS raster mode; only bit 0 reaches the printer
    pub mode: u8,
    /// TSPL print speed
    pub speed: u32,
    /// TSPL darkness, 0-15
    pub density: u32,
    pub invert: bool,
    pub printer_invert: bool,
    /// Rotate each page 90° clockwise before scaling
    pub rotate: bool,
    pub command_set: CommandSet,
    /// Prefix ESC/POS jobs with the printer-detect query
    pub probe: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            paper_width_mm: 58,
            paper_height_mm: 0,
            dpi: 203,
            width_dots: None,
            margin_x: 0,
            margin_y: 0,
            mode: 0,
            speed: 4,
            density: 8,
            invert: false,
            printer_invert: false,
            rotate: false,
            command_set: CommandSet::EscPos,
            probe: false,
        }
    }
}

impl PrintOptions {
    /// Raster width in dots for this job.
    ///
    /// ## Example
    ///
    /// ```
    /// use labelprint::printer::{CommandSet, PrintOptions};
    ///
    /// let mut options = PrintOptions::default();
    /// assert_eq!(options.target_width_dots().unwrap(), 384);
    ///
    /// options.paper_width_mm = 100;
    /// assert_eq!(options.target_width_dots().unwrap(), 799);
    ///
    /// options.width_dots = Some(512);
    /// assert_eq!(options.target_width_dots().unwrap(), 512);
    /// ```
    pub fn target_width_dots(&self) -> Result<usize> {
        let dots = match (self.width_dots, self.paper_width_mm, self.command_set) {
            (Some(explicit), _, _) => explicit as usize,
            (None, 58, CommandSet::EscPos) => 384,
            (None, 58, CommandSet::Tspl) => 464,
            (None, 80, CommandSet::EscPos) => 576,
            (None, 80, CommandSet::Tspl) => 640,
            (None, mm, _) => (mm as f64 * self.dpi as f64 / 25.4) as usize,
        };

        if dots == 0 {
            return Err(LabelprintError::InvalidInput(format!(
                "target width is 0 dots (paper {} mm at {} DPI)",
                self.paper_width_mm, self.dpi
            )));
        }
        Ok(dots)
    }

    pub fn escpos_options(&self) -> EscPosOptions {
        EscPosOptions {
            mode: self.mode,
            invert: self.printer_invert,
            probe: self.probe,
        }
    }

    pub fn tspl_options(&self) -> TsplOptions {
        TsplOptions {
            paper_width_mm: self.paper_width_mm,
            paper_height_mm: self.paper_height_mm,
            speed: self.speed,
            density: self.density,
            margin_x: self.margin_x,
            margin_y: self.margin_y,
            invert: self.printer_invert,
        }
    }

    /// Settings for the diagnostic labels, which always use the literal
    /// paper height.
    pub fn calibration_params(&self) -> CalibrationParams {
        CalibrationParams {
            width_mm: self.paper_width_mm,
            height_mm: self.paper_height_mm,
            speed: self.speed,
            density: self.density,
            margin_x: self.margin_x,
            margin_y: self.margin_y,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn with(paper: u32, command_set: CommandSet) -> PrintOptions {
        PrintOptions {
            paper_width_mm: paper,
            command_set,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let options = PrintOptions::default();
        assert_eq!(options.paper_width_mm, 58);
        assert_eq!(options.paper_height_mm, 0);
        assert_eq!(options.dpi, 203);
        assert_eq!((options.speed, options.density), (4, 8));
        assert_eq!(options.command_set, CommandSet::EscPos);
        assert!(!options.invert && !options.printer_invert && !options.rotate);
    }

    #[test]
    fn test_width_table() {
        assert_eq!(with(58, CommandSet::EscPos).target_width_dots().unwrap(), 384);
        assert_eq!(with(58, CommandSet::Tspl).target_width_dots().unwrap(), 464);
        assert_eq!(with(80, CommandSet::EscPos).target_width_dots().unwrap(), 576);
        assert_eq!(with(80, CommandSet::Tspl).target_width_dots().unwrap(), 640);
    }

    #[test]
    fn test_width_fallback_floors() {
        // 100 * 203 / 25.4 = 799.2
        assert_eq!(with(100, CommandSet::Tspl).target_width_dots().unwrap(), 799);
        // 40 * 203 / 25.4 = 319.68
        assert_eq!(with(40, CommandSet::EscPos).target_width_dots().unwrap(), 319);

        let mut options = with(100, CommandSet::EscPos);
        options.dpi = 300;
        assert_eq!(options.target_width_dots().unwrap(), 1181);
    }

    #[test]
    fn test_zero_width_is_invalid() {
        assert!(matches!(
            with(0, CommandSet::EscPos).target_width_dots(),
            Err(LabelprintError::InvalidInput(_))
        ));
        let options = PrintOptions {
            width_dots: Some(0),
            ..Default::default()
        };
        assert!(options.target_width_dots().is_err());
    }

    #[test]
    fn test_command_set_parsing() {
        assert_eq!("tspl".parse::<CommandSet>().unwrap(), CommandSet::Tspl);
        assert_eq!("TSPL".parse::<CommandSet>().unwrap(), CommandSet::Tspl);
        assert_eq!("escpos".parse::<CommandSet>().unwrap(), CommandSet::EscPos);
        assert_eq!("ESC/POS".parse::<CommandSet>().unwrap(), CommandSet::EscPos);
        assert!(matches!(
            "zpl".parse::<CommandSet>(),
            Err(LabelprintError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_serde_defaults_and_command_set() {
        let options: PrintOptions =
            serde_json::from_str(r#"{"command_set": "Tspl", "paper_height_mm": 30}"#).unwrap();
        assert_eq!(options.command_set, CommandSet::Tspl);
        assert_eq!(options.paper_height_mm, 30);
        assert_eq!(options.paper_width_mm, 58);

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["command_set"], "tspl");

        assert!(serde_json::from_str::<PrintOptions>(r#"{"command_set": "zpl"}"#).is_err());
    }

    #[test]
    fn test_encoder_options_use_printer_invert() {
        let options = PrintOptions {
            invert: true,
            printer_invert: false,
            mode: 3,
            margin_x: 8,
            ..Default::default()
        };
        let escpos = options.escpos_options();
        assert_eq!(escpos.mode, 3);
        assert!(!escpos.invert);
        let tspl = options.tspl_options();
        assert!(!tspl.invert);
        assert_eq!(tspl.margin_x, 8);
    }
}
