//! # Diagnostic Labels
//!
//! Fixed command sequences for aligning and tuning a printer. None of these
//! consume a [`Page`](crate::raster::Page); they are pure functions of the
//! label geometry and print settings.
//!
//! ## TSPL Labels
//!
//! | Generator | Purpose |
//! |-----------|---------|
//! | [`calibration`] | Outline, crosshair and 5 mm ticks on an 8 dots/mm grid |
//! | [`density_sweep`] | One label per `DENSITY` level to pick the darkness |
//! | [`dpi_ruler`] | Millimetre ruler computed from the configured DPI |
//!
//! ## ESC/POS One-Shots
//!
//! | Command | Bytes |
//! |---------|-------|
//! | [`self_test`] | `1F 11 04` |
//! | [`beep`] | `1B 42 03 03` |
//! | [`query`] | `10 04 02` |
//! | [`connection_test`] | `1B 40 0A` |
//!
//! ## Calibration Grid
//!
//! ```text
//! (2,2) ┌────────────────────────────────┐
//!       │╷    ╷    ╷    ╷  ticks every 40 dots
//!       ├ Size: 58x40 mm                  │
//!       │ Check margins   ┼  centre       │
//!       ├                                 │
//!       └────────────────────────────────┘ (w*8-2, h*8-2)
//! ```
//!
//! The grid assumes 8 dots/mm whatever the printer's real resolution, so a
//! printer at another DPI shows the mismatch directly on paper. All
//! coordinates are shifted by the margins.

use serde::{Deserialize, Serialize};

use crate::error::{LabelprintError, Result};
use crate::protocol::escpos;
use crate::protocol::tspl::TsplBuilder;

pub use crate::protocol::escpos::{beep, query, self_test};

/// Dots per millimetre assumed by the calibration grid
pub const GRID_DOTS_PER_MM: i32 = 8;

/// Spacing of the calibration ruler ticks (5 mm on the grid)
pub const TICK_SPACING: usize = 40;

/// Highest `DENSITY` accepted by TSPL printers
pub const MAX_DENSITY: u32 = 15;

/// Label geometry and print settings shared by the TSPL diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Label width in mm. Default: 58
    pub width_mm: u32,
    /// Label height in mm; must be non-zero. Default: 40
    pub height_mm: u32,
    /// Default: 4
    pub speed: u32,
    /// Default: 8
    pub density: u32,
    /// Horizontal offset in dots. Default: 0
    pub margin_x: i32,
    /// Vertical offset in dots. Default: 0
    pub margin_y: i32,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            width_mm: 58,
            height_mm: 40,
            speed: 4,
            density: 8,
            margin_x: 0,
            margin_y: 0,
        }
    }
}

impl CalibrationParams {
    fn check_size(&self) -> Result<()> {
        if self.width_mm == 0 || self.height_mm == 0 {
            return Err(LabelprintError::InvalidInput(format!(
                "diagnostic labels need a non-zero paper size, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        Ok(())
    }

    /// Label size on the fixed 8 dots/mm grid.
    fn grid_dots(&self) -> Result<(i32, i32)> {
        self.check_size()?;
        let to_dots = |mm: u32| {
            i32::try_from(mm)
                .ok()
                .and_then(|mm| mm.checked_mul(GRID_DOTS_PER_MM))
                .ok_or_else(|| {
                    LabelprintError::InvalidInput(format!("paper dimension {} mm is too large", mm))
                })
        };
        Ok((to_dots(self.width_mm)?, to_dots(self.height_mm)?))
    }
}

// ============================================================================
// CALIBRATION GRID
// ============================================================================

/// Generate the calibration grid label.
///
/// ## Example
///
/// ```
/// use labelprint::diagnostics::{self, CalibrationParams};
///
/// let out = diagnostics::calibration(&CalibrationParams::default()).unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.contains("BOX 2,2,462,318,4\r\n"));
/// assert!(text.ends_with("PRINT 1,1\r\n"));
/// ```
pub fn calibration(params: &CalibrationParams) -> Result<Vec<u8>> {
    let (w_dots, h_dots) = params.grid_dots()?;
    let (mx, my) = (params.margin_x, params.margin_y);

    let mut b = TsplBuilder::new();
    b.setup(params.width_mm, params.height_mm, params.speed, params.density);

    b.draw_box(2 + mx, 2 + my, w_dots - 2 + mx, h_dots - 2 + my, 4);

    let (cx, cy) = (w_dots / 2, h_dots / 2);
    b.bar(cx - 1 + mx, cy - 10 + my, 2, 20);
    b.bar(cx - 10 + mx, cy - 1 + my, 20, 2);

    for x in (0..w_dots).step_by(TICK_SPACING) {
        b.bar(x + mx, my, 2, 10);
    }
    for y in (0..h_dots).step_by(TICK_SPACING) {
        b.bar(mx, y + my, 10, 2);
    }

    b.text(
        50 + mx,
        50 + my,
        "3",
        &format!("Size: {}x{} mm", params.width_mm, params.height_mm),
    );
    b.text(50 + mx, 80 + my, "3", "Check margins");
    b.print(1, 1);

    Ok(b.build())
}

// ============================================================================
// DENSITY SWEEP
// ============================================================================

/// Generate one label per density level.
///
/// Each label carries a `"Density n"` caption, a solid block and a row of
/// 2-dot bars with 6-dot gaps. `params.density` is ignored; the levels set
/// it. Levels must be non-empty and within `0..=15`.
pub fn density_sweep(params: &CalibrationParams, levels: &[u32]) -> Result<Vec<u8>> {
    let (w_dots, _) = params.grid_dots()?;
    if levels.is_empty() {
        return Err(LabelprintError::InvalidInput(
            "density sweep needs at least one level".into(),
        ));
    }
    if let Some(level) = levels.iter().find(|&&l| l > MAX_DENSITY) {
        return Err(LabelprintError::InvalidInput(format!(
            "density {} out of range 0-{}",
            level, MAX_DENSITY
        )));
    }

    let (mx, my) = (params.margin_x, params.margin_y);
    let span = (w_dots - 32).max(8);

    let mut b = TsplBuilder::new();
    for &level in levels {
        b.setup(params.width_mm, params.height_mm, params.speed, level);
        b.text(16 + mx, 16 + my, "3", &format!("Density {}", level));
        b.bar(16 + mx, 56 + my, span, 48);
        for x in (0..span).step_by(8) {
            b.bar(16 + x + mx, 120 + my, 2, 32);
        }
        b.print(1, 1);
    }

    Ok(b.build())
}

/// Every TSPL density level, `0..=15`.
pub fn all_density_levels() -> Vec<u32> {
    (0..=MAX_DENSITY).collect()
}

// ============================================================================
// DPI RULER
// ============================================================================

/// Dot offset of `mm` millimetres at `dpi`, rounded to the nearest dot.
#[inline]
pub fn mm_to_dots(mm: u32, dpi: u32) -> i32 {
    (mm as f64 * dpi as f64 / 25.4).round() as i32
}

/// Generate a millimetre ruler at the configured DPI.
///
/// ```text
/// tick every 1 mm:  height 8
/// tick every 5 mm:  height 16
/// tick every 10 mm: height 24, labelled with the mm value
/// ```
///
/// Printed next to a [`calibration`] label, a ruler that does not line up
/// with the 5 mm grid ticks means the DPI setting is wrong.
pub fn dpi_ruler(params: &CalibrationParams, dpi: u32) -> Result<Vec<u8>> {
    params.check_size()?;
    if dpi == 0 {
        return Err(LabelprintError::InvalidInput("DPI must be non-zero".into()));
    }
    let (mx, my) = (params.margin_x, params.margin_y);

    let mut b = TsplBuilder::new();
    b.setup(params.width_mm, params.height_mm, params.speed, params.density);

    for mm in 0..params.width_mm {
        let x = mm_to_dots(mm, dpi) + mx;
        let height = match mm {
            m if m % 10 == 0 => 24,
            m if m % 5 == 0 => 16,
            _ => 8,
        };
        b.bar(x, my, 2, height);
        if mm % 10 == 0 {
            b.text(x + 2, 28 + my, "1", &mm.to_string());
        }
    }

    b.text(
        8 + mx,
        56 + my,
        "2",
        &format!("{} DPI: 10 mm = {} dots", dpi, mm_to_dots(10, dpi)),
    );
    b.print(1, 1);

    Ok(b.build())
}

// ============================================================================
// ESC/POS ONE-SHOTS
// ============================================================================

/// # Connection Test (ESC @ LF)
///
/// Initialize and feed one line. A responsive printer advances the paper
/// without printing anything. Bytes `1B 40 0A`.
pub fn connection_test() -> Vec<u8> {
    let mut out = escpos::init();
    out.extend(escpos::line_feed());
    out
}

// ============================================================================
// TESTS
// ============================================================================
