//! # Printer Module
//!
//! Job configuration: paper geometry, resolution, and command set.
//!
//! ## Modules
//!
//! - [`config`]: [`PrintOptions`] and [`CommandSet`]

pub mod config;

pub use config::{CommandSet, PrintOptions};
