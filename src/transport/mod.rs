//! # Printer Transport Layer
//!
//! Sinks that deliver an encoded command stream to a printer. The encoders
//! never touch a transport; a job is built completely in memory first and
//! then written in one call.
//!
//! ## Available Transports
//!
//! | Transport | Target |
//! |-----------|--------|
//! | [`SerialTransport`] | Serial/USB tty or a bound `/dev/rfcommN` |
//! | [`bluetooth`] | RFCOMM setup for a printer MAC, then serial |
//! | [`HttpBridge`] | Wi-Fi to BLE bridge (`POST /print`) |
//! | [`FileSink`] | Dry-run output file |
//!
//! A `Vec<u8>` is also a transport, which collects everything written to it.

pub mod bluetooth;
pub mod file;
pub mod http;
pub mod serial;

pub use file::FileSink;
pub use http::{BridgeStatus, HttpBridge};
pub use serial::SerialTransport;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// A byte sink connected to a printer.
pub trait Transport: Send {
    /// Write the whole buffer, or fail.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for bytes from the printer.
    ///
    /// Returns `Ok(None)` on timeout, and always for sinks that cannot read.
    fn read_response(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

impl Transport for Vec<u8> {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn read_response(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        (**self).read_response(timeout)
    }
}

// ============================================================================
// TARGET SELECTION
// ============================================================================

/// Where jobs go. Opened fresh for every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    /// A tty device such as `/dev/rfcomm0` or `/dev/ttyUSB0`
    Serial { device: PathBuf, baud: u32 },
    /// A Bluetooth printer, bound to an RFCOMM tty on demand
    Bluetooth { mac: String, channel: u8, baud: u32 },
    /// The HTTP bridge at `url`
    Bridge { url: String },
    /// Dry run: commands are written to a file
    File { path: PathBuf },
}

impl Target {
    /// Connect to the target.
    pub fn open(&self) -> Result<Box<dyn Transport>> {
        info!("Opening {}", self);
        let transport: Box<dyn Transport> = match self {
            Self::Serial { device, baud } => Box::new(SerialTransport::open(device, *baud)?),
            Self::Bluetooth { mac, channel, baud } => {
                Box::new(bluetooth::open(mac, *channel, *baud)?)
            }
            Self::Bridge { url } => Box::new(HttpBridge::new(url)?),
            Self::File { path } => Box::new(FileSink::new(path)),
        };
        Ok(transport)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { device, baud } => write!(f, "serial {} at {} baud", device.display(), baud),
            Self::Bluetooth { mac, channel, .. } => {
                write!(f, "bluetooth {} channel {}", mac, channel)
            }
            Self::Bridge { url } => write!(f, "bridge {}", url),
            Self::File { path } => write!(f, "file {}", path.display()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
