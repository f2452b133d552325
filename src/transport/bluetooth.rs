//! # Bluetooth RFCOMM Setup
//!
//! Portable thermal printers speak Bluetooth Serial Port Profile. On Linux
//! the kernel exposes an RFCOMM link as a tty, so printing over Bluetooth is
//! printing to [`SerialTransport`] once the tty exists.
//!
//! ## Manual Setup
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! [bluetooth]# pair DD:0D:30:02:63:42
//! $ sudo rfcomm bind 0 DD:0D:30:02:63:42 1
//! # creates /dev/rfcomm0 for remote channel 1
//! ```
//!
//! [`open`] does the same on demand: reuse an existing binding for the MAC
//! and channel if there is one, otherwise connect, ping and bind the first
//! free device.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::SerialTransport;
use crate::error::{LabelprintError, Result};

/// Default remote RFCOMM channel for SPP printers
pub const DEFAULT_CHANNEL: u8 = 1;

/// `/dev/rfcommN` devices the kernel allows
pub const MAX_DEVICES: u8 = 32;

/// Time for a new link or binding to settle
const SETTLE_DELAY_MS: u64 = 500;

/// Open a serial transport to remote RFCOMM `channel` on the printer with
/// the given MAC.
pub fn open(mac: &str, channel: u8, baud: u32) -> Result<SerialTransport> {
    if !is_valid_mac(mac) {
        return Err(LabelprintError::InvalidInput(format!(
            "invalid Bluetooth MAC address '{}'",
            mac
        )));
    }

    let bindings = current_bindings();
    let device = match find_binding(&bindings, mac, channel) {
        Some(device) => {
            info!("Using existing binding {} for {}", device, mac);
            device
        }
        None => setup_rfcomm(mac, channel, &bindings)?,
    };
    SerialTransport::open(&device, baud)
}

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// One line of an RFCOMM binding listing.
///
/// `/proc/net/rfcomm` and `rfcomm -a` both print
/// `rfcomm0: DD:0D:30:02:63:42 channel 1 clean`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// N in `/dev/rfcommN`
    pub index: u8,
    /// Remote address, upper case
    pub mac: String,
    /// Remote RFCOMM channel
    pub channel: u8,
}

impl Binding {
    pub fn device_path(&self) -> String {
        device_path(self.index)
    }
}

fn device_path(index: u8) -> String {
    format!("/dev/rfcomm{}", index)
}

/// Parse every binding in a listing, skipping lines that don't fit.
pub fn parse_bindings(listing: &str) -> Vec<Binding> {
    listing
        .lines()
        .filter_map(|line| {
            let (name, rest) = line.trim().split_once(": ")?;
            let index = name.strip_prefix("rfcomm")?.parse().ok()?;
            let mut fields = rest.split_whitespace();
            let mac = fields.next()?.to_uppercase();
            if fields.next()? != "channel" {
                return None;
            }
            let channel = fields.next()?.parse().ok()?;
            Some(Binding {
                index,
                mac,
                channel,
            })
        })
        .collect()
}

/// Lowest device index in `0..MAX_DEVICES` that no binding uses and for
/// which `taken` is false.
pub fn free_index(bindings: &[Binding], taken: impl Fn(u8) -> bool) -> Option<u8> {
    (0..MAX_DEVICES).find(|&i| !bindings.iter().any(|b| b.index == i) && !taken(i))
}

/// Arguments for `rfcomm` binding `/dev/rfcomm<index>` to `channel` on `mac`.
pub fn bind_args(index: u8, mac: &str, channel: u8) -> Vec<String> {
    vec![
        "bind".to_string(),
        index.to_string(),
        mac.to_uppercase(),
        channel.to_string(),
    ]
}

/// Current bindings from `/proc/net/rfcomm`, or `rfcomm -a` when the proc
/// file is unavailable.
pub fn current_bindings() -> Vec<Binding> {
    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        return parse_bindings(&contents);
    }
    match Command::new("rfcomm").arg("-a").output() {
        Ok(output) => parse_bindings(&String::from_utf8_lossy(&output.stdout)),
        Err(e) => {
            warn!("Failed to run 'rfcomm -a': {}", e);
            Vec::new()
        }
    }
}

/// Existing tty bound to `channel` on `mac`, if its device node exists.
pub fn find_binding(bindings: &[Binding], mac: &str, channel: u8) -> Option<String> {
    let mac = mac.to_uppercase();
    bindings
        .iter()
        .filter(|b| b.mac == mac && b.channel == channel)
        .map(Binding::device_path)
        .find(|path| Path::new(path).exists())
}

fn run(program: &str, args: &[String]) -> Result<Output> {
    debug!("Running {} {}", program, args.join(" "));
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| LabelprintError::Transport(format!("Failed to run {}: {}", program, e)))
}

/// Bring the link up and bind the first free `/dev/rfcommN` to `channel`.
///
/// Runs `bluetoothctl connect`, `l2ping -c 1` and `rfcomm bind N MAC channel`.
/// The bind step needs root (or `CAP_NET_ADMIN`). Returns the device path.
pub fn setup_rfcomm(mac: &str, channel: u8, bindings: &[Binding]) -> Result<String> {
    let mac = mac.to_uppercase();
    let index = free_index(bindings, |i| Path::new(&device_path(i)).exists()).ok_or_else(|| {
        LabelprintError::Transport(format!("no free rfcomm device below {}", MAX_DEVICES))
    })?;

    info!("Connecting to {}", mac);
    let connect = run("bluetoothctl", &["connect".to_string(), mac.clone()])?;
    if !connect.status.success() {
        // Often already connected or connectable on demand; l2ping is the real check
        warn!(
            "bluetoothctl connect: {}",
            String::from_utf8_lossy(&connect.stdout).trim()
        );
    }
    thread::sleep(Duration::from_millis(SETTLE_DELAY_MS));

    let ping = run("l2ping", &["-c".to_string(), "1".to_string(), mac.clone()])?;
    if !ping.status.success() {
        return Err(LabelprintError::Transport(format!(
            "{} not reachable: {}",
            mac,
            String::from_utf8_lossy(&ping.stderr).trim()
        )));
    }

    let path = device_path(index);
    info!("Binding {} to {} channel {}", path, mac, channel);
    let bind = run("rfcomm", &bind_args(index, &mac, channel))?;
    if !bind.status.success() {
        return Err(LabelprintError::Transport(format!(
            "rfcomm bind failed: {}",
            String::from_utf8_lossy(&bind.stderr).trim()
        )));
    }
    thread::sleep(Duration::from_millis(SETTLE_DELAY_MS));

    if !Path::new(&path).exists() {
        return Err(LabelprintError::Transport(format!("{} was not created", path)));
    }
    Ok(path)
}

// ============================================================================
// TESTS
// ============================================================================
