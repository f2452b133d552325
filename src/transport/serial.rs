//! # Serial TTY Transport
//!
//! Writes command streams to a serial device: a USB/UART adapter
//! (`/dev/ttyUSB0`) or an RFCOMM tty bound to a Bluetooth printer
//! (`/dev/rfcomm0`).
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary raster data passes through
//! unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL
//! - **No software flow control**: IXON, IXOFF, IXANY
//! - **No output processing**: OPOST (no LF to CRLF translation)
//! - **8N1**: CS8, no parity
//! - **No echo, non-canonical**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
//!
//! XON/XOFF must be off: `0x11` and `0x13` occur in packed bitmaps, and
//! `0x11` is part of the ESC/POS self-test command.
//!
//! ## Chunked Writes
//!
//! Jobs are written in 4096-byte chunks with a 10 ms pause between them, so
//! slow Bluetooth links and small printer buffers keep up.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::Transport;
use crate::error::{LabelprintError, Result};

/// Default device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

/// Default baud rate
pub const DEFAULT_BAUD: u32 = 115_200;

/// Chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 10;

/// Largest single status reply we expect
const READ_BUFFER: usize = 256;

/// # Serial Printer Transport
///
/// ## Example
///
/// ```no_run
/// use labelprint::diagnostics;
/// use labelprint::transport::{SerialTransport, Transport};
///
/// let mut transport = SerialTransport::open("/dev/rfcomm0", 115200)?;
/// transport.write_all(&diagnostics::beep())?;
/// # Ok::<(), labelprint::error::LabelprintError>(())
/// ```
pub struct SerialTransport {
    file: File,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl SerialTransport {
    /// Open a tty and configure it for raw 8N1 at `baud`.
    ///
    /// ## Errors
    ///
    /// - `InvalidInput` for a baud rate the tty layer does not support
    /// - `Transport` if the device is missing, not permitted (dialout
    ///   group), or rejects the termios settings
    pub fn open<P: AsRef<Path>>(device: P, baud: u32) -> Result<Self> {
        let path = device.as_ref();
        let speed = baud_constant(baud)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|e| {
                LabelprintError::Transport(format!("Failed to open {}: {}", path.display(), e))
            })?;

        configure_tty_raw(file.as_raw_fd(), speed)?;
        debug!("Opened {} at {} baud", path.display(), baud);

        Ok(Self {
            file,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let chunks = data.len().div_ceil(self.chunk_size);
        for (i, chunk) in data.chunks(self.chunk_size).enumerate() {
            self.file
                .write_all(chunk)
                .map_err(|e| LabelprintError::Transport(format!("Write failed: {}", e)))?;
            debug!("Sent chunk {}/{} ({} bytes)", i + 1, chunks, chunk.len());

            if i + 1 < chunks && !self.chunk_delay.is_zero() {
                thread::sleep(self.chunk_delay);
            }
        }

        self.file
            .flush()
            .map_err(|e| LabelprintError::Transport(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn read_response(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        if !wait_readable(self.file.as_raw_fd(), timeout)? {
            return Ok(None);
        }
        let mut buf = [0u8; READ_BUFFER];
        let n = self
            .file
            .read(&mut buf)
            .map_err(|e| LabelprintError::Transport(format!("Read failed: {}", e)))?;
        Ok(Some(buf[..n].to_vec()))
    }
}

/// Map a numeric baud rate to its termios constant.
pub fn baud_constant(baud: u32) -> Result<libc::speed_t> {
    Ok(match baud {
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        460800 => libc::B460800,
        921600 => libc::B921600,
        other => {
            return Err(LabelprintError::InvalidInput(format!(
                "unsupported baud rate {}",
                other
            )));
        }
    })
}

/// Configure a file descriptor for raw TTY mode at the given speed.
fn configure_tty_raw(fd: i32, speed: libc::speed_t) -> Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(LabelprintError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;

    let speed_ok = unsafe {
        libc::cfsetispeed(&mut termios, speed) == 0 && libc::cfsetospeed(&mut termios, speed) == 0
    };
    if !speed_ok {
        return Err(LabelprintError::Transport(format!(
            "cfsetspeed failed: {}",
            io::Error::last_os_error()
        )));
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(LabelprintError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

/// Block until `fd` is readable or `timeout` passes.
fn wait_readable(fd: i32, timeout: Duration) -> Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
    let ready = unsafe { libc::poll(&mut pollfd, 1, millis) };
    if ready < 0 {
        return Err(LabelprintError::Transport(format!(
            "poll failed: {}",
            io::Error::last_os_error()
        )));
    }
    Ok(ready > 0 && pollfd.revents & libc::POLLIN != 0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_DEVICE, "/dev/rfcomm0");
        assert_eq!(DEFAULT_BAUD, 115200);
    }

    #[test]
    fn test_baud_constants() {
        assert_eq!(baud_constant(9600).unwrap(), libc::B9600);
        assert_eq!(baud_constant(115200).unwrap(), libc::B115200);
        assert_eq!(baud_constant(921600).unwrap(), libc::B921600);
    }

    #[test]
    fn test_unsupported_baud() {
        assert!(matches!(
            baud_constant(12345),
            Err(LabelprintError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_device_is_transport_error() {
        let err = SerialTransport::open("/dev/labelprint-missing-tty", 115200)
            .err()
            .unwrap();
        assert!(matches!(err, LabelprintError::Transport(_)));
    }

    #[test]
    fn test_regular_file_is_not_a_tty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(SerialTransport::open(file.path(), 115200).is_err());
    }

    #[test]
    fn test_wait_readable_times_out_on_pipe() {
        let mut fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let ready = wait_readable(fds[0], Duration::from_millis(10)).unwrap();
        assert!(!ready);

        assert_eq!(unsafe { libc::write(fds[1], b"x".as_ptr().cast(), 1) }, 1);
        assert!(wait_readable(fds[0], Duration::from_millis(10)).unwrap());

        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
    }
}
