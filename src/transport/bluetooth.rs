//! # Bluetooth RFCOMM Transport
//!
//! This module provides communication with ESC/POS printers over Bluetooth
//! Serial Port Profile (SPP) via RFCOMM device nodes.
//!
//! ## Bluetooth Setup (Linux)
//!
//! The printer must be paired. [`BluetoothTransport::open_for_mac`] reuses
//! a node already bound to the printer, or binds the first free index the
//! same way you would by hand:
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! [bluetooth]# pair 66:22:XX:XX:XX:XX
//!
//! $ sudo rfcomm bind 0 66:22:XX:XX:XX:XX 1
//! # This creates /dev/rfcomm0
//! ```
//!
//! A node bound by the transport is released again on close, so the next
//! printer can take its index.
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode to ensure binary data is
//! transmitted without modification:
//!
//! - **No input processing**: Disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: Disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8 (8 data bits, no parity)
//! - **No echo**: Disable ECHO, ECHONL
//! - **Non-canonical mode**: Disable ICANON (no line buffering)
//!
//! ## Chunked Writes
//!
//! Large payloads are written in chunks to avoid overwhelming the
//! printer's receive buffer. The default chunk size is 512 bytes with a
//! short delay between chunks, sized for cheap 58mm printers.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::BoletaError;
use crate::platform::SppSocket;

/// Default chunk size for writes (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default delay between chunks (milliseconds)
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 10;

/// # Bluetooth Printer Transport
///
/// An open `/dev/rfcommN` node configured for raw binary output.
///
/// ## Example
///
/// ```no_run
/// use boleta::transport::BluetoothTransport;
/// use boleta::protocol::commands;
/// use boleta::platform::SppSocket;
///
/// let mut transport = BluetoothTransport::open("/dev/rfcomm0")?;
/// transport.write_all(commands::init().as_bytes())?;
/// transport.close()?;
///
/// # Ok::<(), boleta::error::BoletaError>(())
/// ```
pub struct BluetoothTransport {
    file: Option<File>,
    chunk_size: usize,
    chunk_delay: Duration,
    /// RFCOMM index bound by [`open_for_mac`](Self::open_for_mac), released on close
    bound: Option<u8>,
}

impl BluetoothTransport {
    /// Open a Bluetooth connection to the printer.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (may need root or dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, BoletaError> {
        let path = device.as_ref();

        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            BoletaError::Transport(format!("Failed to open {}: {}", path.display(), e))
        })?;

        configure_tty_raw(file.as_raw_fd())?;
        debug!(device = %path.display(), "RFCOMM device opened");

        Ok(Self {
            file: Some(file),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
            bound: None,
        })
    }

    /// Open the RFCOMM node bound to `mac`.
    ///
    /// Without an existing bind, the first free index at or above
    /// `first_index` is bound on `channel`. That bind belongs to the
    /// returned transport and is released on [`SppSocket::close`].
    pub fn open_for_mac(mac: &str, first_index: u8, channel: u8) -> Result<Self, BoletaError> {
        let listing = rfcomm_listing()?;
        if let Some(path) = device_for_mac(&listing, mac) {
            debug!(device = %path, "Reusing bound RFCOMM device");
            return Self::open(path);
        }

        let index = first_free_index(&listing, first_index)
            .ok_or_else(|| BoletaError::Transport("No free RFCOMM device index".to_string()))?;
        let path = bind_rfcomm(mac, index, channel)?;
        match Self::open(&path) {
            Ok(mut transport) => {
                transport.bound = Some(index);
                Ok(transport)
            }
            Err(e) => {
                if let Err(release) = release_rfcomm(index) {
                    warn!(error = %release, index, "Releasing RFCOMM device failed");
                }
                Err(e)
            }
        }
    }

    /// Set the chunk size for large writes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    fn file(&mut self) -> Result<&mut File, BoletaError> {
        self.file
            .as_mut()
            .ok_or_else(|| BoletaError::Transport("Socket is closed".to_string()))
    }
}

impl SppSocket for BluetoothTransport {
    /// Small writes are sent directly. Large writes are chunked.
    fn write_all(&mut self, data: &[u8]) -> Result<(), BoletaError> {
        if data.is_empty() {
            return Ok(());
        }

        let chunk_size = self.chunk_size;
        let chunk_delay = self.chunk_delay;
        let file = self.file()?;

        if data.len() <= chunk_size {
            file.write_all(data)
                .map_err(|e| BoletaError::Transport(format!("Write failed: {}", e)))?;
        } else {
            for chunk in data.chunks(chunk_size) {
                file.write_all(chunk)
                    .map_err(|e| BoletaError::Transport(format!("Write failed: {}", e)))?;

                if !chunk_delay.is_zero() {
                    thread::sleep(chunk_delay);
                }
            }
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<(), BoletaError> {
        self.file()?
            .flush()
            .map_err(|e| BoletaError::Transport(format!("Flush failed: {}", e)))
    }

    /// Flush and close the node, then release a bind this transport made.
    fn close(&mut self) -> Result<(), BoletaError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| BoletaError::Transport("Socket is already closed".to_string()))?;
        let flushed = file
            .flush()
            .map_err(|e| BoletaError::Transport(format!("Flush on close failed: {}", e)));
        drop(file);

        if let Some(index) = self.bound.take() {
            release_rfcomm(index)?;
        }
        flushed
    }
}

/// Configure a file descriptor for raw TTY mode.
///
/// This disables all input/output processing so binary data passes through
/// unmodified.
///
/// IXON/IXOFF/IXANY disable XON/XOFF software flow control: 0x11 and 0x13
/// can appear in QR payloads and length bytes.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> Result<(), BoletaError> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(BoletaError::Transport(format!(
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

    // 8-bit characters, no parity
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(BoletaError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> Result<(), BoletaError> {
    Ok(())
}

// ============================================================================
// RFCOMM SETUP HELPERS
// ============================================================================

/// Current RFCOMM binds: `/proc/net/rfcomm` followed by `rfcomm -a`.
///
/// Lines look like `rfcomm0: XX:XX:XX:XX:XX:XX channel N clean`.
fn rfcomm_listing() -> Result<String, BoletaError> {
    let mut listing = fs::read_to_string("/proc/net/rfcomm").unwrap_or_default();

    let output = Command::new("rfcomm")
        .arg("-a")
        .output()
        .map_err(|e| BoletaError::Transport(format!("Failed to run 'rfcomm -a': {}", e)))?;
    listing.push('\n');
    listing.push_str(&String::from_utf8_lossy(&output.stdout));
    Ok(listing)
}

/// Pick the `/dev/rfcommN` path bound to `mac` out of an rfcomm listing.
fn device_for_mac(listing: &str, mac: &str) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|dev_name| format!("/dev/{}", dev_name.trim()))
        .find(|path| Path::new(path).exists())
}

/// Indices in use according to an rfcomm listing.
fn bound_indices(listing: &str) -> Vec<u8> {
    listing
        .lines()
        .filter_map(|line| line.split(':').next())
        .filter_map(|name| name.trim().strip_prefix("rfcomm")?.parse().ok())
        .collect()
}

/// Lowest index at or above `first` that nothing is bound to.
fn first_free_index(listing: &str, first: u8) -> Option<u8> {
    let used = bound_indices(listing);
    (first..=u8::MAX).find(|index| !used.contains(index))
}

/// Bind `/dev/rfcomm<index>` to a Bluetooth MAC address.
///
/// Runs `rfcomm bind <index> <MAC> <channel>` and waits for the device node
/// to appear. Returns the device path on success.
///
/// **Requires root privileges** (or CAP_NET_ADMIN).
fn bind_rfcomm(mac: &str, index: u8, channel: u8) -> Result<String, BoletaError> {
    let mac_upper = mac.to_uppercase();
    let device_path = format!("/dev/rfcomm{}", index);

    info!(device = %mac_upper, index, channel, "Binding RFCOMM device");
    let output = Command::new("rfcomm")
        .arg("bind")
        .arg(index.to_string())
        .arg(&mac_upper)
        .arg(channel.to_string())
        .output()
        .map_err(|e| BoletaError::Transport(format!("Failed to run rfcomm bind: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BoletaError::Transport(format!(
            "rfcomm bind failed: {}",
            stderr.trim()
        )));
    }

    // Wait for udev to create the node
    thread::sleep(Duration::from_millis(500));

    if !Path::new(&device_path).exists() {
        return Err(BoletaError::Transport(format!(
            "Device {} was not created",
            device_path
        )));
    }

    Ok(device_path)
}

/// Release `/dev/rfcomm<index>` (`rfcomm release <index>`).
fn release_rfcomm(index: u8) -> Result<(), BoletaError> {
    info!(index, "Releasing RFCOMM device");
    let output = Command::new("rfcomm")
        .arg("release")
        .arg(index.to_string())
        .output()
        .map_err(|e| BoletaError::Transport(format!("Failed to run rfcomm release: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BoletaError::Transport(format!(
            "rfcomm release failed: {}",
            stderr.trim()
        )));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_for_mac_requires_existing_node() {
        let listing = "rfcomm99: 00:11:22:33:44:55 channel 1 clean\n";
        // /dev/rfcomm99 does not exist on a test host
        assert_eq!(device_for_mac(listing, "00:11:22:33:44:55"), None);
    }

    #[test]
    fn test_device_for_mac_no_match() {
        let listing = "rfcomm0: AA:BB:CC:DD:EE:FF channel 1 clean\n";
        assert_eq!(device_for_mac(listing, "00:11:22:33:44:55"), None);
    }

    #[test]
    fn test_first_free_index_skips_bound_devices() {
        let listing = "rfcomm0: 66:22:8E:11:22:33 channel 1 clean\n\
                       rfcomm1: AA:BB:CC:DD:EE:FF channel 1 connected [reuse-dlc]\n";
        assert_eq!(first_free_index(listing, 0), Some(2));
        assert_eq!(first_free_index(listing, 5), Some(5));
    }

    #[test]
    fn test_first_free_index_fills_gaps() {
        let listing = "rfcomm1: 66:22:8E:11:22:33 channel 1 clean\n";
        assert_eq!(first_free_index(listing, 0), Some(0));
        assert_eq!(first_free_index("", 0), Some(0));
    }

    #[test]
    fn test_bound_indices_ignores_other_lines() {
        // /proc/net/rfcomm socket lines have no rfcommN prefix
        let listing = "00:1A:7D:DA:71:13 66:22:8E:11:22:33 2 1\nrfcomm3: 66:22:8E:11:22:33 channel 1 clean\n";
        assert_eq!(bound_indices(listing), vec![3]);
    }

    #[test]
    fn test_first_free_index_when_exhausted() {
        let listing: String = (0..=u8::MAX)
            .map(|i| format!("rfcomm{}: 66:22:8E:11:22:33 channel 1 clean\n", i))
            .collect();
        assert_eq!(first_free_index(&listing, 0), None);
    }

    #[test]
    fn test_open_missing_device_fails() {
        let err = BluetoothTransport::open("/dev/rfcomm-does-not-exist").err().unwrap();
        assert!(matches!(err, BoletaError::Transport(_)));
    }

    // Note: Writing requires actual hardware.
    // Integration tests should be run manually with a paired printer.
}
