//! # BlueZ Adapter (Linux)
//!
//! Drives the host's BlueZ stack through `bluetoothctl` and binds printers
//! to `/dev/rfcommN` nodes for the SPP socket.
//!
//! | Operation | Mechanism |
//! |-----------|-----------|
//! | availability | `bluetoothctl list` |
//! | enabled / discovering | `bluetoothctl show` |
//! | enable | `bluetoothctl power on` |
//! | discovery | `bluetoothctl --timeout N scan on` child process |
//! | bonded devices | `bluetoothctl devices Paired` (`paired-devices` on older BlueZ) |
//! | connect | existing or new `rfcomm bind` on a free index, then a raw TTY |
//!
//! Discovery ends when the child process exits: either its timeout
//! elapsed or [`BluetoothAdapter::cancel_discovery`] killed it. That exit is
//! the platform's finished signal.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BluetoothAdapter, Device, DiscoveryEvent, DiscoveryReceiver, SppSocket, is_valid_mac};
use crate::error::BoletaError;
use crate::transport::bluetooth::{BluetoothTransport, DEFAULT_CHUNK_DELAY_MS, DEFAULT_CHUNK_SIZE};

/// BlueZ adapter settings.
#[derive(Debug, Clone)]
pub struct BluezConfig {
    /// How long one discovery runs before BlueZ ends it
    pub scan_timeout: Duration,
    /// Lowest `/dev/rfcomm<index>` tried when a printer has no bound node yet
    pub rfcomm_index: u8,
    /// RFCOMM channel of the SPP service (1 on nearly every printer)
    pub rfcomm_channel: u8,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
}

impl Default for BluezConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(12),
            rfcomm_index: 0,
            rfcomm_channel: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
        }
    }
}

/// The running `scan on` child, tagged with its generation.
type ScanSlot = Arc<Mutex<Option<(u64, Child)>>>;

/// BlueZ-backed [`BluetoothAdapter`].
pub struct BluezAdapter {
    config: BluezConfig,
    scan: ScanSlot,
    generation: AtomicU64,
}

impl BluezAdapter {
    pub fn new(config: BluezConfig) -> Self {
        Self {
            config,
            scan: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    fn scan_slot(&self) -> MutexGuard<'_, Option<(u64, Child)>> {
        lock(&self.scan)
    }

    async fn show(&self) -> Option<String> {
        bluetoothctl(&["show"]).await.ok()
    }
}

impl Default for BluezAdapter {
    fn default() -> Self {
        Self::new(BluezConfig::default())
    }
}

#[async_trait]
impl BluetoothAdapter for BluezAdapter {
    async fn is_available(&self) -> bool {
        bluetoothctl(&["list"])
            .await
            .map(|out| out.contains("Controller"))
            .unwrap_or(false)
    }

    async fn is_enabled(&self) -> bool {
        self.show()
            .await
            .map(|out| out.contains("Powered: yes"))
            .unwrap_or(false)
    }

    async fn request_enable(&self) -> Result<bool, BoletaError> {
        let output = bluetoothctl(&["power", "on"]).await?;
        debug!(output = %output.trim(), "bluetoothctl power on");
        Ok(true)
    }

    async fn is_discovering(&self) -> bool {
        let running = self.scan_slot().is_some();
        if running {
            return true;
        }
        self.show()
            .await
            .map(|out| out.contains("Discovering: yes"))
            .unwrap_or(false)
    }

    async fn start_discovery(&self) -> Result<DiscoveryReceiver, BoletaError> {
        let timeout = self.config.scan_timeout.as_secs().max(1);
        let mut child = tokio::process::Command::new("bluetoothctl")
            .arg("--timeout")
            .arg(timeout.to_string())
            .arg("scan")
            .arg("on")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BoletaError::DiscoveryFailed(format!("Failed to run bluetoothctl: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BoletaError::DiscoveryFailed("No scan output".to_string()))?;

        let id = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        // Replacing an older child drops it, which kills it
        *self.scan_slot() = Some((id, child));
        info!(timeout_secs = timeout, "Discovery started");

        let (tx, rx) = mpsc::unbounded_channel();
        let slot = Arc::clone(&self.scan);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut names = HashMap::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(device) = parse_discovery_line(&line, &mut names)
                    && tx.send(DiscoveryEvent::DeviceFound(device)).is_err()
                {
                    debug!("Discovery listener released");
                    break;
                }
            }

            let mut guard = lock(&slot);
            if guard.as_ref().is_some_and(|(current, _)| *current == id) {
                guard.take();
            }
            drop(guard);

            debug!("Discovery finished");
            let _ = tx.send(DiscoveryEvent::Finished);
        });

        Ok(rx)
    }

    async fn cancel_discovery(&self) -> bool {
        let running = self.scan_slot().take();
        if let Some((_, mut child)) = running
            && let Err(e) = child.start_kill()
        {
            warn!(error = %e, "Failed to stop scan process");
        }
        match bluetoothctl(&["scan", "off"]).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "bluetoothctl scan off failed");
                false
            }
        }
    }

    async fn bonded_devices(&self) -> Result<Vec<Device>, BoletaError> {
        let devices = parse_device_list(&bluetoothctl(&["devices", "Paired"]).await?);
        if !devices.is_empty() {
            return Ok(devices);
        }
        // BlueZ < 5.65
        Ok(parse_device_list(&bluetoothctl(&["paired-devices"]).await?))
    }

    async fn connect(&self, address: &str, service: Uuid) -> Result<Box<dyn SppSocket>, BoletaError> {
        let address = address.to_uppercase();
        let config = self.config.clone();
        debug!(device = %address, %service, channel = config.rfcomm_channel, "Opening SPP socket");

        tokio::task::spawn_blocking(move || -> Result<Box<dyn SppSocket>, BoletaError> {
            let mut transport =
                BluetoothTransport::open_for_mac(&address, config.rfcomm_index, config.rfcomm_channel)?;
            transport.set_chunk_size(config.chunk_size);
            transport.set_chunk_delay(config.chunk_delay);
            Ok(Box::new(transport))
        })
        .await
        .map_err(|e| BoletaError::Transport(format!("Task error: {}", e)))?
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run `bluetoothctl` with arguments and return its stdout.
async fn bluetoothctl(args: &[&str]) -> Result<String, BoletaError> {
    let output = tokio::process::Command::new("bluetoothctl")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| BoletaError::Transport(format!("Failed to run bluetoothctl: {}", e)))?;
    Ok(strip_ansi(&String::from_utf8_lossy(&output.stdout)))
}

/// Remove terminal color sequences (`ESC [ ... letter`).
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse `Device <MAC> <name>` lines.
fn parse_device_list(output: &str) -> Vec<Device> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (mac, name) = rest.split_once(' ').unwrap_or((rest, ""));
            is_valid_mac(mac).then(|| Device::bonded(mac, display_name(mac, name)))
        })
        .collect()
}

/// Turn one line of `scan on` output into a discovered device.
///
/// `names` remembers names from `[NEW]` lines so later RSSI updates carry
/// them.
fn parse_discovery_line(line: &str, names: &mut HashMap<String, String>) -> Option<Device> {
    let line = strip_ansi(line);

    if let Some(i) = line.find("[NEW] Device ") {
        let rest = &line[i + "[NEW] Device ".len()..];
        let (mac, name) = rest.split_once(' ').unwrap_or((rest, ""));
        if !is_valid_mac(mac) {
            return None;
        }
        let name = display_name(mac, name);
        names.insert(mac.to_string(), name.clone());
        return Some(Device::discovered(mac, name, None));
    }

    let i = line.find("[CHG] Device ")?;
    let rest = &line[i + "[CHG] Device ".len()..];
    let (mac, detail) = rest.split_once(' ')?;
    if !is_valid_mac(mac) {
        return None;
    }

    if let Some(value) = detail.strip_prefix("RSSI: ") {
        let rssi = parse_rssi(value)?;
        let name = names
            .get(mac)
            .cloned()
            .unwrap_or_else(|| mac.to_string());
        return Some(Device::discovered(mac, name, Some(rssi)));
    }
    if let Some(name) = detail.strip_prefix("Name: ") {
        names.insert(mac.to_string(), name.trim().to_string());
    }
    None
}

/// `-67` on older BlueZ, `0xffffffbd (-67)` on newer.
fn parse_rssi(value: &str) -> Option<i16> {
    let value = value.trim();
    let decimal = match (value.find('('), value.find(')')) {
        (Some(start), Some(end)) if start < end => &value[start + 1..end],
        _ => value,
    };
    decimal.trim().parse().ok()
}

/// BlueZ names unnamed devices after their address with dashes.
fn display_name(mac: &str, name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name.replace('-', ":").eq_ignore_ascii_case(mac) {
        mac.to_string()
    } else {
        name.to_string()
    }
}
