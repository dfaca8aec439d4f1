//! # Bluetooth Platform Seam
//!
//! The host's Bluetooth stack is an external collaborator. The bridge only
//! talks to it through [`BluetoothAdapter`] and the [`SppSocket`] it hands
//! out, so the same bridge runs against BlueZ on Linux or against the
//! in-memory [`mock::MockAdapter`] in tests.
//!
//! ## Available Platforms
//!
//! - [`bluez`]: BlueZ via `bluetoothctl` and `/dev/rfcommN` (Linux)
//! - [`mock`]: in-memory adapter recording every call

pub mod bluez;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::BoletaError;

/// Serial Port Profile service class UUID (`00001101-0000-1000-8000-00805F9B34FB`).
pub const SPP_UUID: Uuid = Uuid::from_u128(0x0000_1101_0000_1000_8000_0080_5F9B_34FB);

/// A Bluetooth device as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// MAC address, e.g. `"00:11:22:33:44:55"`
    pub id: String,
    pub name: String,
    /// Signal strength in dBm; only present for active discovery results
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rssi: Option<i16>,
}

impl Device {
    /// A bonded (paired) device, which never carries signal strength.
    pub fn bonded(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rssi: None,
        }
    }

    /// A device seen during active discovery.
    pub fn discovered(id: impl Into<String>, name: impl Into<String>, rssi: Option<i16>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rssi,
        }
    }
}

/// Events delivered by a running discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    DeviceFound(Device),
    /// The platform ended discovery on its own (timeout or cancel).
    Finished,
}

/// Receiver side of a discovery registration. Dropping it releases the
/// registration on the platform side.
pub type DiscoveryReceiver = mpsc::UnboundedReceiver<DiscoveryEvent>;

/// # Bluetooth Adapter
///
/// The platform's Bluetooth Classic radio. Every query may wait on the host
/// stack, so all of them are `async`.
#[async_trait]
pub trait BluetoothAdapter: Send + Sync {
    /// Whether the host has a Bluetooth adapter at all.
    async fn is_available(&self) -> bool;

    /// Whether the adapter is powered on.
    async fn is_enabled(&self) -> bool;

    /// Ask the platform to switch the adapter on.
    ///
    /// Returns `Ok(true)` once the request is dispatched. Platforms that
    /// need a foreground surface for the prompt fail with
    /// [`BoletaError::NoUiContext`] when none is available.
    async fn request_enable(&self) -> Result<bool, BoletaError>;

    /// Whether a discovery is currently running.
    async fn is_discovering(&self) -> bool;

    /// Start discovery and register a listener for its events.
    async fn start_discovery(&self) -> Result<DiscoveryReceiver, BoletaError>;

    /// Cancel a running discovery. Cancellation completes asynchronously on
    /// most stacks. Returns whether a cancel was issued.
    async fn cancel_discovery(&self) -> bool;

    /// Devices bonded with this host.
    async fn bonded_devices(&self) -> Result<Vec<Device>, BoletaError>;

    /// Open an RFCOMM socket to `address` for the `service` UUID, waiting
    /// until connected or failed.
    async fn connect(&self, address: &str, service: Uuid) -> Result<Box<dyn SppSocket>, BoletaError>;
}

/// An open RFCOMM serial socket. All methods may block.
pub trait SppSocket: Send {
    fn write_all(&mut self, data: &[u8]) -> Result<(), BoletaError>;

    fn flush(&mut self) -> Result<(), BoletaError>;

    /// Close the socket. Closing twice is an error.
    fn close(&mut self) -> Result<(), BoletaError>;
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
