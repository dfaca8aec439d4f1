//! # Printer State Façade
//!
//! Drives a [`DeviceBridge`] and publishes what a UI needs to render as a
//! [`PrinterState`] snapshot over a `tokio::sync::watch` channel.
//!
//! Every operation reports its result as an [`Outcome`] and a
//! human-readable `status_message`. Nothing here returns an error.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::bridge::DeviceBridge;
use crate::command::Command;
use crate::error::BoletaError;
use crate::platform::Device;

/// Observable printer state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrinterState {
    pub bluetooth_enabled: bool,
    pub is_loading: bool,
    pub is_scanning: bool,
    pub status_message: String,
    /// Discovery results of the current scan, unique by id, first sighting kept.
    pub discovered: Vec<Device>,
    pub paired: Vec<Device>,
    pub connected: Option<Device>,
}

/// Result of one façade operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    /// Stable error code on failure (see [`BoletaError::code`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub message: String,
}

impl Outcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: None,
            message: message.into(),
        }
    }

    fn failed(error: &BoletaError) -> Self {
        Self {
            success: false,
            code: Some(error.code()),
            message: error.to_string(),
        }
    }
}

struct ActiveScan {
    id: u64,
    listener: AbortHandle,
}

#[derive(Clone)]
pub struct PrinterFacade {
    bridge: DeviceBridge,
    state: Arc<watch::Sender<PrinterState>>,
    scan: Arc<Mutex<Option<ActiveScan>>>,
    next_scan: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
}

/// Keeps `is_loading` set while alive.
struct Loading<'a> {
    facade: &'a PrinterFacade,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        let remaining = self.facade.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.facade
            .state
            .send_modify(|s| s.is_loading = remaining > 0);
    }
}

impl PrinterFacade {
    pub fn new(bridge: DeviceBridge) -> Self {
        let (state, _) = watch::channel(PrinterState::default());
        Self {
            bridge,
            state: Arc::new(state),
            scan: Arc::new(Mutex::new(None)),
            next_scan: Arc::new(AtomicU64::new(1)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn bridge(&self) -> &DeviceBridge {
        &self.bridge
    }

    pub fn subscribe(&self) -> watch::Receiver<PrinterState> {
        self.state.subscribe()
    }

    /// Current snapshot.
    pub fn state(&self) -> PrinterState {
        self.state.borrow().clone()
    }

    fn scan_slot(&self) -> MutexGuard<'_, Option<ActiveScan>> {
        self.scan.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn loading(&self) -> Loading<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| s.is_loading = true);
        Loading { facade: self }
    }

    fn report(&self, outcome: Outcome) -> Outcome {
        if !outcome.success {
            warn!(code = ?outcome.code, message = %outcome.message, "Operation failed");
        }
        let message = outcome.message.clone();
        self.state.send_modify(|s| s.status_message = message);
        outcome
    }

    async fn sync_status(&self) {
        let enabled = self.bridge.is_enabled().await;
        let connected = self.bridge.get_connected_device();
        self.state.send_modify(|s| {
            s.bluetooth_enabled = enabled;
            s.connected = connected;
        });
    }

    /// Check Bluetooth, load bonded devices and pick up a connection that
    /// already exists (app resume).
    pub async fn mount(&self) -> Outcome {
        let _loading = self.loading();
        self.sync_status().await;

        if !self.bridge.is_available().await {
            return self.report(Outcome::failed(&BoletaError::NotAvailable));
        }
        if !self.bridge.is_enabled().await {
            return self.report(Outcome::failed(&BoletaError::NotEnabled));
        }

        let paired = self.bridge.get_paired_devices().await;
        let count = paired.len();
        self.state.send_modify(|s| s.paired = paired);

        match self.bridge.get_connected_device() {
            Some(device) => self.report(Outcome::ok(format!("Connected to {}", device.name))),
            None => self.report(Outcome::ok(format!("{} paired device(s)", count))),
        }
    }

    /// Stop any scan this façade started and release its subscription.
    pub async fn unmount(&self) {
        let active = self.scan_slot().take();
        if let Some(scan) = active {
            scan.listener.abort();
            self.bridge.stop_scanning().await;
        }
        self.state.send_modify(|s| s.is_scanning = false);
    }

    pub async fn enable_bluetooth(&self) -> Outcome {
        let _loading = self.loading();
        let outcome = match self.bridge.request_enable().await {
            Ok(_) => {
                let paired = self.bridge.get_paired_devices().await;
                self.state.send_modify(|s| s.paired = paired);
                Outcome::ok("Bluetooth enable requested")
            }
            Err(e) => Outcome::failed(&e),
        };
        self.sync_status().await;
        self.report(outcome)
    }

    /// Start a scan. Discovered devices accumulate in
    /// [`PrinterState::discovered`] until the platform ends discovery.
    pub async fn start_scan(&self) -> Outcome {
        let _loading = self.loading();
        self.state.send_modify(|s| s.discovered.clear());

        let sink = Arc::clone(&self.state);
        let subscription = match self
            .bridge
            .start_scanning(move |device| {
                sink.send_modify(|s| {
                    if !s.discovered.iter().any(|d| d.id == device.id) {
                        s.discovered.push(device);
                    }
                })
            })
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => return self.report(Outcome::failed(&e)),
        };

        let id = self.next_scan.fetch_add(1, Ordering::Relaxed);
        let previous = self.scan_slot().replace(ActiveScan {
            id,
            listener: subscription.abort_handle(),
        });
        if let Some(previous) = previous {
            previous.listener.abort();
        }
        self.state.send_modify(|s| s.is_scanning = true);

        let facade = self.clone();
        tokio::spawn(async move {
            let completed = subscription.finished().await;
            let current = {
                let mut slot = facade.scan_slot();
                let current = slot.as_ref().is_some_and(|scan| scan.id == id);
                if current {
                    *slot = None;
                }
                current
            };
            // A newer scan owns the flag now
            if !current {
                return;
            }
            debug!(completed, "Scan ended");
            facade.state.send_modify(|s| {
                s.is_scanning = false;
                if completed {
                    s.status_message = format!("Scan finished, {} device(s) found", s.discovered.len());
                }
            });
        });

        self.report(Outcome::ok("Scanning..."))
    }

    pub async fn stop_scan(&self) -> Outcome {
        let stopped = self.bridge.stop_scanning().await;
        let active = self.scan_slot().take();
        if let Some(scan) = active {
            scan.listener.abort();
        }
        self.state.send_modify(|s| s.is_scanning = false);
        if stopped {
            self.report(Outcome::ok("Scan stopped"))
        } else {
            self.report(Outcome::failed(&BoletaError::NotAvailable))
        }
    }

    pub async fn refresh_paired(&self) -> Outcome {
        let paired = self.bridge.get_paired_devices().await;
        let count = paired.len();
        self.state.send_modify(|s| s.paired = paired);
        self.sync_status().await;
        self.report(Outcome::ok(format!("{} paired device(s)", count)))
    }

    pub async fn connect(&self, id: &str) -> Outcome {
        let _loading = self.loading();
        self.report(Outcome::ok(format!("Connecting to {}...", id)));

        let outcome = match self.bridge.connect_device(id).await {
            Ok(_) => {
                let name = self
                    .bridge
                    .get_connected_device()
                    .map(|d| d.name)
                    .unwrap_or_else(|| id.to_string());
                Outcome::ok(format!("Connected to {}", name))
            }
            Err(e) => Outcome::failed(&e),
        };

        // Connecting cancels discovery
        if self.scan_slot().take().is_some() {
            self.state.send_modify(|s| s.is_scanning = false);
        }
        self.sync_status().await;
        self.report(outcome)
    }

    pub async fn disconnect(&self) -> Outcome {
        let _loading = self.loading();
        let outcome = match self.bridge.disconnect().await {
            Ok(_) => Outcome::ok("Disconnected"),
            Err(e) => Outcome::failed(&e),
        };
        self.sync_status().await;
        self.report(outcome)
    }

    pub async fn print(&self, command: &Command) -> Outcome {
        let _loading = self.loading();
        let result = self.bridge.print(command).await;
        self.finish_print(result).await
    }

    pub async fn print_raw(&self, payload: &str) -> Outcome {
        let _loading = self.loading();
        let result = self.bridge.print_raw(payload).await;
        self.finish_print(result).await
    }

    async fn finish_print(&self, result: Result<bool, BoletaError>) -> Outcome {
        let outcome = match result {
            Ok(_) => Outcome::ok("Printed"),
            Err(e) => Outcome::failed(&e),
        };
        // A failed write drops the connection
        self.sync_status().await;
        self.report(outcome)
    }
}
