//! In-memory Bluetooth adapter.
//!
//! Records every platform call in order, lets tests inject discovery events
//! and failures, and collects the bytes written to its sockets. Clones share
//! state, so a test keeps one handle while the bridge owns another.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{BluetoothAdapter, Device, DiscoveryEvent, DiscoveryReceiver, SppSocket};
use crate::error::BoletaError;

/// A platform call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    RequestEnable,
    StartDiscovery,
    CancelDiscovery,
    BondedDevices,
    Connect(String),
    Write(Vec<u8>),
    Flush,
    Close,
}

#[derive(Default)]
struct MockState {
    available: bool,
    enabled: bool,
    ui_context: bool,
    discovering: bool,
    bonded: Vec<Device>,
    connect_error: Option<String>,
    write_error: Option<String>,
    close_error: Option<String>,
    discovery_tx: Option<mpsc::UnboundedSender<DiscoveryEvent>>,
    calls: Vec<MockCall>,
    written: Vec<u8>,
}

#[derive(Clone)]
pub struct MockAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockAdapter {
    /// An available, enabled adapter with a UI context.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                available: true,
                enabled: true,
                ui_context: true,
                ..Default::default()
            })),
        }
    }

    /// A host without Bluetooth hardware.
    pub fn unavailable() -> Self {
        let mock = Self::new();
        {
            let mut state = mock.state();
            state.available = false;
            state.enabled = false;
        }
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state().enabled = enabled;
    }

    pub fn set_ui_context(&self, available: bool) {
        self.state().ui_context = available;
    }

    /// Mark discovery as already running, as if another app started it.
    pub fn set_discovering(&self, discovering: bool) {
        self.state().discovering = discovering;
    }

    pub fn add_bonded(&self, device: Device) {
        self.state().bonded.push(device);
    }

    pub fn fail_connect(&self, message: &str) {
        self.state().connect_error = Some(message.to_string());
    }

    pub fn fail_writes(&self, message: &str) {
        self.state().write_error = Some(message.to_string());
    }

    pub fn fail_close(&self, message: &str) {
        self.state().close_error = Some(message.to_string());
    }

    /// Deliver a discovery result to the registered listener.
    ///
    /// Returns false when no listener is registered.
    pub fn emit(&self, device: Device) -> bool {
        self.state()
            .discovery_tx
            .as_ref()
            .is_some_and(|tx| tx.send(DiscoveryEvent::DeviceFound(device)).is_ok())
    }

    /// Signal that the platform ended discovery on its own.
    pub fn finish_discovery(&self) {
        let mut state = self.state();
        state.discovering = false;
        if let Some(tx) = state.discovery_tx.take() {
            let _ = tx.send(DiscoveryEvent::Finished);
        }
    }

    /// Whether a discovery listener is still registered.
    pub fn has_listener(&self) -> bool {
        self.state()
            .discovery_tx
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Every byte written to any socket, in order.
    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    fn record(&self, call: MockCall) {
        self.state().calls.push(call);
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BluetoothAdapter for MockAdapter {
    async fn is_available(&self) -> bool {
        self.state().available
    }

    async fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    async fn request_enable(&self) -> Result<bool, BoletaError> {
        self.record(MockCall::RequestEnable);
        let mut state = self.state();
        if !state.ui_context {
            return Err(BoletaError::NoUiContext);
        }
        state.enabled = true;
        Ok(true)
    }

    async fn is_discovering(&self) -> bool {
        self.state().discovering
    }

    async fn start_discovery(&self) -> Result<DiscoveryReceiver, BoletaError> {
        self.record(MockCall::StartDiscovery);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        state.discovering = true;
        state.discovery_tx = Some(tx);
        Ok(rx)
    }

    async fn cancel_discovery(&self) -> bool {
        self.record(MockCall::CancelDiscovery);
        let mut state = self.state();
        state.discovering = false;
        if let Some(tx) = state.discovery_tx.take() {
            let _ = tx.send(DiscoveryEvent::Finished);
        }
        true
    }

    async fn bonded_devices(&self) -> Result<Vec<Device>, BoletaError> {
        self.record(MockCall::BondedDevices);
        Ok(self.state().bonded.clone())
    }

    async fn connect(&self, address: &str, _service: Uuid) -> Result<Box<dyn SppSocket>, BoletaError> {
        self.record(MockCall::Connect(address.to_string()));
        if let Some(message) = self.state().connect_error.clone() {
            return Err(BoletaError::Transport(message));
        }
        Ok(Box::new(MockSocket {
            adapter: self.clone(),
            closed: false,
        }))
    }
}

/// Socket handed out by [`MockAdapter::connect`].
pub struct MockSocket {
    adapter: MockAdapter,
    closed: bool,
}

impl SppSocket for MockSocket {
    fn write_all(&mut self, data: &[u8]) -> Result<(), BoletaError> {
        self.adapter.record(MockCall::Write(data.to_vec()));
        let mut state = self.adapter.state();
        if let Some(message) = state.write_error.clone() {
            return Err(BoletaError::Transport(message));
        }
        state.written.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BoletaError> {
        self.adapter.record(MockCall::Flush);
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoletaError> {
        self.adapter.record(MockCall::Close);
        if self.closed {
            return Err(BoletaError::Transport("Socket is already closed".to_string()));
        }
        self.closed = true;
        match self.adapter.state().close_error.clone() {
            Some(message) => Err(BoletaError::Transport(message)),
            None => Ok(()),
        }
    }
}
