//! # Device Bridge
//!
//! Scan, connect, disconnect and print over a single Bluetooth Classic
//! connection slot.
//!
//! The bridge owns one [`Session`]: the connection slot and the discovery
//! registration. Discovery and connection are independent axes, but the
//! radio cannot do both well at once, so connecting always cancels
//! discovery first.
//!
//! ```no_run
//! use std::sync::Arc;
//! use boleta::bridge::{BridgeConfig, DeviceBridge};
//! use boleta::platform::bluez::BluezAdapter;
//!
//! # async fn example() -> Result<(), boleta::error::BoletaError> {
//! let bridge = DeviceBridge::new(Arc::new(BluezAdapter::default()), BridgeConfig::default());
//! bridge.connect_device("00:11:22:33:44:55").await?;
//! bridge.print_raw("G0A=").await?;
//! bridge.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::command::Command;
use crate::error::BoletaError;
use crate::platform::{BluetoothAdapter, Device, DiscoveryEvent, SPP_UUID, SppSocket};

/// Default wait between cancelling a running discovery and restarting it.
pub const DEFAULT_DISCOVERY_SETTLE: Duration = Duration::from_millis(500);

/// Bridge tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Platform discovery cancel is asynchronous; restarting right away can
    /// silently do nothing.
    pub discovery_settle: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            discovery_settle: DEFAULT_DISCOVERY_SETTLE,
        }
    }
}

type SharedSocket = Arc<Mutex<Box<dyn SppSocket>>>;

struct Connection {
    device: Device,
    socket: SharedSocket,
}

struct Registration {
    id: u64,
    listener: AbortHandle,
}

/// Connection slot and discovery registration of one bridge.
#[derive(Default)]
struct Session {
    connection: Option<Connection>,
    discovery: Option<Registration>,
}

struct Inner {
    adapter: Arc<dyn BluetoothAdapter>,
    config: BridgeConfig,
    session: Mutex<Session>,
    next_registration: AtomicU64,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop the discovery registration if `id` still owns it.
    fn release_registration(&self, id: u64) -> bool {
        let mut session = self.session();
        let current = session.discovery.as_ref().is_some_and(|r| r.id == id);
        if current {
            session.discovery = None;
        }
        current
    }
}

/// # Device Bridge
///
/// Cheap to clone; clones share one session. Independent bridges (built
/// with separate [`DeviceBridge::new`] calls) share nothing.
#[derive(Clone)]
pub struct DeviceBridge {
    inner: Arc<Inner>,
}

/// Handle to a running scan's listener.
///
/// Dropping the handle leaves the scan running; use [`cancel`](Self::cancel)
/// or [`DeviceBridge::stop_scanning`] to end it.
pub struct ScanSubscription {
    id: u64,
    bridge: Weak<Inner>,
    listener: JoinHandle<()>,
}

impl ScanSubscription {
    /// Stop delivering callbacks and release the registration.
    ///
    /// Platform discovery is cancelled too, unless a newer scan has taken
    /// over the registration.
    pub async fn cancel(&self) {
        self.listener.abort();
        let Some(inner) = self.bridge.upgrade() else {
            return;
        };
        if inner.release_registration(self.id) {
            debug!("Scan subscription cancelled");
            if inner.adapter.is_discovering().await {
                inner.adapter.cancel_discovery().await;
            }
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.listener.abort_handle()
    }

    pub fn is_finished(&self) -> bool {
        self.listener.is_finished()
    }

    /// Wait for the listener to end.
    ///
    /// Returns `true` when the platform signalled the end of discovery and
    /// `false` when the subscription was cancelled.
    pub async fn finished(self) -> bool {
        self.listener.await.is_ok()
    }
}

impl DeviceBridge {
    pub fn new(adapter: Arc<dyn BluetoothAdapter>, config: BridgeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                adapter,
                config,
                session: Mutex::new(Session::default()),
                next_registration: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    fn adapter(&self) -> &dyn BluetoothAdapter {
        self.inner.adapter.as_ref()
    }

    async fn ensure_ready(&self) -> Result<(), BoletaError> {
        if !self.adapter().is_available().await {
            return Err(BoletaError::NotAvailable);
        }
        if !self.adapter().is_enabled().await {
            return Err(BoletaError::NotEnabled);
        }
        Ok(())
    }

    pub async fn is_available(&self) -> bool {
        self.adapter().is_available().await
    }

    /// Whether the adapter is switched on. `false` when there is no adapter.
    pub async fn is_enabled(&self) -> bool {
        self.adapter().is_available().await && self.adapter().is_enabled().await
    }

    /// Ask the platform to switch Bluetooth on.
    pub async fn request_enable(&self) -> Result<bool, BoletaError> {
        if !self.adapter().is_available().await {
            return Err(BoletaError::NotAvailable);
        }
        let dispatched = self.adapter().request_enable().await?;
        info!(dispatched, "Bluetooth enable requested");
        Ok(dispatched)
    }

    /// Whether this bridge holds a discovery registration.
    pub fn is_scanning(&self) -> bool {
        self.inner.session().discovery.is_some()
    }

    /// # Start Scanning
    ///
    /// Starts discovery and calls `on_found` once per discovered device, in
    /// discovery order, until the platform signals that discovery finished.
    ///
    /// A discovery already running is cancelled first, and the new one only
    /// starts after [`BridgeConfig::discovery_settle`]. Any previous
    /// registration is released.
    pub async fn start_scanning<F>(&self, on_found: F) -> Result<ScanSubscription, BoletaError>
    where
        F: Fn(Device) + Send + 'static,
    {
        self.ensure_ready().await?;

        if self.adapter().is_discovering().await {
            debug!("Discovery already running, restarting");
            self.adapter().cancel_discovery().await;
            tokio::time::sleep(self.inner.config.discovery_settle).await;
        }

        if let Some(previous) = self.inner.session().discovery.take() {
            previous.listener.abort();
        }

        let mut events = self
            .adapter()
            .start_discovery()
            .await
            .map_err(|e| BoletaError::DiscoveryFailed(detail(e)))?;

        let id = self.inner.next_registration.fetch_add(1, Ordering::Relaxed);
        let bridge: Weak<Inner> = Arc::downgrade(&self.inner);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    DiscoveryEvent::DeviceFound(device) => {
                        debug!(device = %device.id, name = %device.name, rssi = ?device.rssi, "Device found");
                        on_found(device);
                    }
                    DiscoveryEvent::Finished => break,
                }
            }
            debug!("Discovery finished");
            if let Some(inner) = bridge.upgrade() {
                inner.release_registration(id);
            }
        });

        let replaced = self.inner.session().discovery.replace(Registration {
            id,
            listener: listener.abort_handle(),
        });
        if let Some(replaced) = replaced {
            replaced.listener.abort();
        }

        info!("Scanning started");
        Ok(ScanSubscription {
            id,
            bridge: Arc::downgrade(&self.inner),
            listener,
        })
    }

    /// Cancel discovery if active and release the registration.
    ///
    /// Returns `false` when there is no adapter. Idempotent.
    pub async fn stop_scanning(&self) -> bool {
        if !self.adapter().is_available().await {
            return false;
        }
        self.cancel_discovery().await;
        true
    }

    async fn cancel_discovery(&self) {
        if self.adapter().is_discovering().await {
            self.adapter().cancel_discovery().await;
            debug!("Discovery cancelled");
        }
        if let Some(registration) = self.inner.session().discovery.take() {
            registration.listener.abort();
        }
    }

    /// Bonded devices. Empty when Bluetooth is absent, off, or the lookup
    /// fails.
    pub async fn get_paired_devices(&self) -> Vec<Device> {
        if !self.is_enabled().await {
            return Vec::new();
        }
        match self.adapter().bonded_devices().await {
            Ok(devices) => devices
                .into_iter()
                .map(|d| Device::bonded(d.id, d.name))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Bonded device lookup failed");
                Vec::new()
            }
        }
    }

    /// # Connect
    ///
    /// Cancels discovery, closes any existing connection, then opens an SPP
    /// socket to `id` (a MAC address) and waits until it is connected.
    #[instrument(skip(self, id), fields(device = %id))]
    pub async fn connect_device(&self, id: &str) -> Result<bool, BoletaError> {
        self.ensure_ready().await?;
        self.cancel_discovery().await;

        if let Some(previous) = self.take_connection() {
            debug!(previous = %previous.device.id, "Closing previous connection");
            if let Err(e) = close(previous.socket).await {
                warn!(error = %e, "Closing previous connection failed");
            }
        }

        let socket = self
            .adapter()
            .connect(id, SPP_UUID)
            .await
            .map_err(|e| BoletaError::ConnectionFailed(detail(e)))?;

        let device = Device::bonded(id, self.resolve_name(id).await);
        info!(name = %device.name, "Connected");

        let replaced = self.inner.session().connection.replace(Connection {
            device,
            socket: Arc::new(Mutex::new(socket)),
        });
        if let Some(replaced) = replaced
            && let Err(e) = close(replaced.socket).await
        {
            warn!(error = %e, "Closing replaced connection failed");
        }

        Ok(true)
    }

    async fn resolve_name(&self, id: &str) -> String {
        self.adapter()
            .bonded_devices()
            .await
            .ok()
            .and_then(|devices| {
                devices
                    .into_iter()
                    .find(|d| d.id.eq_ignore_ascii_case(id))
                    .map(|d| d.name)
            })
            .unwrap_or_else(|| id.to_string())
    }

    fn take_connection(&self) -> Option<Connection> {
        self.inner.session().connection.take()
    }

    /// Close the active socket. A no-op when nothing is connected.
    ///
    /// The slot is cleared even when the close fails.
    pub async fn disconnect(&self) -> Result<bool, BoletaError> {
        let Some(connection) = self.take_connection() else {
            debug!("Disconnect with no connection");
            return Ok(true);
        };

        close(connection.socket)
            .await
            .map_err(|e| BoletaError::DisconnectFailed(detail(e)))?;

        info!(device = %connection.device.id, "Disconnected");
        Ok(true)
    }

    pub fn get_connected_device(&self) -> Option<Device> {
        self.inner
            .session()
            .connection
            .as_ref()
            .map(|c| c.device.clone())
    }

    fn connected_socket(&self) -> Result<SharedSocket, BoletaError> {
        self.inner
            .session()
            .connection
            .as_ref()
            .map(|c| Arc::clone(&c.socket))
            .ok_or(BoletaError::NotConnected)
    }

    /// # Print Raw
    ///
    /// Decode a base64 payload and write it to the connected printer.
    ///
    /// Fails with [`BoletaError::NotConnected`] before looking at the
    /// payload when nothing is connected.
    #[instrument(skip_all, fields(payload_len = payload.len()))]
    pub async fn print_raw(&self, payload: &str) -> Result<bool, BoletaError> {
        let socket = self.connected_socket()?;
        let command = Command::from_base64(payload)?;
        self.send(socket, command.into_bytes()).await
    }

    /// Write a composed command to the connected printer.
    #[instrument(skip_all, fields(bytes = command.len()))]
    pub async fn print(&self, command: &Command) -> Result<bool, BoletaError> {
        let socket = self.connected_socket()?;
        self.send(socket, command.as_bytes().to_vec()).await
    }

    async fn send(&self, socket: SharedSocket, bytes: Vec<u8>) -> Result<bool, BoletaError> {
        let len = bytes.len();
        let result = blocking(Arc::clone(&socket), move |s| {
            s.write_all(&bytes)?;
            s.flush()
        })
        .await;

        if let Err(e) = result {
            warn!(error = %e, "Write failed, dropping connection");
            self.drop_connection(&socket).await;
            return Err(BoletaError::PrintFailed(detail(e)));
        }

        debug!(bytes = len, "Sent");
        Ok(true)
    }

    /// Remove `socket` from the slot if it is still the active one.
    async fn drop_connection(&self, socket: &SharedSocket) {
        let dropped = {
            let mut session = self.inner.session();
            match &session.connection {
                Some(c) if Arc::ptr_eq(&c.socket, socket) => session.connection.take(),
                _ => None,
            }
        };
        if let Some(connection) = dropped
            && let Err(e) = close(connection.socket).await
        {
            debug!(error = %e, "Closing dropped connection failed");
        }
    }
}

/// Run a blocking socket operation off the async runtime.
async fn blocking<T, F>(socket: SharedSocket, op: F) -> Result<T, BoletaError>
where
    T: Send + 'static,
    F: FnOnce(&mut Box<dyn SppSocket>) -> Result<T, BoletaError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = socket.lock().unwrap_or_else(|p| p.into_inner());
        op(&mut guard)
    })
    .await
    .map_err(|e| BoletaError::Transport(format!("Socket task failed: {}", e)))?
}

async fn close(socket: SharedSocket) -> Result<(), BoletaError> {
    blocking(socket, |s| s.close()).await
}

/// The platform's own message, without our wrapper prefix.
fn detail(error: BoletaError) -> String {
    match error {
        BoletaError::Transport(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockAdapter, MockCall};
    use pretty_assertions::assert_eq;

    fn bridge(mock: &MockAdapter) -> DeviceBridge {
        DeviceBridge::new(
            Arc::new(mock.clone()),
            BridgeConfig {
                discovery_settle: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn test_preconditions() {
        let mock = MockAdapter::unavailable();
        let bridge = bridge(&mock);
        assert!(!bridge.is_enabled().await);
        assert!(matches!(bridge.request_enable().await, Err(BoletaError::NotAvailable)));
        assert!(matches!(bridge.connect_device("00:11:22:33:44:55").await, Err(BoletaError::NotAvailable)));
        assert!(!bridge.stop_scanning().await);
        assert!(bridge.get_paired_devices().await.is_empty());

        let mock = MockAdapter::new();
        mock.set_enabled(false);
        let bridge = self::bridge(&mock);
        assert!(matches!(bridge.start_scanning(|_| {}).await, Err(BoletaError::NotEnabled)));
        assert!(matches!(bridge.connect_device("00:11:22:33:44:55").await, Err(BoletaError::NotEnabled)));
        assert!(bridge.stop_scanning().await);
    }

    #[tokio::test]
    async fn test_request_enable_without_ui_context() {
        let mock = MockAdapter::new();
        mock.set_enabled(false);
        mock.set_ui_context(false);
        let bridge = bridge(&mock);
        assert!(matches!(bridge.request_enable().await, Err(BoletaError::NoUiContext)));

        mock.set_ui_context(true);
        assert!(bridge.request_enable().await.unwrap());
        assert!(bridge.is_enabled().await);
    }

    #[tokio::test]
    async fn test_scan_delivers_devices_in_order() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);
        let found = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&found);

        let subscription = bridge
            .start_scanning(move |d| sink.lock().unwrap().push(d.id))
            .await
            .unwrap();
        assert!(bridge.is_scanning());

        assert!(mock.emit(Device::discovered("AA:AA:AA:AA:AA:01", "One", Some(-40))));
        assert!(mock.emit(Device::discovered("AA:AA:AA:AA:AA:02", "Two", None)));
        mock.finish_discovery();

        assert!(subscription.finished().await);
        assert_eq!(
            *found.lock().unwrap(),
            vec!["AA:AA:AA:AA:AA:01".to_string(), "AA:AA:AA:AA:AA:02".to_string()]
        );
        assert!(!bridge.is_scanning());
    }

    #[tokio::test]
    async fn test_restart_cancels_running_discovery_first() {
        let mock = MockAdapter::new();
        mock.set_discovering(true);
        let bridge = bridge(&mock);

        let _subscription = bridge.start_scanning(|_| {}).await.unwrap();
        assert_eq!(
            mock.calls(),
            vec![MockCall::CancelDiscovery, MockCall::StartDiscovery]
        );
    }

    #[tokio::test]
    async fn test_new_scan_releases_previous_registration() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);

        let first = bridge.start_scanning(|_| {}).await.unwrap();
        let _second = bridge.start_scanning(|_| {}).await.unwrap();
        let _ = first.finished().await;

        assert_eq!(
            mock.calls(),
            vec![
                MockCall::StartDiscovery,
                MockCall::CancelDiscovery,
                MockCall::StartDiscovery,
            ]
        );
        assert!(bridge.is_scanning());
        assert!(mock.has_listener());
    }

    #[tokio::test]
    async fn test_stop_scanning_is_idempotent() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);
        let subscription = bridge.start_scanning(|_| {}).await.unwrap();

        assert!(bridge.stop_scanning().await);
        assert!(bridge.stop_scanning().await);
        assert!(!bridge.is_scanning());
        assert!(!mock.has_listener());
        let _ = subscription.finished().await;
        assert_eq!(
            mock.calls()
                .iter()
                .filter(|c| **c == MockCall::CancelDiscovery)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_cancel_releases_registration_and_discovery() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);
        let subscription = bridge.start_scanning(|_| {}).await.unwrap();

        subscription.cancel().await;
        assert!(!bridge.is_scanning());
        assert!(!mock.has_listener());
        assert_eq!(
            mock.calls(),
            vec![MockCall::StartDiscovery, MockCall::CancelDiscovery]
        );
        assert!(!subscription.finished().await);
    }

    #[tokio::test]
    async fn test_cancel_of_replaced_subscription_keeps_newer_scan() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);

        let first = bridge.start_scanning(|_| {}).await.unwrap();
        let _second = bridge.start_scanning(|_| {}).await.unwrap();
        let calls_before = mock.calls().len();

        first.cancel().await;
        assert!(bridge.is_scanning());
        assert!(mock.has_listener());
        assert_eq!(mock.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_connect_resolves_bonded_name() {
        let mock = MockAdapter::new();
        mock.add_bonded(Device::bonded("00:11:22:33:44:55", "PT-210"));
        let bridge = bridge(&mock);

        assert!(bridge.connect_device("00:11:22:33:44:55").await.unwrap());
        assert_eq!(
            bridge.get_connected_device(),
            Some(Device::bonded("00:11:22:33:44:55", "PT-210"))
        );

        bridge.connect_device("66:77:88:99:AA:BB").await.unwrap();
        assert_eq!(
            bridge.get_connected_device().map(|d| d.name),
            Some("66:77:88:99:AA:BB".to_string())
        );
    }

    #[tokio::test]
    async fn test_second_connect_closes_first() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);

        bridge.connect_device("00:11:22:33:44:55").await.unwrap();
        bridge.connect_device("66:77:88:99:AA:BB").await.unwrap();

        let calls: Vec<MockCall> = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::Connect(_) | MockCall::Close))
            .collect();
        assert_eq!(
            calls,
            vec![
                MockCall::Connect("00:11:22:33:44:55".into()),
                MockCall::Close,
                MockCall::Connect("66:77:88:99:AA:BB".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_keeps_platform_message() {
        let mock = MockAdapter::new();
        mock.fail_connect("Host is down");
        let bridge = bridge(&mock);

        match bridge.connect_device("00:11:22:33:44:55").await {
            Err(BoletaError::ConnectionFailed(message)) => assert_eq!(message, "Host is down"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(bridge.get_connected_device(), None);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);

        assert!(bridge.disconnect().await.unwrap());
        assert!(!mock.calls().contains(&MockCall::Close));

        bridge.connect_device("00:11:22:33:44:55").await.unwrap();
        assert!(bridge.disconnect().await.unwrap());
        assert_eq!(bridge.get_connected_device(), None);
        assert!(mock.calls().contains(&MockCall::Close));
    }

    #[tokio::test]
    async fn test_disconnect_failure_clears_slot() {
        let mock = MockAdapter::new();
        mock.fail_close("Bad file descriptor");
        let bridge = bridge(&mock);
        bridge.connect_device("00:11:22:33:44:55").await.unwrap();

        assert!(matches!(
            bridge.disconnect().await,
            Err(BoletaError::DisconnectFailed(_))
        ));
        assert_eq!(bridge.get_connected_device(), None);
    }

    #[tokio::test]
    async fn test_print_raw_decodes_and_flushes() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);
        bridge.connect_device("00:11:22:33:44:55").await.unwrap();

        assert!(bridge.print_raw("G0AKCg==").await.unwrap());
        assert_eq!(mock.written(), vec![0x1B, 0x40, 0x0A, 0x0A]);
        assert_eq!(mock.calls().last(), Some(&MockCall::Flush));
    }

    #[tokio::test]
    async fn test_print_raw_invalid_payload() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);
        bridge.connect_device("00:11:22:33:44:55").await.unwrap();

        assert!(matches!(
            bridge.print_raw("not base64!").await,
            Err(BoletaError::InvalidData(_))
        ));
        assert!(mock.written().is_empty());
        assert!(bridge.get_connected_device().is_some());
    }

    #[tokio::test]
    async fn test_not_connected_checked_before_decoding() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);
        assert!(matches!(
            bridge.print_raw("not base64!").await,
            Err(BoletaError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_write_failure_drops_connection() {
        let mock = MockAdapter::new();
        let bridge = bridge(&mock);
        bridge.connect_device("00:11:22:33:44:55").await.unwrap();
        mock.fail_writes("Broken pipe");

        match bridge.print(&Command::from(vec![0x0A])).await {
            Err(BoletaError::PrintFailed(message)) => assert_eq!(message, "Broken pipe"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(bridge.get_connected_device(), None);
        assert!(matches!(
            bridge.print(&Command::from(vec![0x0A])).await,
            Err(BoletaError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_independent_bridges_do_not_share_sessions() {
        let mock = MockAdapter::new();
        let a = bridge(&mock);
        let b = bridge(&mock);

        a.connect_device("00:11:22:33:44:55").await.unwrap();
        assert!(a.get_connected_device().is_some());
        assert!(b.get_connected_device().is_none());
        assert!(a.clone().get_connected_device().is_some());
    }

    #[test]
    fn test_detail_strips_transport_prefix() {
        assert_eq!(detail(BoletaError::Transport("Host is down".into())), "Host is down");
        assert_eq!(detail(BoletaError::NotEnabled), "Bluetooth is not enabled");
    }
}
