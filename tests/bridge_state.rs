//! # Bridge State Machine Tests
//!
//! Drive the device bridge and the state façade against the in-memory
//! platform and check the order of platform calls.

use std::sync::Arc;
use std::time::Duration;

use boleta::bridge::{BridgeConfig, DeviceBridge};
use boleta::platform::mock::{MockAdapter, MockCall};
use boleta::{BoletaError, Device, PrinterFacade};
use pretty_assertions::assert_eq;

fn bridge(mock: &MockAdapter) -> DeviceBridge {
    DeviceBridge::new(
        Arc::new(mock.clone()),
        BridgeConfig {
            discovery_settle: Duration::from_millis(5),
        },
    )
}

#[tokio::test]
async fn connect_while_discovering_cancels_discovery_first() {
    let mock = MockAdapter::new();
    let bridge = bridge(&mock);

    let _scan = bridge.start_scanning(|_| {}).await.unwrap();
    assert!(bridge.is_scanning());

    bridge.connect_device("00:11:22:33:44:55").await.unwrap();

    let calls = mock.calls();
    let cancel = calls.iter().position(|c| *c == MockCall::CancelDiscovery);
    let connect = calls
        .iter()
        .position(|c| *c == MockCall::Connect("00:11:22:33:44:55".into()));
    assert!(cancel.is_some(), "no discovery cancel in {:?}", calls);
    assert!(cancel < connect, "cancel must precede connect: {:?}", calls);
    assert!(!bridge.is_scanning());
    assert!(!mock.has_listener());
}

#[tokio::test]
async fn print_raw_without_connection_writes_nothing() {
    let mock = MockAdapter::new();
    let bridge = bridge(&mock);

    let err = bridge.print_raw("G0A=").await.unwrap_err();
    assert!(matches!(err, BoletaError::NotConnected));
    assert_eq!(err.code(), "NOT_CONNECTED");
    assert!(!mock.calls().iter().any(|c| matches!(c, MockCall::Write(_))));
    assert!(mock.written().is_empty());
}

#[tokio::test]
async fn scan_callbacks_follow_discovery_order() {
    let mock = MockAdapter::new();
    let bridge = bridge(&mock);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let scan = bridge
        .start_scanning(move |device| {
            let _ = tx.send(device);
        })
        .await
        .unwrap();

    mock.emit(Device::discovered("AA:00:00:00:00:03", "C", Some(-70)));
    mock.emit(Device::discovered("AA:00:00:00:00:01", "A", Some(-30)));
    mock.finish_discovery();
    assert!(scan.finished().await);

    let mut names = Vec::new();
    while let Ok(device) = rx.try_recv() {
        names.push(device.name);
    }
    assert_eq!(names, vec!["C".to_string(), "A".to_string()]);
}

#[tokio::test]
async fn cancelled_subscription_stops_callbacks() {
    let mock = MockAdapter::new();
    let bridge = bridge(&mock);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let scan = bridge
        .start_scanning(move |device| {
            let _ = tx.send(device);
        })
        .await
        .unwrap();
    scan.cancel().await;
    assert!(!bridge.is_scanning());
    assert!(!mock.has_listener());
    assert!(!scan.finished().await);

    assert!(!mock.emit(Device::discovered("AA:00:00:00:00:01", "Late", None)));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn facade_dedups_discovered_devices() {
    let mock = MockAdapter::new();
    let facade = PrinterFacade::new(bridge(&mock));
    let mut rx = facade.subscribe();

    facade.start_scan().await;
    for rssi in [-60, -55, -50] {
        mock.emit(Device::discovered("AA:00:00:00:00:01", "Printer", Some(rssi)));
    }
    mock.emit(Device::discovered("AA:00:00:00:00:02", "Phone", Some(-80)));
    mock.finish_discovery();

    let state = rx.wait_for(|s| !s.is_scanning).await.unwrap().clone();
    assert_eq!(state.discovered.len(), 2);
    assert_eq!(state.discovered[0].rssi, Some(-60));
}

#[tokio::test]
async fn full_session() {
    let mock = MockAdapter::new();
    mock.add_bonded(Device::bonded("66:22:8E:11:22:33", "MTP-II"));
    let facade = PrinterFacade::new(bridge(&mock));

    assert!(facade.mount().await.success);
    assert_eq!(facade.state().paired.len(), 1);

    assert!(facade.connect("66:22:8E:11:22:33").await.success);
    assert_eq!(facade.state().status_message, "Connected to MTP-II");

    let receipt = boleta::receipt::test_receipt(&boleta::Composer::default());
    assert!(facade.print(&receipt).await.success);
    assert_eq!(mock.written(), receipt.into_bytes());

    assert!(facade.disconnect().await.success);
    assert!(facade.disconnect().await.success);
    assert_eq!(facade.state().connected, None);

    facade.unmount().await;
    assert!(!facade.state().is_loading);
}
