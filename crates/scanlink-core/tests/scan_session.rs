//! End-to-end scan session scenarios against the in-memory radio.
//!
//! Time is paused in every test, so multi-second timeouts complete instantly
//! while still firing in the order real timers would.

use std::sync::Arc;
use std::time::Duration;

use scanlink_core::{
    Advertisement, BroadcastSink, DiscoveryRegistry, EventSink, MockRadio, ScanController,
    ScanEvent, ScanRequest, SessionId,
};
use tokio::sync::broadcast::Receiver;

struct Rig {
    radio: Arc<MockRadio>,
    controller: ScanController,
    events: Receiver<ScanEvent>,
}

fn rig() -> Rig {
    let radio = Arc::new(MockRadio::new());
    let sink = BroadcastSink::new(256);
    let events = sink.subscribe();
    let sink: Arc<dyn EventSink> = Arc::new(sink);
    let registry = Arc::new(DiscoveryRegistry::new(Arc::clone(&sink)));
    let controller = ScanController::new(radio.clone(), registry, sink);
    Rig {
        radio,
        controller,
        events,
    }
}

fn drain(events: &mut Receiver<ScanEvent>) -> Vec<ScanEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

fn stopped_sessions(events: &[ScanEvent]) -> Vec<SessionId> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::ScanStopped { session_id } => Some(*session_id),
            ScanEvent::PeripheralDiscovered(_) => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn timed_scan_merges_discoveries_and_stops_once() {
    let mut rig = rig();
    let session = rig
        .controller
        .start_scan(ScanRequest::with_timeout(5))
        .await
        .unwrap();

    assert!(rig.radio.inject(Advertisement::new("AA:BB", -60, [0x01])));
    assert!(rig.radio.inject(Advertisement::new("AA:BB", -55, [0x02, 0x03])));

    tokio::time::sleep(Duration::from_secs(6)).await;

    let events = drain(&mut rig.events);
    let discovered: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::PeripheralDiscovered(view) => Some(view),
            ScanEvent::ScanStopped { .. } => None,
        })
        .collect();

    assert_eq!(discovered.len(), 2);
    assert_eq!(discovered[1].rssi, -55);
    assert_eq!(discovered[1].advertising, vec![0x02, 0x03]);
    assert_eq!(stopped_sessions(&events), vec![session]);
    assert!(matches!(events.last(), Some(ScanEvent::ScanStopped { .. })));

    let registry = rig.controller.registry();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(&"AA:BB".into()).unwrap().rssi, -55);
}

#[tokio::test(start_paused = true)]
async fn explicit_stop_before_timeout_suppresses_stop_event() {
    let mut rig = rig();
    rig.controller
        .start_scan(ScanRequest::with_timeout(5))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    rig.controller.stop_scan().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(stopped_sessions(&drain(&mut rig.events)).is_empty());
    assert!(!rig.controller.is_scanning().await);
}

#[tokio::test(start_paused = true)]
async fn only_latest_session_timeout_takes_effect() {
    let mut rig = rig();

    let mut sessions = Vec::new();
    for _ in 0..5 {
        sessions.push(
            rig.controller
                .start_scan(ScanRequest::with_timeout(4))
                .await
                .unwrap(),
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    tokio::time::sleep(Duration::from_secs(10)).await;

    let latest = *sessions.last().unwrap();
    assert_eq!(stopped_sessions(&drain(&mut rig.events)), vec![latest]);
    assert_eq!(rig.radio.stop_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn scan_without_timeout_runs_until_stopped() {
    let mut rig = rig();
    rig.controller
        .start_scan(ScanRequest::with_timeout(0))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
    assert!(rig.controller.is_scanning().await);
    assert!(rig.radio.is_scanning());

    rig.controller.stop_scan().await.unwrap();
    assert!(!rig.radio.is_scanning());
    assert!(stopped_sessions(&drain(&mut rig.events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_then_restart_keeps_new_scan_alive_past_old_deadline() {
    let mut rig = rig();
    rig.controller
        .start_scan(ScanRequest::with_timeout(5))
        .await
        .unwrap();
    rig.controller.stop_scan().await.unwrap();
    let second = rig
        .controller
        .start_scan(ScanRequest::with_timeout(0))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(rig.controller.is_scanning().await);
    assert_eq!(rig.controller.current_session(), second);
    assert!(stopped_sessions(&drain(&mut rig.events)).is_empty());
}

#[tokio::test]
async fn request_is_forwarded_to_radio() {
    let rig = rig();
    let mut request = ScanRequest::with_timeout(0).with_services([uuid::Uuid::from_u128(0x180F)]);
    request.allow_duplicates = true;

    rig.controller.start_scan(request.clone()).await.unwrap();

    assert_eq!(rig.radio.last_request(), Some(request));
}
