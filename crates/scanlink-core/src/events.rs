//! Events handed to the host application.
//!
//! The core only hands events over; delivering them on whatever context the
//! host needs is the sink's job.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::session::SessionId;
use crate::types::PeripheralView;

/// Event name for a created or updated peripheral.
pub const PERIPHERAL_DISCOVERED: &str = "ScanlinkDiscoverPeripheral";

/// Event name for a scan ended by its timeout.
pub const SCAN_STOPPED: &str = "ScanlinkStopScan";

/// An event emitted by the scan core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ScanEvent {
    /// A peripheral was created or merged.
    #[serde(rename = "ScanlinkDiscoverPeripheral")]
    PeripheralDiscovered(PeripheralView),

    /// A scan reached its timeout and was stopped.
    #[serde(rename = "ScanlinkStopScan")]
    ScanStopped {
        /// Session that timed out.
        session_id: SessionId,
    },
}

impl ScanEvent {
    /// The fixed event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PeripheralDiscovered(_) => PERIPHERAL_DISCOVERED,
            Self::ScanStopped { .. } => SCAN_STOPPED,
        }
    }

    /// The event body without its name, as hosts expect it.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be represented as JSON.
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::PeripheralDiscovered(view) => serde_json::to_value(view),
            Self::ScanStopped { session_id } => {
                Ok(serde_json::json!({ "session_id": session_id }))
            }
        }
    }
}

/// Fire-and-forget event delivery to the host.
pub trait EventSink: Send + Sync {
    /// Hand over one event. Must not block.
    fn emit(&self, event: ScanEvent);
}

/// [`EventSink`] backed by a tokio broadcast channel.
///
/// Subscribers that fall behind by more than the channel capacity lose the
/// oldest events; emitting with no subscribers drops the event.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<ScanEvent>,
}

impl BroadcastSink {
    /// Create a sink buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: ScanEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            trace!(event = name, "no subscribers, event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::types::DeviceIdentity;

    fn view() -> PeripheralView {
        let now = Utc::now();
        PeripheralView {
            id: DeviceIdentity::from("AA:BB:CC:DD:EE:FF"),
            name: None,
            rssi: -55,
            advertising: vec![0x02, 0x03],
            attributes: BTreeMap::new(),
            first_seen_utc: now,
            last_seen_utc: now,
            times_seen: 2,
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(
            ScanEvent::PeripheralDiscovered(view()).name(),
            "ScanlinkDiscoverPeripheral"
        );
        assert_eq!(
            ScanEvent::ScanStopped {
                session_id: SessionId::default()
            }
            .name(),
            "ScanlinkStopScan"
        );
    }

    #[test]
    fn test_serialized_tag_matches_name() {
        let json = serde_json::to_value(ScanEvent::PeripheralDiscovered(view())).unwrap();
        assert_eq!(json["event"], PERIPHERAL_DISCOVERED);
        assert_eq!(json["data"]["rssi"], -55);
    }

    #[test]
    fn test_payload_omits_name() {
        let payload = ScanEvent::PeripheralDiscovered(view()).payload().unwrap();
        assert!(payload.get("event").is_none());
        assert_eq!(payload["id"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(payload["advertising"], serde_json::json!([2, 3]));
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        assert_eq!(sink.subscriber_count(), 1);

        sink.emit(ScanEvent::ScanStopped {
            session_id: SessionId::default(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), SCAN_STOPPED);
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_does_not_fail() {
        let sink = BroadcastSink::new(1);
        sink.emit(ScanEvent::PeripheralDiscovered(view()));
        assert_eq!(sink.subscriber_count(), 0);
    }
}
