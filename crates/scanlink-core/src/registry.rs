//! Peripherals seen by the scanner.
//!
//! The registry keeps one record per device identity for the lifetime of the
//! process. Every advertisement either creates the record or overwrites its
//! signal strength and payload in place, then the merged record is emitted as
//! a [`ScanEvent::PeripheralDiscovered`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::driver::{Advertisement, DiscoveryHandler};
use crate::events::{EventSink, ScanEvent};
use crate::types::{DeviceIdentity, PeripheralView};

/// Merged state for one discovered device.
#[derive(Debug, Clone)]
pub struct Peripheral {
    identity: DeviceIdentity,
    name: Option<String>,
    rssi: i16,
    payload: Vec<u8>,
    attributes: BTreeMap<String, String>,
    first_seen_utc: DateTime<Utc>,
    last_seen_utc: DateTime<Utc>,
    times_seen: u64,
}

impl Peripheral {
    fn new(advertisement: Advertisement, now: DateTime<Utc>) -> Self {
        Self {
            identity: advertisement.identity,
            name: advertisement.local_name,
            rssi: advertisement.rssi,
            payload: advertisement.payload,
            attributes: BTreeMap::new(),
            first_seen_utc: now,
            last_seen_utc: now,
            times_seen: 1,
        }
    }

    /// Overwrite signal and payload. A missing name keeps the known one.
    fn merge(&mut self, advertisement: Advertisement, now: DateTime<Utc>) {
        self.rssi = advertisement.rssi;
        self.payload = advertisement.payload;
        if advertisement.local_name.is_some() {
            self.name = advertisement.local_name;
        }
        self.last_seen_utc = now;
        self.times_seen += 1;
    }

    /// Device identity.
    #[must_use]
    pub const fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Latest signal strength in dBm.
    #[must_use]
    pub const fn rssi(&self) -> i16 {
        self.rssi
    }

    /// Latest advertisement payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Read-only snapshot.
    #[must_use]
    pub fn view(&self) -> PeripheralView {
        PeripheralView {
            id: self.identity.clone(),
            name: self.name.clone(),
            rssi: self.rssi,
            advertising: self.payload.clone(),
            attributes: self.attributes.clone(),
            first_seen_utc: self.first_seen_utc,
            last_seen_utc: self.last_seen_utc,
            times_seen: self.times_seen,
        }
    }
}

/// Concurrency-safe set of discovered peripherals.
pub struct DiscoveryRegistry {
    peripherals: Mutex<HashMap<DeviceIdentity, Peripheral>>,
    sink: Arc<dyn EventSink>,
}

impl DiscoveryRegistry {
    /// Create an empty registry emitting to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            peripherals: Mutex::new(HashMap::new()),
            sink,
        }
    }

    /// Create-or-merge the record for `advertisement.identity` and emit it.
    ///
    /// The map lock is held across the merge and the hand-over to the sink,
    /// so events for one identity leave in the order their merges happened.
    pub fn on_discovered(&self, advertisement: Advertisement) {
        let now = Utc::now();
        let mut peripherals = self.lock();

        let view = match peripherals.get_mut(&advertisement.identity) {
            Some(existing) => {
                trace!(
                    identity = %advertisement.identity,
                    rssi = advertisement.rssi,
                    "merging advertisement into known peripheral"
                );
                existing.merge(advertisement, now);
                existing.view()
            }
            None => {
                debug!(
                    identity = %advertisement.identity,
                    rssi = advertisement.rssi,
                    name = ?advertisement.local_name,
                    "discovered new peripheral"
                );
                let peripheral = Peripheral::new(advertisement, now);
                let view = peripheral.view();
                peripherals.insert(peripheral.identity.clone(), peripheral);
                view
            }
        };

        self.sink.emit(ScanEvent::PeripheralDiscovered(view));
    }

    /// Snapshot of one peripheral.
    #[must_use]
    pub fn get(&self, identity: &DeviceIdentity) -> Option<PeripheralView> {
        self.lock().get(identity).map(Peripheral::view)
    }

    /// Snapshots of every known peripheral, ordered by identity.
    #[must_use]
    pub fn discovered(&self) -> Vec<PeripheralView> {
        let mut views: Vec<_> = self.lock().values().map(Peripheral::view).collect();
        views.sort_by(|a, b| a.id.cmp(&b.id));
        views
    }

    /// Number of known peripherals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no peripheral has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop a peripheral on caller request. Returns whether it was known.
    pub fn forget(&self, identity: &DeviceIdentity) -> bool {
        let removed = self.lock().remove(identity).is_some();
        if removed {
            debug!(identity = %identity, "peripheral forgotten");
        }
        removed
    }

    /// Attach metadata to a known peripheral. Returns whether it was known.
    ///
    /// Attributes survive later advertisement merges.
    pub fn annotate(
        &self,
        identity: &DeviceIdentity,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        match self.lock().get_mut(identity) {
            Some(peripheral) => {
                peripheral.attributes.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceIdentity, Peripheral>> {
        // A panicking sink cannot leave a record half-merged, so keep going.
        self.peripherals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiscoveryHandler for DiscoveryRegistry {
    fn on_discovered(&self, advertisement: Advertisement) {
        Self::on_discovered(self, advertisement);
    }
}

impl std::fmt::Debug for DiscoveryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryRegistry")
            .field("peripherals", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastSink;

    fn registry() -> (DiscoveryRegistry, BroadcastSink) {
        let sink = BroadcastSink::new(64);
        (DiscoveryRegistry::new(Arc::new(sink.clone())), sink)
    }

    #[test]
    fn test_first_advertisement_creates_record() {
        let (registry, _sink) = registry();
        registry.on_discovered(Advertisement::new("AA:BB", -60, [0x01]));

        let view = registry.get(&"AA:BB".into()).unwrap();
        assert_eq!(view.rssi, -60);
        assert_eq!(view.advertising, vec![0x01]);
        assert_eq!(view.times_seen, 1);
        assert_eq!(view.first_seen_utc, view.last_seen_utc);
    }

    #[test]
    fn test_repeat_advertisement_merges_in_place() {
        let (registry, _sink) = registry();
        registry.on_discovered(Advertisement::new("AA:BB", -60, [0x01]));
        registry.on_discovered(Advertisement::new("AA:BB", -55, [0x02, 0x03]));

        assert_eq!(registry.len(), 1);
        let view = registry.get(&"AA:BB".into()).unwrap();
        assert_eq!(view.rssi, -55);
        assert_eq!(view.advertising, vec![0x02, 0x03]);
        assert_eq!(view.times_seen, 2);
    }

    #[test]
    fn test_merge_keeps_known_name() {
        let (registry, _sink) = registry();
        registry.on_discovered(Advertisement::new("AA:BB", -60, []).with_name("Strap"));
        registry.on_discovered(Advertisement::new("AA:BB", -58, []));
        assert_eq!(
            registry.get(&"AA:BB".into()).unwrap().name.as_deref(),
            Some("Strap")
        );

        registry.on_discovered(Advertisement::new("AA:BB", -58, []).with_name("Strap v2"));
        assert_eq!(
            registry.get(&"AA:BB".into()).unwrap().name.as_deref(),
            Some("Strap v2")
        );
    }

    #[test]
    fn test_merge_preserves_attributes() {
        let (registry, _sink) = registry();
        let id = DeviceIdentity::from("AA:BB");
        registry.on_discovered(Advertisement::new(id.clone(), -60, [0x01]));
        assert!(registry.annotate(&id, "bonded", "true"));

        registry.on_discovered(Advertisement::new(id.clone(), -40, [0x09]));

        let view = registry.get(&id).unwrap();
        assert_eq!(view.attributes.get("bonded").map(String::as_str), Some("true"));
        assert_eq!(view.rssi, -40);
    }

    #[test]
    fn test_annotate_unknown_peripheral() {
        let (registry, _sink) = registry();
        assert!(!registry.annotate(&"CC:DD".into(), "k", "v"));
    }

    #[test]
    fn test_every_merge_is_emitted() {
        let (registry, sink) = registry();
        let mut rx = sink.subscribe();

        registry.on_discovered(Advertisement::new("AA:BB", -60, [0x01]));
        registry.on_discovered(Advertisement::new("AA:BB", -55, [0x02, 0x03]));

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err());

        match (first, second) {
            (ScanEvent::PeripheralDiscovered(a), ScanEvent::PeripheralDiscovered(b)) => {
                assert_eq!(a.rssi, -60);
                assert_eq!(b.rssi, -55);
                assert_eq!(b.advertising, vec![0x02, 0x03]);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn test_forget() {
        let (registry, _sink) = registry();
        registry.on_discovered(Advertisement::new("AA:BB", -60, [0x01]));

        assert!(registry.forget(&"AA:BB".into()));
        assert!(!registry.forget(&"AA:BB".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discovered_is_sorted() {
        let (registry, _sink) = registry();
        registry.on_discovered(Advertisement::new("CC", -70, []));
        registry.on_discovered(Advertisement::new("AA", -60, []));
        registry.on_discovered(Advertisement::new("BB", -65, []));

        let ids: Vec<_> = registry
            .discovered()
            .into_iter()
            .map(|v| v.id.to_string())
            .collect();
        assert_eq!(ids, ["AA", "BB", "CC"]);
    }
}
