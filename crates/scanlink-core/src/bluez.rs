//! BlueZ radio driver.
//!
//! Scans through the system `bluetoothd` over D-Bus using `bluer`. While a
//! scan runs, one background task consumes the adapter's discovery stream,
//! reads the current properties of every added or changed device and hands
//! them to the scan's [`DiscoveryHandler`]. Dropping the stream releases the
//! discovery session, which stops scanning in BlueZ.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
use futures::{pin_mut, StreamExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::advertising::AdvertisementFields;
use crate::driver::{Advertisement, DiscoveryHandler, DriverError, DriverResult, RadioDriver};
use crate::types::{DeviceIdentity, RadioState, ScanRequest};

/// [`RadioDriver`] backed by the default BlueZ adapter.
pub struct BluezDriver {
    // Keeps the D-Bus connection alive for the adapter.
    _session: Session,
    adapter: Adapter,
    discovery: Mutex<Option<JoinHandle<()>>>,
}

impl BluezDriver {
    /// Connect to `bluetoothd` and pick the default adapter.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Unavailable`] if the daemon cannot be reached
    /// or no adapter is present.
    pub async fn new() -> DriverResult<Self> {
        let session = Session::new().await.map_err(unavailable)?;
        let adapter = session.default_adapter().await.map_err(unavailable)?;
        info!(adapter = adapter.name(), "using Bluetooth adapter");

        Ok(Self {
            _session: session,
            adapter,
            discovery: Mutex::new(None),
        })
    }

    /// Name of the adapter in use, e.g. `hci0`.
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }
}

#[async_trait]
impl RadioDriver for BluezDriver {
    async fn start_scan(
        &self,
        request: &ScanRequest,
        handler: Arc<dyn DiscoveryHandler>,
    ) -> DriverResult<()> {
        if !self.adapter.is_powered().await.map_err(unavailable)? {
            return Err(DriverError::PoweredOff);
        }

        let filter = DiscoveryFilter {
            uuids: request.service_uuids.iter().copied().collect::<HashSet<_>>(),
            transport: DiscoveryTransport::Le,
            duplicate_data: request.allow_duplicates,
            ..DiscoveryFilter::default()
        };
        self.adapter
            .set_discovery_filter(filter)
            .await
            .map_err(|e| DriverError::command_failed("start_scan", e.to_string()))?;

        let events = self
            .adapter
            .discover_devices_with_changes()
            .await
            .map_err(|e| DriverError::command_failed("start_scan", e.to_string()))?;

        let adapter = self.adapter.clone();
        let task = tokio::spawn(async move {
            pin_mut!(events);
            while let Some(event) = events.next().await {
                // Devices whose properties change are re-announced as added.
                let AdapterEvent::DeviceAdded(address) = event else {
                    continue;
                };
                match read_advertisement(&adapter, address).await {
                    Ok(Some(advertisement)) => handler.on_discovered(advertisement),
                    Ok(None) => trace!(%address, "cached device without signal skipped"),
                    Err(err) => debug!(%address, error = %err, "failed to read device properties"),
                }
            }
            debug!("discovery stream ended");
        });

        if let Some(previous) = self.discovery.lock().await.replace(task) {
            previous.abort();
        }
        debug!(adapter = self.adapter.name(), "discovery started");
        Ok(())
    }

    async fn stop_scan(&self) -> DriverResult<()> {
        match self.discovery.lock().await.take() {
            Some(task) => {
                task.abort();
                debug!(adapter = self.adapter.name(), "discovery stopped");
                Ok(())
            }
            None => Err(DriverError::NotScanning),
        }
    }

    async fn state(&self) -> RadioState {
        match self.adapter.is_powered().await {
            Ok(true) => RadioState::On,
            Ok(false) => RadioState::Off,
            Err(err) => {
                debug!(error = %err, "adapter power state unreadable");
                RadioState::Unavailable
            }
        }
    }

    fn supports_service_filter(&self) -> bool {
        true
    }
}

impl Drop for BluezDriver {
    fn drop(&mut self) {
        if let Some(task) = self.discovery.get_mut().take() {
            task.abort();
        }
    }
}

/// Current advertisement of `address`, or `None` for cached devices that are
/// not in range (BlueZ reports no RSSI for those).
async fn read_advertisement(
    adapter: &Adapter,
    address: Address,
) -> bluer::Result<Option<Advertisement>> {
    let device = adapter.device(address)?;
    let Some(rssi) = device.rssi().await? else {
        return Ok(None);
    };

    let fields = AdvertisementFields {
        local_name: device.name().await?,
        tx_power: device.tx_power().await?,
        manufacturer_data: device.manufacturer_data().await?.unwrap_or_default(),
        service_data: device.service_data().await?.unwrap_or_default(),
    };
    let payload = fields.encode();

    Ok(Some(Advertisement {
        identity: DeviceIdentity::new(address.to_string()),
        rssi,
        payload,
        local_name: fields.local_name,
    }))
}

fn unavailable(err: bluer::Error) -> DriverError {
    DriverError::Unavailable {
        reason: err.to_string(),
    }
}
