//! In-memory radio for tests and machines without BlueZ.
//!
//! [`MockRadio`] records the commands it receives and lets callers push
//! advertisements into the active scan as if they came from hardware.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::driver::{Advertisement, DiscoveryHandler, DriverError, DriverResult, RadioDriver};
use crate::types::{RadioState, ScanRequest};

/// A scriptable [`RadioDriver`].
pub struct MockRadio {
    inner: Mutex<MockState>,
}

struct MockState {
    state: RadioState,
    filters_supported: bool,
    handler: Option<Arc<dyn DiscoveryHandler>>,
    last_request: Option<ScanRequest>,
    start_calls: usize,
    stop_calls: usize,
    fail_next_start: Option<DriverError>,
    fail_next_stop: Option<DriverError>,
}

impl MockRadio {
    /// A powered radio that supports service filtering.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockState {
                state: RadioState::On,
                filters_supported: true,
                handler: None,
                last_request: None,
                start_calls: 0,
                stop_calls: 0,
                fail_next_start: None,
                fail_next_stop: None,
            }),
        }
    }

    /// Change the reported power state.
    pub fn set_state(&self, state: RadioState) {
        self.lock().state = state;
    }

    /// Change the service-filter capability.
    pub fn set_service_filter_support(&self, supported: bool) {
        self.lock().filters_supported = supported;
    }

    /// Make the next start command fail with `error`.
    pub fn fail_next_start(&self, error: DriverError) {
        self.lock().fail_next_start = Some(error);
    }

    /// Make the next stop command fail with `error`.
    pub fn fail_next_stop(&self, error: DriverError) {
        self.lock().fail_next_stop = Some(error);
    }

    /// Deliver `advertisement` to the running scan.
    ///
    /// Returns `false` if no scan is running.
    pub fn inject(&self, advertisement: Advertisement) -> bool {
        // Call the handler outside the lock; handlers may be slow.
        let handler = self.lock().handler.clone();
        match handler {
            Some(handler) => {
                handler.on_discovered(advertisement);
                true
            }
            None => false,
        }
    }

    /// Handler of the running scan, if any.
    #[must_use]
    pub fn active_handler(&self) -> Option<Arc<dyn DiscoveryHandler>> {
        self.lock().handler.clone()
    }

    /// Whether a scan is running.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.lock().handler.is_some()
    }

    /// Number of accepted start commands.
    #[must_use]
    pub fn start_calls(&self) -> usize {
        self.lock().start_calls
    }

    /// Number of accepted stop commands.
    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.lock().stop_calls
    }

    /// Request of the latest accepted start.
    #[must_use]
    pub fn last_request(&self) -> Option<ScanRequest> {
        self.lock().last_request.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RadioDriver for MockRadio {
    async fn start_scan(
        &self,
        request: &ScanRequest,
        handler: Arc<dyn DiscoveryHandler>,
    ) -> DriverResult<()> {
        let mut inner = self.lock();
        if let Some(err) = inner.fail_next_start.take() {
            return Err(err);
        }
        match inner.state {
            RadioState::On => {}
            RadioState::Off => return Err(DriverError::PoweredOff),
            RadioState::Unavailable => {
                return Err(DriverError::Unavailable {
                    reason: "mock adapter removed".into(),
                })
            }
        }

        inner.handler = Some(handler);
        inner.last_request = Some(request.clone());
        inner.start_calls += 1;
        debug!(starts = inner.start_calls, "mock scan started");
        Ok(())
    }

    async fn stop_scan(&self) -> DriverResult<()> {
        let mut inner = self.lock();
        if let Some(err) = inner.fail_next_stop.take() {
            inner.handler = None;
            return Err(err);
        }
        if inner.handler.take().is_none() {
            return Err(DriverError::NotScanning);
        }

        inner.stop_calls += 1;
        debug!(stops = inner.stop_calls, "mock scan stopped");
        Ok(())
    }

    async fn state(&self) -> RadioState {
        self.lock().state
    }

    fn supports_service_filter(&self) -> bool {
        self.lock().filters_supported
    }
}
