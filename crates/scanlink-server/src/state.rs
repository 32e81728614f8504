//! Application state shared across handlers.

use std::sync::Arc;

use scanlink_core::{
    BroadcastSink, DiscoveryRegistry, EventSink, RadioDriver, ScanController, ScanlinkConfig,
};

/// State handle passed to every handler.
pub type SharedState = Arc<AppState>;

/// Shared application state.
///
/// Every member synchronizes internally, so handlers only need a shared
/// reference.
pub struct AppState {
    /// Scan session controller.
    pub controller: ScanController,
    /// Discovered peripherals.
    pub registry: Arc<DiscoveryRegistry>,
    /// Event channel that the SSE endpoint subscribes to.
    pub events: BroadcastSink,
    /// Loaded configuration.
    pub config: ScanlinkConfig,
}

impl AppState {
    /// Wire the controller, registry and event channel around `driver`.
    #[must_use]
    pub fn new(driver: Arc<dyn RadioDriver>, config: ScanlinkConfig) -> SharedState {
        let events = BroadcastSink::new(config.scan.event_buffer);
        let sink: Arc<dyn EventSink> = Arc::new(events.clone());
        let registry = Arc::new(DiscoveryRegistry::new(Arc::clone(&sink)));
        let controller = ScanController::new(driver, Arc::clone(&registry), sink);

        Arc::new(Self {
            controller,
            registry,
            events,
            config,
        })
    }
}
