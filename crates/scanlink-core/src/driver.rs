//! Radio driver boundary.
//!
//! The controller never talks to Bluetooth hardware directly. It drives a
//! [`RadioDriver`], which reports every advertisement it sees to the
//! [`DiscoveryHandler`] handed over at scan start. Drivers may invoke the
//! handler from any number of tasks or threads at once.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{DeviceIdentity, RadioState, ScanRequest};

/// One advertisement as delivered by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Device the advertisement came from.
    pub identity: DeviceIdentity,
    /// Signal strength in dBm.
    pub rssi: i16,
    /// Raw advertisement payload.
    pub payload: Vec<u8>,
    /// Local name, when the radio could resolve one.
    pub local_name: Option<String>,
}

impl Advertisement {
    /// Build an advertisement without a local name.
    pub fn new(identity: impl Into<DeviceIdentity>, rssi: i16, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            identity: identity.into(),
            rssi,
            payload: payload.into(),
            local_name: None,
        }
    }

    /// Attach a local name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }
}

/// Receives advertisements from a running scan.
pub trait DiscoveryHandler: Send + Sync {
    /// Called once per advertisement. Must not block.
    fn on_discovered(&self, advertisement: Advertisement);
}

/// Errors reported by a radio driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No adapter, or the platform Bluetooth service is unreachable.
    #[error("Bluetooth adapter unavailable: {reason}")]
    Unavailable {
        /// Why the adapter could not be used.
        reason: String,
    },

    /// The adapter exists but is powered off.
    #[error("Bluetooth adapter is powered off")]
    PoweredOff,

    /// A stop was requested while no scan was running.
    #[error("No scan is running")]
    NotScanning,

    /// The radio rejected a command.
    #[error("{command} command failed: {message}")]
    CommandFailed {
        /// Command that failed (`start_scan`, `stop_scan`).
        command: &'static str,
        /// Driver-provided failure description.
        message: String,
    },
}

impl DriverError {
    /// Build a [`DriverError::CommandFailed`] for `command`.
    pub fn command_failed(command: &'static str, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command,
            message: message.into(),
        }
    }

    /// Whether the error only says the radio is already not scanning.
    ///
    /// Stopping a scan on a radio that is off, gone, or idle leaves it in the
    /// state the caller asked for.
    #[must_use]
    pub const fn leaves_radio_idle(&self) -> bool {
        matches!(
            self,
            Self::NotScanning | Self::PoweredOff | Self::Unavailable { .. }
        )
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Platform Bluetooth radio.
#[async_trait]
pub trait RadioDriver: Send + Sync {
    /// Start scanning and deliver every advertisement to `handler` until
    /// [`stop_scan`](Self::stop_scan) is called or another scan is started.
    async fn start_scan(
        &self,
        request: &ScanRequest,
        handler: Arc<dyn DiscoveryHandler>,
    ) -> DriverResult<()>;

    /// Stop the running scan.
    async fn stop_scan(&self) -> DriverResult<()>;

    /// Current adapter power state.
    async fn state(&self) -> RadioState;

    /// Whether the platform scan primitive can filter by service UUID.
    fn supports_service_filter(&self) -> bool;
}
