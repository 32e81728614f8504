//! Error types for the scanlink core library.
//!
//! Scan operations report [`ScanError`], which only distinguishes an
//! unusable radio from a rejected command. Starting a scan that is already
//! running or stopping one that is not are never errors.
//!
//! [`ScanlinkError`] unifies scan and registry failures for callers that
//! surface them over HTTP. Configuration failures stay in
//! [`ConfigError`](crate::config::ConfigError); they only happen at start-up.
//!
//! # Example
//!
//! ```rust
//! use scanlink_core::error::{Result, ScanlinkError};
//! use scanlink_core::DeviceIdentity;
//!
//! fn require_known(known: bool, id: &DeviceIdentity) -> Result<()> {
//!     if !known {
//!         return Err(ScanlinkError::PeripheralNotFound(id.to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::driver::DriverError;

/// Failure of a scan start or stop.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The adapter is powered off or absent.
    #[error("Bluetooth radio unavailable: {0}")]
    DriverUnavailable(String),

    /// The radio rejected a start or stop command.
    #[error("Bluetooth radio rejected command: {0}")]
    DriverCommandFailed(String),
}

impl From<DriverError> for ScanError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Unavailable { .. } | DriverError::PoweredOff => {
                Self::DriverUnavailable(err.to_string())
            }
            DriverError::NotScanning | DriverError::CommandFailed { .. } => {
                Self::DriverCommandFailed(err.to_string())
            }
        }
    }
}

/// The unified error type for all scanlink operations.
#[derive(Debug, Error)]
pub enum ScanlinkError {
    // =========================================================================
    // RADIO ERRORS
    // =========================================================================
    /// The radio is powered off or absent.
    #[error("Bluetooth radio unavailable: {0}. Ensure the adapter is present and powered on.")]
    RadioUnavailable(String),

    /// The radio rejected a scan command.
    #[error("Bluetooth scan command failed: {0}")]
    ScanCommandFailed(String),

    // =========================================================================
    // REGISTRY ERRORS
    // =========================================================================
    /// No peripheral with this identity has been discovered.
    #[error("Peripheral not found: '{0}'. Start a scan and make sure the device is advertising.")]
    PeripheralNotFound(String),
}

/// A specialized [`Result`] type for scanlink operations.
pub type Result<T> = std::result::Result<T, ScanlinkError>;

impl ScanlinkError {
    /// Returns `true` if this error comes from the radio.
    #[inline]
    #[must_use]
    pub const fn is_radio_error(&self) -> bool {
        matches!(self, Self::RadioUnavailable(_) | Self::ScanCommandFailed(_))
    }

    /// Returns `true` if this error is related to discovered peripherals.
    #[inline]
    #[must_use]
    pub const fn is_registry_error(&self) -> bool {
        matches!(self, Self::PeripheralNotFound(_))
    }

    /// Returns `true` if retrying later may succeed without user intervention.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ScanCommandFailed(_) | Self::PeripheralNotFound(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::PeripheralNotFound(_) => 404,
            Self::ScanCommandFailed(_) => 502,
            Self::RadioUnavailable(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RadioUnavailable(_) => "RADIO_UNAVAILABLE",
            Self::ScanCommandFailed(_) => "SCAN_COMMAND_FAILED",
            Self::PeripheralNotFound(_) => "PERIPHERAL_NOT_FOUND",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<ScanError> for ScanlinkError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::DriverUnavailable(message) => Self::RadioUnavailable(message),
            ScanError::DriverCommandFailed(message) => Self::ScanCommandFailed(message),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_mapping() {
        assert!(matches!(
            ScanError::from(DriverError::PoweredOff),
            ScanError::DriverUnavailable(_)
        ));
        assert!(matches!(
            ScanError::from(DriverError::Unavailable {
                reason: "no adapter".into()
            }),
            ScanError::DriverUnavailable(_)
        ));
        assert!(matches!(
            ScanError::from(DriverError::command_failed("start_scan", "busy")),
            ScanError::DriverCommandFailed(_)
        ));
    }

    #[test]
    fn test_radio_error_classification() {
        let err = ScanlinkError::from(ScanError::DriverUnavailable("off".into()));
        assert!(err.is_radio_error());
        assert!(!err.is_recoverable());
        assert_eq!(err.http_status_code(), 503);

        let err = ScanlinkError::from(ScanError::DriverCommandFailed("busy".into()));
        assert!(err.is_radio_error());
        assert!(err.is_recoverable());
        assert_eq!(err.error_code(), "SCAN_COMMAND_FAILED");
    }

    #[test]
    fn test_registry_error_classification() {
        let err = ScanlinkError::PeripheralNotFound("AA:BB".into());
        assert!(err.is_registry_error());
        assert!(!err.is_radio_error());
        assert_eq!(err.http_status_code(), 404);
        assert!(err.to_string().contains("AA:BB"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ScanlinkError>();
        assert_sync::<ScanlinkError>();
        assert_send::<ScanError>();
        assert_sync::<ScanError>();
    }
}
