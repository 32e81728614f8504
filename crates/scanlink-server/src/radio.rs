//! Radio driver selection.
//!
//! With the `bluetooth` feature the server requires a working BlueZ adapter
//! and refuses to start without one. The in-memory radio is used only when
//! built with `mock-bluetooth` or without `bluetooth`.

use std::sync::Arc;

use anyhow::Context;
use scanlink_core::{DriverResult, RadioDriver};

/// Connect the radio this build is configured for.
///
/// # Errors
///
/// Returns an error if the Bluetooth adapter is absent or `bluetoothd`
/// cannot be reached.
#[cfg(all(feature = "bluetooth", not(feature = "mock-bluetooth")))]
pub async fn connect() -> anyhow::Result<Arc<dyn RadioDriver>> {
    let driver = require(scanlink_core::BluezDriver::new().await)?;
    tracing::info!("using BlueZ radio");
    Ok(driver)
}

/// Connect the radio this build is configured for.
///
/// # Errors
///
/// Never fails; the in-memory radio is always available.
#[cfg(any(feature = "mock-bluetooth", not(feature = "bluetooth")))]
pub async fn connect() -> anyhow::Result<Arc<dyn RadioDriver>> {
    tracing::warn!("built without BlueZ support, using in-memory radio");
    require(Ok(scanlink_core::MockRadio::new()))
}

/// Turn a driver connection attempt into a shared driver or a start-up error.
///
/// # Errors
///
/// Returns the driver error with start-up context attached.
pub fn require<D>(connected: DriverResult<D>) -> anyhow::Result<Arc<dyn RadioDriver>>
where
    D: RadioDriver + 'static,
{
    let driver = connected.context("Bluetooth adapter unavailable")?;
    Ok(Arc::new(driver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlink_core::{DriverError, MockRadio, RadioState};

    #[tokio::test]
    async fn test_connected_driver_is_used() {
        let driver = require(Ok(MockRadio::new())).unwrap();
        assert_eq!(driver.state().await, RadioState::On);
    }

    #[test]
    fn test_unavailable_adapter_fails_startup() {
        let err = require::<MockRadio>(Err(DriverError::Unavailable {
            reason: "no default adapter".into(),
        }))
        .err()
        .unwrap();

        let message = format!("{err:#}");
        assert!(message.contains("Bluetooth adapter unavailable"));
        assert!(message.contains("no default adapter"));
    }

    #[cfg(any(feature = "mock-bluetooth", not(feature = "bluetooth")))]
    #[tokio::test]
    async fn test_mock_build_uses_in_memory_radio() {
        let driver = connect().await.unwrap();
        assert_eq!(driver.state().await, RadioState::On);
    }
}
