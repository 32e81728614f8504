//! OpenAPI specification generation for the scanlink API.
//!
//! The generated document is served at `/api/openapi.json` and written to the
//! workspace root by the `gen-openapi` binary for client generation.

use axum::Json;
use utoipa::OpenApi;

use scanlink_core::{
    DeviceIdentity, MatchMode, PeripheralView, RadioState, ScanMode, ScanOptions, SessionId,
};

use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::peripherals::{ForgetPeripheralResponse, PeripheralsResponse};
use super::scan::{StartScanRequest, StartScanResponse, ScanStatusResponse, StopScanResponse};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed string.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for scanlink.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "scanlink API",
        version = "0.1.0",
        description = r#"
# scanlink API

scanlink runs timed Bluetooth LE scans and keeps one merged record per discovered peripheral.

## Overview

1. **Scan sessions**: Start a scan with an optional timeout. Every start or stop begins a new
   session, so a timeout armed by an older scan never stops a newer one.
2. **Peripherals**: Each advertisement is merged into the record for its device. The latest
   signal strength and payload win.
3. **Events**: `GET /api/events` streams `ScanlinkDiscoverPeripheral` on every merge and
   `ScanlinkStopScan` when a scan times out.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local scanlink server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks"
        ),
        (
            name = "scan",
            description = "Scan session control"
        ),
        (
            name = "peripherals",
            description = "Discovered peripheral records"
        ),
        (
            name = "events",
            description = "Server-sent scan events"
        )
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Scan endpoints
        super::scan::start_scan,
        super::scan::stop_scan,
        super::scan::scan_status,
        // Peripheral endpoints
        super::peripherals::list_peripherals,
        super::peripherals::get_peripheral,
        super::peripherals::forget_peripheral,
        // Event stream
        super::events::stream_events,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Scan types
            StartScanRequest,
            StartScanResponse,
            StopScanResponse,
            ScanStatusResponse,
            ScanOptions,
            MatchMode,
            ScanMode,
            RadioState,
            SessionId,
            // Peripheral types
            DeviceIdentity,
            PeripheralView,
            PeripheralsResponse,
            ForgetPeripheralResponse,
        )
    )
)]
pub struct ApiDoc;
