//! Scan session API endpoints.
//!
//! Starting a scan returns immediately; discoveries and the timeout stop are
//! delivered through the event stream.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use scanlink_core::{RadioState, ScanOptions, ScanRequest, SessionId};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Scan start request. Unset fields use the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
#[schema(example = json!({
    "service_uuids": ["0000180d-0000-1000-8000-00805f9b34fb"],
    "seconds": 5,
    "allow_duplicates": false
}))]
pub struct StartScanRequest {
    /// Only report peripherals advertising one of these services.
    pub service_uuids: Option<Vec<Uuid>>,

    /// Stop automatically after this many seconds; 0 scans until stopped.
    #[schema(example = 5)]
    pub seconds: Option<u32>,

    /// Report repeated advertisements from the same device.
    pub allow_duplicates: Option<bool>,

    /// Platform tuning knobs.
    pub options: Option<ScanOptions>,
}

/// Scan start response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "session_id": 4,
    "timeout_secs": 5,
    "started_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct StartScanResponse {
    /// Session the new scan runs under.
    pub session_id: SessionId,

    /// Timeout that was applied (0 = none).
    #[schema(example = 5)]
    pub timeout_secs: u32,

    /// When the scan was started, as reported by the scan status. Null if
    /// the scan already ended before the response was built.
    pub started_at_utc: Option<DateTime<Utc>>,
}

/// Scan stop response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StopScanResponse {
    /// Session current after the stop; any pending timeout is void.
    pub session_id: SessionId,
}

/// Scan status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "scanning": true,
    "session_id": 4,
    "started_at_utc": "2025-01-15T03:30:00Z",
    "timeout_secs": 5,
    "radio_state": "on",
    "peripheral_count": 2
}))]
pub struct ScanStatusResponse {
    /// Whether a scan is running.
    pub scanning: bool,

    /// Latest session identifier.
    pub session_id: SessionId,

    /// When the running scan started.
    pub started_at_utc: Option<DateTime<Utc>>,

    /// Timeout of the running scan.
    pub timeout_secs: Option<u32>,

    /// Radio power state.
    pub radio_state: RadioState,

    /// Number of peripherals discovered so far.
    pub peripheral_count: usize,
}

// ============================================================================
// Router
// ============================================================================

/// Creates the scan router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/start", post(start_scan))
        .route("/stop", post(stop_scan))
        .route("/status", get(scan_status))
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a scan session.
///
/// Any running scan is restarted under a new session and its pending timeout
/// no longer applies.
#[utoipa::path(
    post,
    path = "/api/scan/start",
    tag = "scan",
    operation_id = "startScan",
    summary = "Start a Bluetooth LE scan",
    description = "Starts scanning for peripherals. With a positive `seconds` the scan \
        stops on its own and a `ScanlinkStopScan` event is sent; a later start or stop \
        cancels that timeout.",
    request_body = StartScanRequest,
    responses(
        (status = 200, description = "Scan started", body = StartScanResponse),
        (status = 400, description = "Invalid scan options", body = super::error::ErrorResponse),
        (status = 502, description = "Radio rejected the command", body = super::error::ErrorResponse),
        (status = 503, description = "Radio unavailable", body = super::error::ErrorResponse)
    )
)]
pub async fn start_scan(
    State(state): State<SharedState>,
    Json(body): Json<StartScanRequest>,
) -> ApiResult<Json<StartScanResponse>> {
    let request = build_request(&state, body)?;
    let timeout_secs = request.timeout_secs;

    let session_id = state.controller.start_scan(request).await?;
    info!(session = %session_id, timeout_secs, "scan started via API");

    Ok(Json(StartScanResponse {
        session_id,
        timeout_secs,
        started_at_utc: state.controller.started_at(session_id).await,
    }))
}

/// Stop the running scan.
#[utoipa::path(
    post,
    path = "/api/scan/stop",
    tag = "scan",
    operation_id = "stopScan",
    summary = "Stop scanning",
    description = "Stops scanning and voids any pending timeout. Stopping when no scan \
        is running succeeds. No `ScanlinkStopScan` event is sent for explicit stops.",
    responses(
        (status = 200, description = "Scan stopped", body = StopScanResponse),
        (status = 502, description = "Radio rejected the command", body = super::error::ErrorResponse)
    )
)]
pub async fn stop_scan(State(state): State<SharedState>) -> ApiResult<Json<StopScanResponse>> {
    state.controller.stop_scan().await?;

    Ok(Json(StopScanResponse {
        session_id: state.controller.current_session(),
    }))
}

/// Report scan and radio state.
#[utoipa::path(
    get,
    path = "/api/scan/status",
    tag = "scan",
    operation_id = "getScanStatus",
    summary = "Get scan status",
    description = "Returns whether a scan is running, the latest session, and the radio state.",
    responses(
        (status = 200, description = "Current scan status", body = ScanStatusResponse)
    )
)]
pub async fn scan_status(State(state): State<SharedState>) -> Json<ScanStatusResponse> {
    let status = state.controller.status().await;
    let radio_state = state.controller.radio_state().await;

    Json(ScanStatusResponse {
        scanning: status.scanning,
        session_id: status.session_id,
        started_at_utc: status.started_at_utc,
        timeout_secs: status.timeout_secs,
        radio_state,
        peripheral_count: state.registry.len(),
    })
}

/// Fill unset request fields from the configured defaults.
fn build_request(state: &SharedState, body: StartScanRequest) -> ApiResult<ScanRequest> {
    let defaults = &state.config.scan;
    let options = body.options.unwrap_or_else(|| defaults.options());

    if !(1..=3).contains(&options.number_of_matches) {
        return Err(ApiError::BadRequest {
            error_code: "invalid_number_of_matches".to_string(),
            message: format!(
                "number_of_matches must be between 1 and 3, got {}",
                options.number_of_matches
            ),
        });
    }

    Ok(ScanRequest {
        service_uuids: body.service_uuids.unwrap_or_default(),
        timeout_secs: body.seconds.unwrap_or(defaults.timeout_secs),
        allow_duplicates: body.allow_duplicates.unwrap_or(defaults.allow_duplicates),
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use scanlink_core::{MockRadio, ScanlinkConfig};

    use crate::state::AppState;

    fn state() -> SharedState {
        AppState::new(Arc::new(MockRadio::new()), ScanlinkConfig::default())
    }

    #[test]
    fn test_empty_body_uses_config_defaults() {
        let request = build_request(&state(), StartScanRequest::default()).unwrap();
        assert_eq!(request.timeout_secs, 10);
        assert!(!request.allow_duplicates);
        assert!(request.service_uuids.is_empty());
        assert_eq!(request.options, ScanOptions::default());
    }

    #[test]
    fn test_body_overrides_defaults() {
        let body = StartScanRequest {
            seconds: Some(0),
            allow_duplicates: Some(true),
            ..Default::default()
        };
        let request = build_request(&state(), body).unwrap();
        assert_eq!(request.timeout_secs, 0);
        assert!(request.allow_duplicates);
    }

    #[test]
    fn test_invalid_number_of_matches_is_rejected() {
        let body = StartScanRequest {
            options: Some(ScanOptions {
                number_of_matches: 7,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            build_request(&state(), body),
            Err(ApiError::BadRequest { .. })
        ));
    }

    #[test]
    fn test_start_request_deserializes_partial_body() {
        let body: StartScanRequest = serde_json::from_str(r#"{"seconds": 3}"#).unwrap();
        assert_eq!(body.seconds, Some(3));
        assert!(body.service_uuids.is_none());
    }
}
