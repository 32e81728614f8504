//! Discovered peripheral API endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use scanlink_core::{DeviceIdentity, PeripheralView, ScanlinkError};

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Discovered peripherals response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PeripheralsResponse {
    /// Every peripheral seen since start-up or since it was last forgotten,
    /// ordered by identity.
    pub peripherals: Vec<PeripheralView>,

    /// Number of peripherals.
    #[schema(example = 1)]
    pub count: usize,
}

/// Forget response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForgetPeripheralResponse {
    /// Identity that was removed.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub id: String,

    /// Always `true`; unknown identities return 404.
    pub removed: bool,
}

/// Creates the peripherals router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_peripherals))
        .route("/{id}", get(get_peripheral).delete(forget_peripheral))
}

/// List discovered peripherals.
#[utoipa::path(
    get,
    path = "/api/peripherals",
    tag = "peripherals",
    operation_id = "listPeripherals",
    summary = "List discovered peripherals",
    description = "Returns one merged record per device seen while scanning, \
        with the latest signal strength and advertisement payload.",
    responses(
        (status = 200, description = "Discovered peripherals", body = PeripheralsResponse)
    )
)]
pub async fn list_peripherals(State(state): State<SharedState>) -> Json<PeripheralsResponse> {
    let peripherals = state.registry.discovered();

    Json(PeripheralsResponse {
        count: peripherals.len(),
        peripherals,
    })
}

/// Get one peripheral.
#[utoipa::path(
    get,
    path = "/api/peripherals/{id}",
    tag = "peripherals",
    operation_id = "getPeripheral",
    summary = "Get a discovered peripheral",
    params(
        ("id" = String, Path, description = "Device identity, usually a MAC address")
    ),
    responses(
        (status = 200, description = "Peripheral record", body = PeripheralView),
        (status = 404, description = "Peripheral not discovered", body = super::error::ErrorResponse)
    )
)]
pub async fn get_peripheral(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PeripheralView>> {
    let identity = DeviceIdentity::new(id);
    let view = state
        .registry
        .get(&identity)
        .ok_or_else(|| ScanlinkError::PeripheralNotFound(identity.to_string()))?;

    Ok(Json(view))
}

/// Forget a peripheral.
///
/// The next advertisement from the device creates a fresh record.
#[utoipa::path(
    delete,
    path = "/api/peripherals/{id}",
    tag = "peripherals",
    operation_id = "forgetPeripheral",
    summary = "Forget a discovered peripheral",
    params(
        ("id" = String, Path, description = "Device identity, usually a MAC address")
    ),
    responses(
        (status = 200, description = "Peripheral removed", body = ForgetPeripheralResponse),
        (status = 404, description = "Peripheral not discovered", body = super::error::ErrorResponse)
    )
)]
pub async fn forget_peripheral(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ForgetPeripheralResponse>> {
    let identity = DeviceIdentity::new(id);
    if !state.registry.forget(&identity) {
        return Err(ScanlinkError::PeripheralNotFound(identity.to_string()).into());
    }

    Ok(Json(ForgetPeripheralResponse {
        id: identity.to_string(),
        removed: true,
    }))
}
