//! HTTP API tests against the in-memory radio.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use scanlink_core::{Advertisement, DriverError, MockRadio, RadioState, ScanlinkConfig};
use scanlink_server::api::create_router;
use scanlink_server::state::AppState;

fn server() -> (TestServer, Arc<MockRadio>) {
    let radio = Arc::new(MockRadio::new());
    let state = AppState::new(radio.clone(), ScanlinkConfig::default());
    let server = TestServer::new(create_router(state)).unwrap();
    (server, radio)
}

#[tokio::test]
async fn health_reports_radio_state() {
    let (server, radio) = server();
    radio.set_state(RadioState::Off);

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["radio_state"], "off");
}

#[tokio::test]
async fn start_status_stop_cycle() {
    let (server, radio) = server();

    let started = server
        .post("/api/scan/start")
        .json(&json!({ "seconds": 0, "allow_duplicates": true }))
        .await;
    started.assert_status_ok();
    let started: Value = started.json();
    assert_eq!(started["session_id"], 1);
    assert_eq!(started["timeout_secs"], 0);

    let request = radio.last_request().unwrap();
    assert!(request.allow_duplicates);
    assert_eq!(request.options.number_of_matches, 3);

    let status: Value = server.get("/api/scan/status").await.json();
    assert_eq!(status["scanning"], true);
    assert_eq!(status["radio_state"], "on");
    assert!(started["started_at_utc"].is_string());
    assert_eq!(started["started_at_utc"], status["started_at_utc"]);

    let stopped = server.post("/api/scan/stop").await;
    stopped.assert_status_ok();
    let stopped: Value = stopped.json();
    assert_eq!(stopped["session_id"], 2);

    let status: Value = server.get("/api/scan/status").await.json();
    assert_eq!(status["scanning"], false);
    assert!(!radio.is_scanning());
}

#[tokio::test]
async fn stop_without_scan_succeeds() {
    let (server, _radio) = server();
    server.post("/api/scan/stop").await.assert_status_ok();
}

#[tokio::test]
async fn start_with_radio_off_is_unavailable() {
    let (server, radio) = server();
    radio.set_state(RadioState::Off);

    let response = server.post("/api/scan/start").json(&json!({})).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"], "radio_unavailable");
}

#[tokio::test]
async fn rejected_stop_is_bad_gateway() {
    let (server, radio) = server();
    server
        .post("/api/scan/start")
        .json(&json!({ "seconds": 0 }))
        .await
        .assert_status_ok();

    radio.fail_next_stop(DriverError::command_failed("stop", "controller busy"));
    let response = server.post("/api/scan/stop").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn invalid_options_are_rejected() {
    let (server, radio) = server();

    let response = server
        .post("/api/scan/start")
        .json(&json!({ "options": { "number_of_matches": 0 } }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(radio.start_calls(), 0);
}

#[tokio::test]
async fn discovered_peripherals_can_be_listed_and_forgotten() {
    let (server, radio) = server();
    server
        .post("/api/scan/start")
        .json(&json!({ "seconds": 0 }))
        .await
        .assert_status_ok();

    assert!(radio.inject(Advertisement::new("AA:BB:CC:DD:EE:FF", -70, vec![0x02, 0x01, 0x06])));
    assert!(radio.inject(
        Advertisement::new("AA:BB:CC:DD:EE:FF", -48, vec![0x02, 0x01, 0x05]).with_name("Strap")
    ));
    assert!(radio.inject(Advertisement::new("11:22:33:44:55:66", -90, Vec::new())));

    let list: Value = server.get("/api/peripherals").await.json();
    assert_eq!(list["count"], 2);
    assert_eq!(list["peripherals"][0]["id"], "11:22:33:44:55:66");

    let one = server.get("/api/peripherals/AA:BB:CC:DD:EE:FF").await;
    one.assert_status_ok();
    let one: Value = one.json();
    assert_eq!(one["rssi"], -48);
    assert_eq!(one["name"], "Strap");
    assert_eq!(one["advertising"], json!([2, 1, 5]));
    assert_eq!(one["times_seen"], 2);

    server
        .delete("/api/peripherals/AA:BB:CC:DD:EE:FF")
        .await
        .assert_status_ok();
    server
        .get("/api/peripherals/AA:BB:CC:DD:EE:FF")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete("/api/peripherals/AA:BB:CC:DD:EE:FF")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_peripheral_is_not_found() {
    let (server, _radio) = server();

    let response = server.get("/api/peripherals/00:00:00:00:00:01").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "peripheral_not_found");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (server, _radio) = server();

    let response = server.get("/api/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["info"]["title"], "scanlink API");
    assert!(body["paths"]["/api/scan/start"].is_object());
}
