//! Server-sent event stream of scan events.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use scanlink_core::ScanEvent;

use crate::state::SharedState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Stream scan events.
///
/// The SSE `event` field carries the event name and `data` its JSON body.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    operation_id = "streamEvents",
    summary = "Stream scan events",
    description = "Server-sent events. `ScanlinkDiscoverPeripheral` carries a peripheral \
        record each time a device is created or updated. `ScanlinkStopScan` is sent \
        when a scan reaches its timeout. Slow clients skip events they fell behind on.",
    responses(
        (status = 200, description = "Event stream", body = String, content_type = "text/event-stream")
    )
)]
pub async fn stream_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();
    debug!(subscribers = state.events.subscriber_count(), "event stream opened");

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(sse) = to_sse(&event) {
                        return Some((Ok(sse), receiver));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn to_sse(event: &ScanEvent) -> Option<Event> {
    let payload = match event.payload() {
        Ok(payload) => payload,
        Err(e) => {
            warn!(event = event.name(), error = %e, "dropping unserializable event");
            return None;
        }
    };

    match Event::default().event(event.name()).json_data(payload) {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!(event = event.name(), error = %e, "dropping unserializable event");
            None
        }
    }
}
