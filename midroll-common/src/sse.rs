//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE stream construction for the session daemon's `/events`
//! endpoint: each client gets a one-off initial snapshot followed by every
//! event broadcast after its subscription.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::SessionEvent;

/// Build an SSE response from an initial snapshot plus a live subscription.
///
/// The snapshot goes only to this client; it is not appended to the event
/// log. Lagged subscribers skip the missed events and keep receiving; the
/// stream ends when the broadcast channel closes (session teardown).
pub fn session_event_stream(
    initial: SessionEvent,
    mut rx: broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        debug!("SSE: session event stream started");

        if let Some(event) = to_sse_event(&initial) {
            yield Ok(event);
        }

        loop {
            match rx.recv().await {
                Ok(session_event) => {
                    if let Some(event) = to_sse_event(&session_event) {
                        yield Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("SSE: event channel closed, ending stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Serialize a session event into an SSE frame, or None if serialization
/// fails (logged, never fatal to the stream).
fn to_sse_event(event: &SessionEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(
            Event::default()
                .event(event.event_type().to_string())
                .data(json),
        ),
        Err(e) => {
            warn!("Failed to serialize event for SSE: {}", e);
            None
        }
    }
}
