//! Server-Sent Events endpoint

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::Stream;

use midroll_common::events::SessionEvent;
use midroll_common::{sse, time};

use super::AppState;

/// GET /api/v1/events
///
/// Streams the session event feed. Each new client first receives an
/// `InitialState` snapshot so it can render without waiting for the next
/// transition; the snapshot goes only to that client and is not appended
/// to the log.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = SessionEvent::InitialState {
        timestamp: time::now(),
        status: state.controller.status().await,
    };
    sse::session_event_stream(initial, state.log.subscribe())
}
