//! Server-Sent Events notification stream

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Extension,
};
use futures::stream::Stream;
use itdesk_common::sse::desk_event_stream;
use std::convert::Infallible;

use crate::middleware::CurrentUser;
use crate::AppState;

/// GET /api/events
///
/// Desk events the caller may see, plus a heartbeat every 15 seconds.
/// The stream ends when the service starts shutting down.
pub async fn event_stream(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    desk_event_stream(
        state.event_bus.subscribe(),
        current.viewer(),
        state.shutdown.subscribe(),
    )
}
