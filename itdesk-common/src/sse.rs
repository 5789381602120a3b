//! Server-Sent Events stream of desk events

use crate::db::models::Viewer;
use crate::events::DeskEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Comment line sent when the stream is otherwise idle
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// SSE frame for one event, `None` if it cannot be encoded
pub fn to_sse_event(event: &DeskEvent) -> Option<Event> {
    match Event::default().event(event.event_type()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!("Failed to encode {} for SSE: {}", event.event_type(), e);
            None
        }
    }
}

/// Events `viewer` may see, starting with a `ConnectionStatus` frame
///
/// Ends when the bus closes or `shutdown` changes.
pub fn desk_events(
    mut rx: broadcast::Receiver<DeskEvent>,
    viewer: Viewer,
    mut shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    info!("SSE client connected: user {}", viewer.id);

    async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        // A stream opened after shutdown began ends right away
        if !*shutdown.borrow_and_update() {
            loop {
                let received = tokio::select! {
                    _ = shutdown.changed() => None,
                    received = rx.recv() => Some(received),
                };
                let Some(received) = received else {
                    info!("Shutting down, ending SSE stream for {}", viewer.id);
                    break;
                };

                match received {
                    Ok(event) => {
                        if !event.is_visible_to(&viewer) {
                            continue;
                        }
                        debug!("SSE: {} -> {}", event.event_type(), viewer.id);
                        if let Some(sse) = to_sse_event(&event) {
                            yield Ok(sse);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("SSE client {} lagged, {} events skipped", viewer.id, skipped);
                    }
                    Err(RecvError::Closed) => {
                        info!("Event bus closed, ending SSE stream for {}", viewer.id);
                        break;
                    }
                }
            }
        }
    }
}

/// `desk_events` as an SSE response kept open with heartbeats
pub fn desk_event_stream(
    rx: broadcast::Receiver<DeskEvent>,
    viewer: Viewer,
    shutdown: watch::Receiver<bool>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(desk_events(rx, viewer, shutdown)).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Priority, Role};
    use crate::events::EventBus;
    use chrono::Utc;
    use futures::StreamExt;

    fn ticket_created(owner_id: &str) -> DeskEvent {
        DeskEvent::TicketCreated {
            ticket_id: "t1".to_string(),
            owner_id: owner_id.to_string(),
            title: "Printer jam".to_string(),
            priority: Priority::Low,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_stream_ends_on_shutdown() {
        let bus = EventBus::new(16);
        let (stop, shutdown) = watch::channel(false);
        let stream = desk_events(bus.subscribe(), Viewer::new("u1", Role::Admin), shutdown);
        futures::pin_mut!(stream);

        assert!(stream.next().await.is_some());

        bus.emit_lossy(ticket_created("u2"));
        assert!(stream.next().await.is_some());

        stop.send_replace(true);
        let ended = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should end after shutdown");
        assert!(ended.is_none());
    }

    #[tokio::test]
    async fn test_stream_opened_during_shutdown_ends_after_greeting() {
        let bus = EventBus::new(16);
        let (_stop, shutdown) = watch::channel(true);
        let stream = desk_events(bus.subscribe(), Viewer::new("u1", Role::EndUser), shutdown);
        futures::pin_mut!(stream);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_hidden_events_are_skipped() {
        let bus = EventBus::new(16);
        let (_stop, shutdown) = watch::channel(false);
        let stream = desk_events(bus.subscribe(), Viewer::new("u1", Role::EndUser), shutdown);
        futures::pin_mut!(stream);
        assert!(stream.next().await.is_some());

        bus.emit_lossy(ticket_created("someone-else"));
        let hidden = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(hidden.is_err());

        bus.emit_lossy(ticket_created("u1"));
        assert!(stream.next().await.is_some());
    }
}
