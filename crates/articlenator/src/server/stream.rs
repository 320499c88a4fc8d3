//! Server-sent event responses fed from a channel.

use axum::response::sse::{Event, Sse};
use futures::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::events::ProgressEvent;

/// Longest silence tolerated from a background task before giving up.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Capacity of the channel between a background task and its stream.
pub const CHANNEL_CAPACITY: usize = 64;

/// Stream events from `rx` until a terminal event, the sender closing, or
/// `idle` passing with no event (which emits `Scrape timed out`).
pub fn event_stream(
    rx: mpsc::Receiver<ProgressEvent>,
    idle: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(progress_events(rx, idle))
}

fn progress_events(
    rx: mpsc::Receiver<ProgressEvent>,
    idle: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold((rx, false), move |(mut rx, finished)| async move {
        if finished {
            return None;
        }
        let event = match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => return None,
            Err(_) => {
                tracing::warn!(idle_secs = idle.as_secs(), "Background task went quiet");
                ProgressEvent::error("Scrape timed out")
            }
        };
        let terminal = event.is_terminal();
        Some((Ok(to_sse(&event)), (rx, terminal)))
    })
}

fn to_sse(event: &ProgressEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize progress event");
            Event::default().data(r#"{"type":"error","error":"Internal error"}"#)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stops_after_terminal_event() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ProgressEvent::Start { total: Some(1) }).await.unwrap();
        tx.send(ProgressEvent::error("boom")).await.unwrap();
        tx.send(ProgressEvent::GeneratingPdf).await.unwrap();

        let events: Vec<_> = progress_events(rx, Duration::from_secs(1)).collect().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_stops_when_sender_dropped() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ProgressEvent::GeneratingPdf).await.unwrap();
        drop(tx);

        let events: Vec<_> = progress_events(rx, Duration::from_secs(1)).collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_ends_stream() {
        let (tx, rx) = mpsc::channel::<ProgressEvent>(8);
        let events: Vec<_> = progress_events(rx, Duration::from_secs(300)).collect().await;
        assert_eq!(events.len(), 1);
        drop(tx);
    }
}
