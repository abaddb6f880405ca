//! Server-Sent Events support

use crate::runtime::SseEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream.
///
/// Without a receiver the stream ends after the init event.
pub fn sse_stream(
    init_event: SseEvent,
    broadcast_rx: Option<broadcast::Receiver<SseEvent>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(sse_event_to_axum(init_event)) });

    let broadcast_rx = broadcast_rx.unwrap_or_else(|| broadcast::channel(1).0.subscribe());
    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(sse_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn event_payload(event: SseEvent) -> (&'static str, serde_json::Value) {
    match event {
        SseEvent::Init { session, awaiting } => (
            "init",
            json!({
                "type": "init",
                "session": session,
                "awaiting": awaiting
            }),
        ),
        SseEvent::Snapshot { state, sequence_id } => (
            "snapshot",
            json!({
                "type": "snapshot",
                "state": state,
                "sequence_id": sequence_id
            }),
        ),
        SseEvent::AwaitingInput { input } => (
            "awaiting_input",
            json!({
                "type": "awaiting_input",
                "input": input
            }),
        ),
        SseEvent::Completed { message } => (
            "completed",
            json!({
                "type": "completed",
                "message": message
            }),
        ),
        SseEvent::Halted { step, error } => (
            "halted",
            json!({
                "type": "halted",
                "step": step,
                "error": error
            }),
        ),
        SseEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}
