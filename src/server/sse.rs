//! Server-push heartbeat stream
//!
//! One event stream per connection: a `connected` event up front, then a
//! heartbeat every 30 seconds. The interval lives inside the stream, so
//! closing the connection drops the stream and its timer with it.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream};
use serde_json::json;
use tracing::debug;

use super::session::Session;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

enum StreamState {
    Connected,
    Beating(tokio::time::Interval),
}

fn timestamped_event(kind: &str) -> Result<Event, Infallible> {
    let payload = json!({
        "type": kind,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Event::default().data(payload.to_string()))
}

pub async fn mcp_sse(session: Session) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(
        "SSE stream opened for user {}",
        session.principal.username
    );

    let stream = stream::unfold(StreamState::Connected, |state| async move {
        match state {
            StreamState::Connected => {
                let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
                // The first tick fires immediately; consume it so heartbeats
                // start one full interval after the connected event.
                interval.tick().await;
                Some((
                    timestamped_event("connected"),
                    StreamState::Beating(interval),
                ))
            }
            StreamState::Beating(mut interval) => {
                interval.tick().await;
                Some((timestamped_event("heartbeat"), StreamState::Beating(interval)))
            }
        }
    });

    Sse::new(stream)
}
