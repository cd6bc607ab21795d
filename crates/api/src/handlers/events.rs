//! Server-sent job event stream.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::state::AppState;

/// GET /api/v1/jobs/events
///
/// One SSE event per [`JobEvent`](printloop_events::JobEvent), named by
/// its event type, with the event as JSON data. Slow clients skip what
/// they missed.
pub async fn job_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|received| match received {
        Ok(event) => match Event::default().event(event.event_type.clone()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                tracing::warn!(job_id = %event.job_id, error = %e, "Could not encode job event");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "Event stream client lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
