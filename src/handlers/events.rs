use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use super::query_params;
use crate::errors::AppError;
use crate::state::AppState;

// GET /api/admin/events — SSE stream of booking changes
#[derive(Deserialize)]
pub struct EventsQuery {
    pub token: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let query = query_params(query)?;
    // EventSource cannot send headers, so the token comes in the query.
    let token = query.token.as_deref().unwrap_or("");
    if token.is_empty() || token != state.config.admin_token {
        return Err(AppError::Unauthorized);
    }

    let rx = state.events_tx.subscribe();

    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok::<_, Infallible>(
                Event::default().data(data).event("booking_event"),
            ))
        }
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            tracing::warn!(missed, "event stream subscriber lagged");
            None
        }
    });

    let keepalive_stream = StreamExt::map(
        IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok::<_, Infallible>(Event::default().comment("keepalive")),
    );

    Ok(Sse::new(StreamExt::merge(live_stream, keepalive_stream)))
}
