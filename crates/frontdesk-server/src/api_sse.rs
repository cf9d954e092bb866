//! SSE conversation stream handler.

use crate::AppState;
use axum::{
    extract::Extension,
    response::{sse::Event, Sse},
};
use futures_util::Stream;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// Handler for `GET /events/conversation`.
///
/// Sends the current snapshot immediately, then a new one whenever the
/// transcript, the speaking/listening flags or the last error change.
pub async fn get_conversation_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.session.subscribe());

    let mapped_stream = stream.filter_map(|snapshot| match serde_json::to_string(&snapshot) {
        Ok(data) => Some(Ok(Event::default().event("snapshot").data(data))),
        Err(e) => {
            tracing::error!("failed to serialize conversation snapshot: {}", e);
            None
        }
    });

    Sse::new(mapped_stream).keep_alive(axum::response::sse::KeepAlive::default())
}
