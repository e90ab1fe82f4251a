//! SSE stream of committed camera events.

use crate::AppState;
use axum::{
    extract::Extension,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use futures_util::{stream, Stream, StreamExt};
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::ReceiverStream;

/// Unregisters the subscriber when the SSE response body is dropped.
struct SubscriptionGuard {
    state: Arc<AppState>,
    id: crate::subscribers::SubscriberId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = self.state.clone();
        let id = self.id;
        handle.spawn(async move {
            state.hub.on_subscriber_disconnect(id).await;
        });
    }
}

/// Handler for `GET /events/stream`.
///
/// Streams one `data:` frame per committed event, in commit order. A client
/// that falls too far behind is dropped by the hub and its stream ends.
pub async fn event_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.hub.subscribe().await;
    let guard = SubscriptionGuard {
        state: state.clone(),
        id,
    };

    let events = ReceiverStream::new(rx)
        .map(move |batch| {
            let _keep = &guard;
            let frames: Vec<Result<Event, Infallible>> = batch
                .iter()
                .map(|frame| Ok(Event::default().data(frame.as_str())))
                .collect();
            stream::iter(frames)
        })
        .flatten();

    Sse::new(events).keep_alive(KeepAlive::default())
}
