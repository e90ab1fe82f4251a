//! WebSocket transport for live camera events.
//!
//! Clients connect to `GET /ws` and receive one text frame per committed
//! event. The stream is one-way: inbound frames other than `Close` are
//! ignored.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

/// Handler for `GET /ws`.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (subscriber_id, mut rx) = state.hub.subscribe().await;

    // Forward notifications to the socket until the hub drops us or the
    // client goes away.
    let mut send_task = tokio::spawn(async move {
        'forward: while let Some(batch) = rx.recv().await {
            for frame in batch.iter() {
                if sender.send(AxumMessage::Text(frame.clone().into())).await.is_err() {
                    break 'forward;
                }
            }
        }
        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(AxumMessage::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.on_subscriber_disconnect(subscriber_id).await;
}
