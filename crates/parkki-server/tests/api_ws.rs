mod common;

use futures_util::{SinkExt, StreamExt};
use parkki_server::{app, AppState};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

async fn serve(state: AppState) -> std::net::SocketAddr {
    let app = app(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn wait_for_subscribers(state: &AppState, expected: usize) {
    for _ in 0..100 {
        if state.hub.registry().len().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {expected} subscribers");
}

#[tokio::test]
async fn ws_receives_committed_events() {
    let (_dir, state) = common::test_state(16);
    let addr = serve(state.clone()).await;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("failed to connect");
    wait_for_subscribers(&state, 1).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/cameras/cam1/events", addr))
        .header("content-type", "application/json")
        .body(
            r#"{"events":[
                {"type":"motion","timestamp":"2024-01-01T12:00:00Z","confidence":0.87},
                {"type":"person","timestamp":"2024-01-01T12:00:01Z","confidence":0.65}
            ]}"#,
        )
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let receipt: Value = serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();

    for (i, expected_type) in ["motion", "person"].into_iter().enumerate() {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for notification")
            .expect("stream ended")
            .expect("websocket error");
        let Message::Text(text) = msg else {
            panic!("expected text frame, got {msg:?}");
        };
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["camera_id"], "cam1");
        assert_eq!(json["event_type"], expected_type);
        assert_eq!(json["event_id"], receipt["event_ids"][i]);
        assert!(json["confidence"].is_f64());
    }

    ws.close(None).await.unwrap();
    wait_for_subscribers(&state, 0).await;
}

#[tokio::test]
async fn ws_close_unregisters_only_that_subscriber() {
    let (_dir, state) = common::test_state(16);
    let addr = serve(state.clone()).await;

    let (mut first, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let (mut second, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    wait_for_subscribers(&state, 2).await;

    first.send(Message::Close(None)).await.unwrap();
    wait_for_subscribers(&state, 1).await;

    state
        .coordinator
        .submit_events(
            "cam1",
            vec![common::event_input("vehicle", "2024-01-01T12:00:00Z", 0.9)],
        )
        .await
        .unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(2), second.next())
        .await
        .expect("timed out waiting for notification")
        .unwrap()
        .unwrap();
    assert!(msg.to_text().unwrap().contains("vehicle"));
}
