mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use parkki_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_and_banner() {
    let (_dir, state) = common::test_state(16);
    let app = app(state);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert!(body["documentation"]["POST /cameras/{id}/events"].is_string());
}

#[tokio::test]
async fn batch_for_unknown_camera_registers_it() {
    let (_dir, state) = common::test_state(16);
    let app = app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/cameras/cam1/events",
        Some(json!({
            "events": [{ "type": "motion", "timestamp": "2024-01-01T12:00:00Z", "confidence": 0.87 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["accepted_count"], 1);
    let ids = body["event_ids"].as_array().unwrap();
    assert_eq!(ids.len(), 1);

    let (status, camera) = send(&app, "GET", "/cameras/cam1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(camera["status"], "online");
    assert_eq!(camera["last_event"]["id"], ids[0]);
    assert!(camera["last_event"]["summary"]
        .as_str()
        .unwrap()
        .contains("87%"));
}

#[tokio::test]
async fn out_of_range_confidence_is_rejected() {
    let (_dir, state) = common::test_state(16);
    let (_, mut rx) = state.hub.subscribe().await;
    let app = app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/cameras/cam1/events",
        Some(json!({
            "events": [
                { "type": "motion", "timestamp": "2024-01-01T12:00:00Z", "confidence": 0.5 },
                { "type": "motion", "timestamp": "2024-01-01T12:00:01Z", "confidence": 1.5 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "confidence");
    assert_eq!(body["index"], 1);

    let (_, events) = send(&app, "GET", "/events", None).await;
    assert_eq!(events["count"], 0);
    let (status, _) = send(&app, "GET", "/cameras/cam1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(rx.try_recv().is_err(), "nothing is broadcast for a rejected batch");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (_dir, state) = common::test_state(16);
    let app = app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/cameras/cam1/events",
        Some(json!({ "events": "not-a-list" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/cameras/cam1/events",
        Some(json!({ "events": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "events");
    assert!(body["index"].is_null());
}

#[tokio::test]
async fn storage_fault_returns_generic_error() {
    let (_dir, state) = common::test_state(16);
    common::inject_fault_on_second_insert(&state.pool, "cam1");
    let app = app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/cameras/cam1/events",
        Some(json!({
            "events": [
                { "type": "motion", "timestamp": "2024-01-01T12:00:00Z", "confidence": 0.4 },
                { "type": "motion", "timestamp": "2024-01-01T12:00:01Z", "confidence": 0.6 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "storage error" }));

    let (_, events) = send(&app, "GET", "/events?camera_id=cam1", None).await;
    assert_eq!(events["count"], 0);
}

#[tokio::test]
async fn single_event_route() {
    let (_dir, state) = common::test_state(16);
    let app = app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/cameras/lot-a/event",
        Some(json!({ "type": "vehicle", "timestamp": "2024-01-01T08:30:00+02:00", "confidence": 0.42 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "event processed");

    let (_, events) = send(&app, "GET", "/events?camera_id=lot-a", None).await;
    assert_eq!(events["count"], 1);
    assert_eq!(events["events"][0]["id"], body["event_id"]);
    assert_eq!(events["events"][0]["type"], "vehicle");
    assert_eq!(events["events"][0]["timestamp"], "2024-01-01T08:30:00+02:00");

    let (status, body) = send(
        &app,
        "POST",
        "/cameras/lot-a/event",
        Some(json!({ "type": "vehicle", "timestamp": "yesterday", "confidence": 0.42 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "timestamp");
}

#[tokio::test]
async fn list_events_filters_and_limits() {
    let (_dir, state) = common::test_state(16);
    let app = app(state);

    for (camera, count) in [("cam1", 3), ("cam2", 2)] {
        let events: Vec<Value> = (0..count)
            .map(|i| json!({ "type": "motion", "timestamp": format!("2024-01-01T12:00:0{i}Z"), "confidence": 0.5 }))
            .collect();
        let (status, _) = send(
            &app,
            "POST",
            &format!("/cameras/{camera}/events"),
            Some(json!({ "events": events })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, all) = send(&app, "GET", "/events", None).await;
    assert_eq!(all["count"], 5);
    assert_eq!(all["events"][0]["camera_id"], "cam2");

    let (_, cam1) = send(&app, "GET", "/events?camera_id=cam1", None).await;
    assert_eq!(cam1["count"], 3);
    assert_eq!(cam1["events"][0]["timestamp"], "2024-01-01T12:00:02Z");

    let (_, limited) = send(&app, "GET", "/events?limit=2", None).await;
    assert_eq!(limited["count"], 2);

    let (_, clamped) = send(&app, "GET", "/events?limit=0", None).await;
    assert_eq!(clamped["count"], 1);
}

#[tokio::test]
async fn camera_registry_crud() {
    let (_dir, state) = common::test_state(16);
    let app = app(state);

    let (status, camera) = send(
        &app,
        "POST",
        "/cameras",
        Some(json!({ "id": "gate", "name": "Front Gate", "status": "offline" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(camera["name"], "Front Gate");
    assert_eq!(camera["status"], "offline");
    assert!(camera["last_event"].is_null());

    let (status, _) = send(
        &app,
        "POST",
        "/cameras",
        Some(json!({ "id": "gate", "name": "Duplicate" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "POST",
        "/cameras",
        Some(json!({ "id": "  ", "name": "Blank" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "id");

    let (status, _) = send(&app, "GET", "/cameras/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A body that does not decode gets the same JSON error shape as other routes.
    let (status, body) = send(
        &app,
        "POST",
        "/cameras",
        Some(json!({ "id": "lobby", "status": "sideways" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "body: {body}");

    // Ingesting for a known camera keeps its name and explicit status.
    let (status, _) = send(
        &app,
        "POST",
        "/cameras/gate/event",
        Some(json!({ "type": "person", "timestamp": "2024-01-01T12:00:00Z", "confidence": 0.9 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, cameras) = send(&app, "GET", "/cameras", None).await;
    assert_eq!(status, StatusCode::OK);
    let cameras = cameras.as_array().unwrap();
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0]["name"], "Front Gate");
    assert_eq!(cameras[0]["status"], "offline");
    assert_eq!(cameras[0]["last_event"]["type"], "person");
}
