//! Parkki server library logic.

pub mod api;
pub mod api_events;
pub mod api_sse;
pub mod api_ws;
pub mod broadcast;
pub mod config;
pub mod ingest;
pub mod startup;
pub mod subscribers;

pub use startup::{run, StartupError};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use broadcast::BroadcastHub;
use ingest::IngestionCoordinator;
use parkki_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use subscribers::SubscriberRegistry;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Fan-out of committed events to WebSocket and SSE subscribers.
    pub hub: BroadcastHub,
    /// Validate, persist, notify pipeline for incoming event batches.
    pub coordinator: IngestionCoordinator,
}

impl AppState {
    /// Wires the ingestion coordinator and broadcast hub around one pool.
    pub fn new(pool: DbPool, subscriber_buffer: usize) -> Self {
        let hub = BroadcastHub::new(SubscriberRegistry::new(), subscriber_buffer);
        let coordinator = IngestionCoordinator::new(pool.clone(), hub.clone());
        Self {
            pool,
            hub,
            coordinator,
        }
    }
}

/// Maximum request body size (1 MiB). A full batch of events fits comfortably.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Service banner listing the available routes.
async fn banner() -> Json<Value> {
    Json(json!({
        "message": "Parkki camera event service",
        "documentation": {
            "GET /cameras": "list registered cameras, newest first",
            "POST /cameras": "register a camera { id, name, status? }",
            "GET /cameras/{id}": "fetch one camera with its last event",
            "POST /cameras/{id}/events": "submit a batch { events: [{ type, timestamp, confidence }] }",
            "POST /cameras/{id}/event": "submit a single event { type, timestamp, confidence }",
            "GET /events": "list committed events (?camera_id=&limit=)",
            "GET /ws": "WebSocket stream of new events",
            "GET /events/stream": "Server-Sent Events stream of new events"
        }
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route(
            "/cameras",
            get(api::list_cameras_handler).post(api::create_camera_handler),
        )
        .route("/cameras/{id}", get(api::get_camera_handler))
        .route(
            "/cameras/{id}/events",
            post(api_events::submit_events_handler),
        )
        .route("/cameras/{id}/event", post(api_events::submit_event_handler))
        .route("/events", get(api_events::list_events_handler))
        .route("/events/stream", get(api_sse::event_stream_handler))
        .route("/ws", get(api_ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
