//! Event ingestion and query handlers.

use crate::api::ApiError;
use crate::ingest::IngestReceipt;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, Query},
    response::IntoResponse,
};
use parkki_types::{Event, EventInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Upper bound for the `limit` query parameter on `GET /events`.
const MAX_EVENTS_LIMIT: i64 = 1000;

/// Request body for `POST /cameras/{id}/events`.
#[derive(Debug, Deserialize)]
pub struct SubmitEventsRequest {
    pub events: Vec<EventInput>,
}

/// Response body for `POST /cameras/{id}/event`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitEventResponse {
    pub status: String,
    pub message: String,
    pub event_id: String,
}

/// Query parameters for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub camera_id: Option<String>,
    pub limit: Option<i64>,
}

/// Response body for `GET /events`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub count: usize,
}

/// Handler for `POST /cameras/{id}/events`.
///
/// Accepts a batch of events for one camera. The batch is validated as a
/// whole and persisted atomically; subscribers are notified after commit.
pub async fn submit_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(camera_id): Path<String>,
    payload: Result<Json<SubmitEventsRequest>, JsonRejection>,
) -> Result<Json<IngestReceipt>, ApiError> {
    let Json(body) = payload?;
    let receipt = state
        .coordinator
        .submit_events(&camera_id, body.events)
        .await?;
    Ok(Json(receipt))
}

/// Handler for `POST /cameras/{id}/event`.
///
/// Single-event form of [`submit_events_handler`].
pub async fn submit_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(camera_id): Path<String>,
    payload: Result<Json<EventInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let receipt = state
        .coordinator
        .submit_events(&camera_id, vec![input])
        .await?;

    let event_id = receipt.event_ids.into_iter().next().ok_or_else(|| {
        tracing::error!(camera_id = %camera_id, "accepted single event without an id");
        ApiError::Storage
    })?;

    Ok(Json(SubmitEventResponse {
        status: "success".to_string(),
        message: "event processed".to_string(),
        event_id,
    }))
}

/// Handler for `GET /events`.
///
/// Returns committed events, most recent first. `limit` is clamped to
/// `1..=1000`.
pub async fn list_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let limit = params.limit.map(|l| l.clamp(1, MAX_EVENTS_LIMIT));
    let camera_id = params.camera_id.filter(|id| !id.trim().is_empty());

    let events = state.coordinator.list_events(camera_id, limit).await?;
    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}
