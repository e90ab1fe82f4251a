//! API error mapping and camera registry handlers.

use crate::ingest::IngestError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parkki_events::{create_camera, get_camera, list_cameras, EventStoreError, NewCamera};
use parkki_types::{Camera, CameraStatus};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A payload failed validation. `index` points into the batch when the
    /// failure is tied to one event.
    #[error("invalid input: {message}")]
    Validation {
        message: String,
        field: String,
        index: Option<usize>,
    },
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage failures are reported generically; the cause is only logged.
    #[error("storage error")]
    Storage,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation {
                message,
                field,
                index,
            } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": message,
                    "field": field,
                    "index": index,
                }),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, serde_json::json!({ "error": msg })),
            ApiError::Storage => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "storage error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(v) => ApiError::Validation {
                message: v.to_string(),
                field: v.field,
                index: v.index,
            },
            IngestError::Storage(_) => ApiError::Storage,
        }
    }
}

impl From<EventStoreError> for ApiError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::CameraNotFound(id) => {
                ApiError::NotFound(format!("camera {} not found", id))
            }
            EventStoreError::CameraExists(id) => {
                ApiError::Conflict(format!("camera {} already exists", id))
            }
            other => {
                tracing::error!("camera store failure: {}", other);
                ApiError::Storage
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> Self {
        tracing::error!("db connection failed: {}", err);
        ApiError::Storage
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("blocking task failed: {}", err);
        ApiError::Storage
    }
}

/// Request body for `POST /cameras`.
#[derive(Debug, Deserialize)]
pub struct CreateCameraRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<CameraStatus>,
}

/// Handler for `GET /cameras`.
pub async fn list_cameras_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Camera>>, ApiError> {
    let cameras = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get()?;
        list_cameras(&conn).map_err(ApiError::from)
    })
    .await??;

    Ok(Json(cameras))
}

/// Handler for `POST /cameras`.
pub async fn create_camera_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<CreateCameraRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Camera>), ApiError> {
    let Json(payload) = payload?;
    let id = payload.id.trim().to_string();
    if id.is_empty() {
        return Err(ApiError::Validation {
            message: "invalid id: must not be empty".to_string(),
            field: "id".to_string(),
            index: None,
        });
    }
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation {
            message: "invalid name: must not be empty".to_string(),
            field: "name".to_string(),
            index: None,
        });
    }

    let new_camera = NewCamera {
        id,
        name,
        status: payload.status,
    };

    let camera = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get()?;
        create_camera(&conn, &new_camera).map_err(ApiError::from)
    })
    .await??;

    tracing::info!(camera_id = %camera.id, "camera registered");
    Ok((StatusCode::CREATED, Json(camera)))
}

/// Handler for `GET /cameras/{id}`.
pub async fn get_camera_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<Json<Camera>, ApiError> {
    let camera = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get()?;
        get_camera(&conn, &camera_id).map_err(ApiError::from)
    })
    .await??;

    Ok(Json(camera))
}
