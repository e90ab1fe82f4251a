//! Error types for the event store.

/// Errors that can occur during camera and event store operations.
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// A database operation failed.
    #[error("event store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A camera snapshot could not be serialised or deserialised.
    #[error("event store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No camera with the given identifier exists.
    #[error("camera not found: {0}")]
    CameraNotFound(String),

    /// A camera with the given identifier is already registered.
    #[error("camera already exists: {0}")]
    CameraExists(String),
}
