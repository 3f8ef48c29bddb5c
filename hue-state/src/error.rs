//! Error types for hue-state

use crate::model::{LightId, RoomId, SceneId};

/// Result type for hue-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur while loading or driving the light model
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Error from the bridge API
    #[error("API error: {0}")]
    Api(#[from] hue_api::ApiError),

    /// Error from the event stream
    #[error("Stream error: {0}")]
    Stream(#[from] hue_stream::StreamError),

    #[error("Light not found: {0}")]
    LightNotFound(LightId),

    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Scene not found: {0}")]
    SceneNotFound(SceneId),

    /// The bridge call did not finish within the command timeout
    #[error("{0} timed out")]
    CommandTimeout(String),

    /// The reconciler has stopped and no longer accepts messages
    #[error("Reconciler is not running")]
    NotRunning,

    #[error("Reconciler inbox is full")]
    Busy,
}
