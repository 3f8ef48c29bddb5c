//! Error types for the hue-stream crate.

/// Errors that can occur while maintaining the event stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Could not reach the bridge or the connection dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// The bridge refused the stream request
    #[error("Event stream rejected (status {status})")]
    Rejected { status: u16 },

    /// A single SSE event grew past the configured limit
    #[error("Event exceeds {limit} bytes")]
    EventTooLarge { limit: usize },

    /// The bridge closed the stream cleanly
    #[error("Event stream ended")]
    Ended,

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Building the request failed
    #[error("API error: {0}")]
    Api(#[from] hue_api::ApiError),
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Connection(err.to_string())
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
