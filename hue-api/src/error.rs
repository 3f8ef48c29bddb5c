use thiserror::Error;

/// Errors returned by bridge operations
///
/// These abstract over the HTTP transport so callers can tell a bridge that
/// is unreachable apart from one that answered with an error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// Connection refused, timeouts, TLS failures, DNS errors.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The bridge answered with a non-success status code
    #[error("API error (status {status}): {body}")]
    Http { status: u16, body: String },

    /// The bridge answered 2xx but reported errors in the response envelope
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// Response parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid bridge host or resource path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Pairing attempt made before the link button was pressed
    #[error("link button not pressed")]
    LinkButtonNotPressed,

    /// The link button was not pressed within the pairing window
    #[error("pairing timeout - link button was not pressed")]
    PairingTimeout,

    /// The referenced resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::ParseError(err.to_string())
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ApiError::Http {
            status: 403,
            body: "unauthorized user".to_string(),
        };
        assert_eq!(error.to_string(), "API error (status 403): unauthorized user");

        let error = ApiError::LinkButtonNotPressed;
        assert_eq!(error.to_string(), "link button not pressed");

        let error = ApiError::Bridge("device is unreachable".to_string());
        assert_eq!(error.to_string(), "Bridge error: device is unreachable");
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::ParseError(_)));
    }

    #[test]
    fn test_from_url_error() {
        let err = url::Url::parse("https://").unwrap_err();
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::InvalidUrl(_)));
    }
}
