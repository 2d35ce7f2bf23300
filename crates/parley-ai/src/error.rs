//! Error types for parley-ai

use thiserror::Error;

/// Result type alias using parley-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a chat backend, either when opening a request or while
/// its response is being streamed
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Invalid or missing API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Whether the failure came from the remote service rather than local
    /// configuration. Picks the log level; nothing is retried.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Api { .. } | Error::Sse(_) | Error::UnexpectedResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let e = Error::api("overloaded_error", "Overloaded");
        assert_eq!(e.to_string(), "API error: Overloaded (type: overloaded_error)");
    }

    #[test]
    fn test_remote_classification() {
        assert!(Error::Sse("connection reset".into()).is_remote());
        assert!(Error::api("rate_limit_error", "slow down").is_remote());
        assert!(!Error::InvalidApiKey.is_remote());
    }
}
