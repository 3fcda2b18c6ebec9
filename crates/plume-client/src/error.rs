//! Error types for plume-client

use thiserror::Error;

/// Result type alias using plume-client Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the inference service
#[derive(Error, Debug)]
pub enum Error {
    /// The request could not be sent, or reading the body failed mid-stream
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The endpoint this error is about, when it concerns a request
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Error::Transport { url, .. } | Error::Status { url, .. } => Some(url),
            Error::Json(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_names_endpoint() {
        let e = Error::Status {
            url: "http://localhost:8111/api/chat".to_string(),
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        assert_eq!(e.endpoint(), Some("http://localhost:8111/api/chat"));
        let text = e.to_string();
        assert!(text.contains("/api/chat"));
        assert!(text.contains("502"));
    }

    #[test]
    fn test_json_error_has_no_endpoint() {
        let e: Error = serde_json::from_str::<serde_json::Value>("not json")
            .unwrap_err()
            .into();
        assert_eq!(e.endpoint(), None);
    }
}
