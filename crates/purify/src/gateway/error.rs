//! Transport error types.

use thiserror::Error;

/// Failures normalised by the gateway. The controller only looks at the
/// operation that failed and the rendered message, never at these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never reached the server.
    #[error("Cannot connect to server. Please check if the backend is running.")]
    Unreachable,

    /// Connection dropped or other low-level failure.
    #[error("Network error: Please check your internet connection and try again.")]
    Network(String),

    /// The transport-level timeout elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server answered with a non-success status.
    #[error("{detail}")]
    Status { status: u16, detail: String },

    /// Response body did not match the expected shape.
    #[error("Invalid response from server: {0}")]
    Decode(String),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_connect() {
            GatewayError::Unreachable
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_build_failure_maps_to_network() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();

        let mapped = GatewayError::from(err);
        assert!(matches!(mapped, GatewayError::Network(_)), "{:?}", mapped);
        assert_eq!(
            mapped.to_string(),
            "Network error: Please check your internet connection and try again."
        );
    }

    #[test]
    fn test_status_error_renders_detail_only() {
        let err = GatewayError::Status {
            status: 404,
            detail: "File not found".to_string(),
        };
        assert_eq!(err.to_string(), "File not found");
    }
}
