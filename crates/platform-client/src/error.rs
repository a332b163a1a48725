//! Error types for the platform and catalog HTTP clients.

use adsync_core::{ClientError, ClientErrorKind};
use thiserror::Error;

/// Result type alias for HTTP client operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Errors that can occur while talking to the target platform or the catalog.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the remote service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication error (missing or invalid token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl PlatformError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}

impl From<PlatformError> for ClientError {
    fn from(err: PlatformError) -> Self {
        let kind = match &err {
            PlatformError::Api { status, .. } => match *status {
                401 => ClientErrorKind::Unauthorized,
                403 => ClientErrorKind::PermissionDenied,
                404 => ClientErrorKind::NotFound,
                429 => ClientErrorKind::RateLimited,
                _ => ClientErrorKind::Api,
            },
            PlatformError::Http(e) if e.is_decode() => ClientErrorKind::Decode,
            PlatformError::Http(_) => ClientErrorKind::Transport,
            PlatformError::Json(_) => ClientErrorKind::Decode,
            PlatformError::InvalidRequest(_) => ClientErrorKind::Api,
            PlatformError::Auth(_) => ClientErrorKind::Unauthorized,
        };
        ClientError::new(kind, err.to_string())
    }
}
