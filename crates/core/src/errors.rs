//! Error types for the reconciliation core.

use thiserror::Error;

use crate::wire::TranslateError;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of a collaborator (source or target) failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// The session or token is no longer accepted.
    Unauthorized,
    /// The account is not allowed to perform the operation.
    PermissionDenied,
    NotFound,
    RateLimited,
    /// Network-level failure before a response was received.
    Transport,
    /// Any other non-success response.
    Api,
    /// A response arrived but could not be decoded.
    Decode,
}

/// Error surfaced by the `SourceClient` and `TargetClient` collaborators.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::PermissionDenied, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Unauthorized, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Api, message)
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind == ClientErrorKind::PermissionDenied
    }
}

/// Errors that can occur while reconciling inventory.
#[derive(Debug, Error)]
pub enum Error {
    /// Wire object could not be translated
    #[error("Wire translation error: {0}")]
    Translate(#[from] TranslateError),

    /// Remote collaborator failed
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Desired-state construction failed
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run reached a state it cannot continue from
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// The underlying client error, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Translate(TranslateError::Shape(err.to_string()))
    }
}
