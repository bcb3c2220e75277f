//! Error types for the Canvas LMS client.

use thiserror::Error;

use crate::secrets::SecretError;

/// Errors that can occur while talking to Canvas on a user's behalf.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CanvasError {
    /// The user never stored a Canvas token
    #[error("Canvas token not set for this user")]
    MissingToken,

    /// The stored token could not be read back
    #[error("Stored Canvas token is unusable: {message}")]
    TokenUnavailable { message: String },

    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Canvas did not answer in time
    #[error("Canvas request timed out")]
    Timeout,

    /// Canvas answered with a non-success status
    #[error("Canvas returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Canvas answered with something that isn't the JSON we expected
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },

    /// Mirroring fetched data into the local store failed
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl CanvasError {
    /// Returns true if the user has to act (store a new token) before retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CanvasError::MissingToken | CanvasError::Status { status: 401 | 403, .. }
        )
    }

    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            CanvasError::Network { .. } | CanvasError::Timeout => true,
            CanvasError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CanvasError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CanvasError::Timeout
        } else if err.is_decode() {
            CanvasError::UnexpectedResponse {
                message: err.to_string(),
            }
        } else {
            CanvasError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for CanvasError {
    fn from(err: url::ParseError) -> Self {
        CanvasError::UrlError {
            message: err.to_string(),
        }
    }
}

impl From<SecretError> for CanvasError {
    fn from(err: SecretError) -> Self {
        CanvasError::TokenUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for CanvasError {
    fn from(err: rusqlite::Error) -> Self {
        CanvasError::Storage {
            message: err.to_string(),
        }
    }
}
