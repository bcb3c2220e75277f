//! Error types for bearer token verification.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// No `Authorization: Bearer ...` header on the request
    #[error("Missing bearer token")]
    MissingToken,

    /// The identity provider rejected the token
    #[error("Invalid token (identity provider returned {status})")]
    InvalidToken { status: u16 },

    /// The identity provider could not be reached or answered garbage
    #[error("Identity provider error: {message}")]
    Upstream { message: String },
}

impl AuthError {
    /// Returns true if the client must present different credentials.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AuthError::MissingToken | AuthError::InvalidToken { .. })
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Upstream {
            message: err.to_string(),
        }
    }
}
