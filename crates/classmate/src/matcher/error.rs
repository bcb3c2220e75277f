//! Error types for the classmate matcher.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur while recording a timetable or matching classmates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// A claim was malformed or referenced a course the user does not have
    #[error("Invalid claim #{index}: {message}")]
    Validation { index: usize, message: String },

    /// The batch contained no claims at all
    #[error("No slot claims were submitted")]
    EmptyBatch,

    /// The requesting user has no recorded timetable to match against
    #[error("User {user_id} has no recorded timetable")]
    NoTimetable { user_id: String },

    /// The repository did not answer within its busy timeout
    #[error("Timetable store timed out: {message}")]
    Timeout { message: String },

    /// The repository failed
    #[error("Timetable store error: {message}")]
    Upstream { message: String },
}

impl MatchError {
    /// Returns true if the caller sent something that can never succeed as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MatchError::Validation { .. } | MatchError::EmptyBatch | MatchError::NoTimetable { .. }
        )
    }

    /// Returns true if resubmitting the same batch may succeed.
    ///
    /// Resubmission is safe because slot inserts are idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchError::Timeout { .. } | MatchError::Upstream { .. })
    }
}

impl From<rusqlite::Error> for MatchError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                MatchError::Timeout {
                    message: err.to_string(),
                }
            }
            _ => MatchError::Upstream {
                message: err.to_string(),
            },
        }
    }
}
