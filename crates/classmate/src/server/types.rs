use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error body returned by every endpoint: `{"error": ..., "details": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorType {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl<T: Into<String>> From<(StatusCode, T, Option<String>)> for ApiErrorType {
    fn from((status, error, details): (StatusCode, T, Option<String>)) -> Self {
        Self {
            status,
            error: error.into(),
            details,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
