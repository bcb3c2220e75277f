use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct CanvasTokenBody {
    pub token: String,
}

/// POST /secrets/canvas
///
/// Stores the caller's Canvas access token, encrypted.
pub async fn post_canvas_token(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<CanvasTokenBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(e) => {
            return ApiErrorType::from((
                StatusCode::BAD_REQUEST,
                "Expected a JSON body with a `token` field",
                Some(e.body_text()),
            ))
            .into_response()
        }
    };

    if body.token.trim().is_empty() {
        return ApiErrorType::from((StatusCode::BAD_REQUEST, "Token must not be empty", None))
            .into_response();
    }

    info!("POST /secrets/canvas for user {}", user.id);

    match s.credentials.put(&user.id, body.token.trim()) {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => {
            error!("Failed to store Canvas token: {}", e);
            ApiErrorType::from((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store Canvas token",
                Some(e.to_string()),
            ))
            .into_response()
        }
    }
}
