use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::canvas::canvas_error_to_response;
use crate::auth::AuthUser;
use crate::courses;
use crate::types::AppState;

/// POST /courses/sync
///
/// Pulls the caller's active courses from Canvas into the local course table.
pub async fn post_sync_courses(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    info!("POST /courses/sync for user {}", user.id);

    match courses::sync_courses(&s, &user.id).await {
        Ok(courses) => (
            StatusCode::OK,
            Json(json!({ "count": courses.len(), "courses": courses })),
        )
            .into_response(),
        Err(e) => {
            if e.is_client_error() {
                warn!("Course sync rejected: {}", e);
            } else {
                error!("Failed to sync courses: {}", e);
            }
            canvas_error_to_response(e)
        }
    }
}

/// GET /users/me/courses
pub async fn get_my_courses(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    info!("GET /users/me/courses for user {}", user.id);

    match courses::list_courses(&s, &user.id) {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(e) => {
            error!("Failed to list courses: {}", e);
            canvas_error_to_response(e)
        }
    }
}
