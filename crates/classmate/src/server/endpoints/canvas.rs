//! Per-user proxies for the Canvas LMS API.
//!
//! Every endpoint accepts an optional `fields=a,b,c` query parameter that keeps
//! only those keys of each returned object.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::canvas::{filter_fields, CanvasError, PlannerRange};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct FieldsQuery {
    pub fields: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlannerQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub fields: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentsQuery {
    #[serde(default = "default_true")]
    pub with_submissions: bool,
    pub fields: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Converts CanvasError to API response.
pub(super) fn canvas_error_to_response(error: CanvasError) -> Response {
    let (status, message) = match &error {
        CanvasError::MissingToken => (
            StatusCode::BAD_REQUEST,
            "Canvas token not set for this user",
        ),
        CanvasError::Status {
            status: 401 | 403, ..
        } => (StatusCode::BAD_REQUEST, "Canvas token rejected"),
        CanvasError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Canvas request timed out"),
        CanvasError::Status { .. }
        | CanvasError::Network { .. }
        | CanvasError::UnexpectedResponse { .. } => {
            (StatusCode::BAD_GATEWAY, "Canvas request failed")
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to process Canvas request",
        ),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

fn respond(result: Result<Value, CanvasError>, fields: Option<&str>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(filter_fields(value, fields))).into_response(),
        Err(e) => {
            if e.is_client_error() {
                warn!("Canvas proxy rejected: {}", e);
            } else {
                error!(retryable = e.is_retryable(), "Canvas proxy failed: {}", e);
            }
            canvas_error_to_response(e)
        }
    }
}

/// GET /canvas/me
pub async fn get_me(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<FieldsQuery>,
) -> Response {
    info!("GET /canvas/me for user {}", user.id);

    let result = match s.canvas_token(&user.id) {
        Ok(token) => s.canvas.get_self(&token).await,
        Err(e) => Err(e),
    };
    respond(result, q.fields.as_deref())
}

/// GET /canvas/courses
pub async fn get_courses(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<FieldsQuery>,
) -> Response {
    info!("GET /canvas/courses for user {}", user.id);

    let result = match s.canvas_token(&user.id) {
        Ok(token) => s.canvas.list_courses(&token).await,
        Err(e) => Err(e),
    };
    respond(result, q.fields.as_deref())
}

/// GET /canvas/planner
///
/// Query parameters:
/// - `start_date`, `end_date` (optional): bound the planner items returned
pub async fn get_planner(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<PlannerQuery>,
) -> Response {
    info!("GET /canvas/planner for user {}", user.id);

    let range = PlannerRange {
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let result = match s.canvas_token(&user.id) {
        Ok(token) => s.canvas.list_planner_items(&token, &range).await,
        Err(e) => Err(e),
    };
    respond(result, q.fields.as_deref())
}

/// GET /canvas/grades
pub async fn get_grades(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<FieldsQuery>,
) -> Response {
    info!("GET /canvas/grades for user {}", user.id);

    let result = match s.canvas_token(&user.id) {
        Ok(token) => s.canvas.list_enrollments(&token).await,
        Err(e) => Err(e),
    };
    respond(result, q.fields.as_deref())
}

/// GET /canvas/courses/:course_id/assignments
///
/// Query parameters:
/// - `with_submissions` (optional, default `true`): include the caller's submission
pub async fn get_assignments(
    Path(course_id): Path<i64>,
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(q): Query<AssignmentsQuery>,
) -> Response {
    info!(
        "GET /canvas/courses/{}/assignments for user {}",
        course_id, user.id
    );

    let result = match s.canvas_token(&user.id) {
        Ok(token) => {
            s.canvas
                .list_assignments(&token, course_id, q.with_submissions)
                .await
        }
        Err(e) => Err(e),
    };
    respond(result, q.fields.as_deref())
}
