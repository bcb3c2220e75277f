//! Endpoints for recording a timetable and finding classmates.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::matcher::{MatchError, SlotClaim};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// An id that clients send either as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    fn as_text(&self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s.trim().to_string(),
        }
    }

    fn as_number(&self) -> Option<i64> {
        match self {
            WireId::Number(n) => Some(*n),
            WireId::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One slot claim as posted by the client.
///
/// `user_id` may be omitted; when present it must be the caller's own id.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotClaimBody {
    #[serde(default)]
    pub user_id: Option<WireId>,
    pub course_id: WireId,
    pub day_of_course: String,
    pub time_of_day: String,
    pub room_of_course: String,
    pub is_theory: bool,
}

/// Converts posted claims into matcher claims owned by `user`.
fn claims_for_user(user: &AuthUser, body: Vec<SlotClaimBody>) -> Result<Vec<SlotClaim>, MatchError> {
    body.into_iter()
        .enumerate()
        .map(|(index, claim)| {
            if let Some(claimed) = &claim.user_id {
                if claimed.as_text() != user.id {
                    return Err(MatchError::Validation {
                        index,
                        message: "claims may only be submitted for your own timetable".to_string(),
                    });
                }
            }

            let course_id = claim.course_id.as_number().ok_or_else(|| MatchError::Validation {
                index,
                message: format!("course_id {:?} is not a number", claim.course_id.as_text()),
            })?;

            Ok(SlotClaim {
                user_id: user.id.clone(),
                course_id,
                day_of_course: claim.day_of_course,
                time_of_day: claim.time_of_day,
                room_of_course: claim.room_of_course,
                is_theory: claim.is_theory,
            })
        })
        .collect()
}

/// Converts MatchError to API response.
fn match_error_to_response(error: MatchError) -> Response {
    let (status, message) = match &error {
        MatchError::Validation { .. } | MatchError::EmptyBatch => {
            (StatusCode::BAD_REQUEST, "Invalid timetable submission")
        }
        MatchError::NoTimetable { .. } => (StatusCode::NOT_FOUND, "No timetable recorded"),
        MatchError::Timeout { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            "Timetable store timed out",
        ),
        MatchError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "Timetable store failed"),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// POST /find_classmate
///
/// Records the posted slot claims for the caller, then returns everyone who
/// shares one of the caller's slots.
pub async fn post_find_classmate(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<Vec<SlotClaimBody>>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(e) => {
            return ApiErrorType::from((
                StatusCode::BAD_REQUEST,
                "Expected a JSON array of slot claims",
                Some(e.body_text()),
            ))
            .into_response()
        }
    };

    info!("POST /find_classmate for user {} ({} claims)", user.id, body.len());

    let result = claims_for_user(&user, body)
        .and_then(|claims| s.matcher.submit_and_match(&user.id, &claims));

    match result {
        Ok(result) => {
            if result.is_empty() {
                info!("No classmates found for user {}", user.id);
            }
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            if e.is_client_error() {
                warn!("Rejected classmate request: {}", e);
            } else {
                error!(retryable = e.is_retryable(), "Classmate request failed: {}", e);
            }
            match_error_to_response(e)
        }
    }
}

/// GET /users/me/courses/find_classmate
///
/// Returns classmates for the caller's already recorded timetable.
pub async fn get_my_classmates(
    State(s): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    info!("GET /users/me/courses/find_classmate for user {}", user.id);

    match s.matcher.match_for_user(&user.id) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            if !e.is_client_error() {
                error!("Classmate lookup failed: {}", e);
            }
            match_error_to_response(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> AuthUser {
        AuthUser {
            id: "4190959".to_string(),
            email: None,
        }
    }

    fn body(value: serde_json::Value) -> Vec<SlotClaimBody> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let claims = claims_for_user(
            &user(),
            body(json!([{
                "user_id": 4190959, "course_id": "101", "day_of_course": "Monday",
                "time_of_day": "10:30", "room_of_course": "080.03.012", "is_theory": true
            }])),
        )
        .unwrap();

        assert_eq!(claims[0].user_id, "4190959");
        assert_eq!(claims[0].course_id, 101);
    }

    #[test]
    fn test_missing_user_id_defaults_to_caller() {
        let claims = claims_for_user(
            &user(),
            body(json!([{
                "course_id": 7, "day_of_course": "Tuesday",
                "time_of_day": "09:00", "room_of_course": "R1", "is_theory": false
            }])),
        )
        .unwrap();

        assert_eq!(claims[0].user_id, "4190959");
    }

    #[test]
    fn test_claim_for_other_user_is_rejected() {
        let err = claims_for_user(
            &user(),
            body(json!([{
                "user_id": 1, "course_id": 7, "day_of_course": "Tuesday",
                "time_of_day": "09:00", "room_of_course": "R1", "is_theory": false
            }])),
        )
        .unwrap_err();

        assert!(matches!(err, MatchError::Validation { index: 0, .. }));
    }

    #[test]
    fn test_non_numeric_course_id_is_rejected() {
        let err = claims_for_user(
            &user(),
            body(json!([{
                "course_id": "COSC1", "day_of_course": "Tuesday",
                "time_of_day": "09:00", "room_of_course": "R1", "is_theory": false
            }])),
        )
        .unwrap_err();

        assert!(err.to_string().contains("COSC1"));
    }
}
