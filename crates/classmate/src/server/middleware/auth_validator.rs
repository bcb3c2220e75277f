use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::auth::{bearer_token, AuthError};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// Verifies the request's bearer token and attaches the resulting
/// [`AuthUser`](crate::auth::AuthUser) to the request extensions.
///
/// Requests without a valid token never reach the handler.
pub async fn auth(State(s): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    let Some(token) = token else {
        return auth_error_to_response(AuthError::MissingToken);
    };

    match s.auth.verify(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => {
            if e.is_client_error() {
                warn!("Rejected request to {}: {}", req.uri().path(), e);
            } else {
                error!("Token verification failed for {}: {}", req.uri().path(), e);
            }
            auth_error_to_response(e)
        }
    }
}

fn auth_error_to_response(error: AuthError) -> Response {
    let (status, message) = match &error {
        AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing bearer token"),
        AuthError::InvalidToken { .. } => (StatusCode::UNAUTHORIZED, "Invalid token"),
        AuthError::Upstream { .. } => (
            StatusCode::BAD_GATEWAY,
            "Could not reach the identity provider",
        ),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}
