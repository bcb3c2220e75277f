use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware as mw, Router};

use crate::server::endpoints::{canvas, classmates, courses, secrets, status};
use crate::server::middleware::*;
use crate::types::AppState;

mod endpoints;
mod middleware;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Canvas proxies, per caller
    let canvas_router = Router::new()
        .route("/canvas/me", get(canvas::get_me))
        .route("/canvas/courses", get(canvas::get_courses))
        .route("/canvas/planner", get(canvas::get_planner))
        .route("/canvas/grades", get(canvas::get_grades))
        .route(
            "/canvas/courses/:course_id/assignments",
            get(canvas::get_assignments),
        );

    // Everything that reads or writes the caller's own data
    let user_router = Router::new()
        .route("/secrets/canvas", post(secrets::post_canvas_token))
        .route("/courses/sync", post(courses::post_sync_courses))
        .route("/users/me/courses", get(courses::get_my_courses))
        .route("/find_classmate", post(classmates::post_find_classmate))
        .route(
            "/users/me/courses/find_classmate",
            get(classmates::get_my_classmates),
        )
        .merge(canvas_router)
        .layer(mw::from_fn_with_state(
            app_state.clone(),
            auth_validator::auth,
        ));

    Router::new()
        .route("/health", get(status::get_health))
        .merge(user_router)
        .with_state(app_state)
}
