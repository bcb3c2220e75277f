//! Mirrors a user's Canvas courses into the local course table.
//!
//! The matcher only accepts claims for courses recorded here.

use std::sync::Arc;
use tracing::info;

use crate::canvas::CanvasError;
use crate::db::DbCourse;
use crate::types::AppState;

/// Fetches the user's active Canvas courses and upserts them.
///
/// Returns the user's full stored course list afterwards.
pub async fn sync_courses(state: &Arc<AppState>, user_id: &str) -> Result<Vec<DbCourse>, CanvasError> {
    let token = state.canvas_token(user_id)?;
    let fetched = state.canvas.list_courses_typed(&token).await?;
    let total = fetched.len();

    let courses: Vec<DbCourse> = fetched
        .into_iter()
        .filter_map(|c| c.into_db_course(user_id))
        .collect();

    let written = state.db.upsert_courses(&courses)?;
    info!(
        user_id = %user_id,
        fetched = total,
        skipped = total - courses.len(),
        written,
        "Synced Canvas courses"
    );

    Ok(state.db.list_courses(user_id)?)
}

/// Gets the user's stored courses.
pub fn list_courses(state: &AppState, user_id: &str) -> Result<Vec<DbCourse>, CanvasError> {
    Ok(state.db.list_courses(user_id)?)
}
