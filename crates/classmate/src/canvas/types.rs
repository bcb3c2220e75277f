/// Types for Canvas API data
use serde::{Deserialize, Serialize};

use crate::db::DbCourse;

/// The subset of a Canvas course object that is mirrored locally.
///
/// Courses the user can no longer access come back with only an `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasCourse {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
}

impl CanvasCourse {
    /// Converts into a local course row, or `None` if the course has no usable name.
    pub fn into_db_course(self, user_id: &str) -> Option<DbCourse> {
        let usable = |n: &&String| !n.trim().is_empty();
        let course_name = self
            .name
            .as_ref()
            .filter(usable)
            .or_else(|| self.course_code.as_ref().filter(usable))?
            .clone();

        Some(DbCourse {
            user_id: user_id.to_string(),
            course_id: self.id,
            course_name,
            course_code: self.course_code,
            start_at: self.start_at,
            end_at: self.end_at,
        })
    }
}

/// Optional date range for planner items (`YYYY-MM-DD` or ISO 8601).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
