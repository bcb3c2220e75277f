/// Database types for courses, timetable slots and stored secrets
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbCourse {
    pub user_id: String,
    pub course_id: i64,
    pub course_name: String,
    pub course_code: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
}

/// One row of the `timetable` table.
///
/// Identified by `(user_id, course_id, day_of_course, time_of_day, room_of_course)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbTimetableSlot {
    pub user_id: String,
    pub course_id: i64,
    pub day_of_course: String,
    pub time_of_day: String,
    pub room_of_course: String,
    pub course_name: String,
    pub is_theory: bool,
}

/// The tuple two users must share to be classmates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub course_id: i64,
    pub day_of_course: String,
    pub time_of_day: String,
    pub room_of_course: String,
    pub is_theory: bool,
}

impl DbTimetableSlot {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            course_id: self.course_id,
            day_of_course: self.day_of_course.clone(),
            time_of_day: self.time_of_day.clone(),
            room_of_course: self.room_of_course.clone(),
            is_theory: self.is_theory,
        }
    }
}
