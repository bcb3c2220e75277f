/// Types for timetable claims and classmate matches
use serde::{Deserialize, Serialize};

use crate::db::DbTimetableSlot;

/// A user's assertion that they attend a course at a given day, time and room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotClaim {
    pub user_id: String,
    pub course_id: i64,
    pub day_of_course: String,
    pub time_of_day: String,
    pub room_of_course: String,
    pub is_theory: bool,
}

/// Another user's slot that shares course, day, time, room and session type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassmateMatch {
    pub user_id: String,
    pub course_id: i64,
    pub day_of_course: String,
    pub time_of_day: String,
    pub room_of_course: String,
    pub course_name: String,
    pub is_theory: bool,
}

impl From<DbTimetableSlot> for ClassmateMatch {
    fn from(slot: DbTimetableSlot) -> Self {
        Self {
            user_id: slot.user_id,
            course_id: slot.course_id,
            day_of_course: slot.day_of_course,
            time_of_day: slot.time_of_day,
            room_of_course: slot.room_of_course,
            course_name: slot.course_name,
            is_theory: slot.is_theory,
        }
    }
}

/// Result of a match. `count` always equals `matches.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub count: usize,
    pub matches: Vec<ClassmateMatch>,
}

impl MatchResult {
    pub fn new(matches: Vec<ClassmateMatch>) -> Self {
        Self {
            count: matches.len(),
            matches,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
