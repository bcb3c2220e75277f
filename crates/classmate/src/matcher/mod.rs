//! Classmate matching.
//!
//! A submission goes through two phases:
//! 1. Every claim is validated against the user's recorded courses. Nothing is
//!    written unless the whole batch is valid.
//! 2. The accepted slots are inserted (identical slots are skipped), then the
//!    requesting user's timetable is compared against everyone else's.

mod error;
mod types;

pub use error::MatchError;
pub use types::{ClassmateMatch, MatchResult, SlotClaim};

use crate::db::{DbTimetableSlot, TimetableDb};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ClassmateMatcher {
    db: Arc<TimetableDb>,
}

impl ClassmateMatcher {
    pub fn new(db: Arc<TimetableDb>) -> Self {
        Self { db }
    }

    /// Records a batch of slot claims and returns the requesting user's classmates.
    ///
    /// # Arguments
    /// * `requesting_user` - The user whose timetable is matched after the insert
    /// * `claims` - Slot claims, processed in order
    ///
    /// # Returns
    /// * `Ok(MatchResult)` - Possibly empty list of classmates
    /// * `Err(MatchError::Validation)` - First invalid claim; nothing was inserted
    /// * `Err(MatchError::NoTimetable)` - The requesting user has no slots at all
    pub fn submit_and_match(
        &self,
        requesting_user: &str,
        claims: &[SlotClaim],
    ) -> Result<MatchResult, MatchError> {
        let correlation_id = generate_correlation_id();
        let start = Instant::now();

        info!(
            correlation_id = %correlation_id,
            user_id = %requesting_user,
            claims = claims.len(),
            "Submitting timetable claims"
        );

        let slots = match self.validate_claims(claims) {
            Ok(slots) => slots,
            Err(e) => {
                warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Rejected timetable claims"
                );
                return Err(e);
            }
        };

        let inserted = self.db.insert_slots(&slots)?;
        info!(
            correlation_id = %correlation_id,
            inserted,
            skipped = slots.len() - inserted,
            "Recorded timetable slots"
        );

        let result = self.match_for_user(requesting_user)?;
        info!(
            correlation_id = %correlation_id,
            matches = result.count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Classmate match completed"
        );

        Ok(result)
    }

    /// Finds every other user who shares at least one recorded slot with `user_id`.
    ///
    /// A classmate sharing several slots appears once per shared slot, in the
    /// order the user's own slots were recorded.
    pub fn match_for_user(&self, user_id: &str) -> Result<MatchResult, MatchError> {
        let own_slots = self.db.find_slots_by_user(user_id)?;
        if own_slots.is_empty() {
            return Err(MatchError::NoTimetable {
                user_id: user_id.to_string(),
            });
        }

        let mut matches = Vec::new();
        for slot in &own_slots {
            let others = self.db.find_slots_by_slot_key(&slot.slot_key(), user_id)?;
            debug!(
                user_id = %user_id,
                course_id = slot.course_id,
                found = others.len(),
                "Matched slot"
            );
            matches.extend(others.into_iter().map(ClassmateMatch::from));
        }

        Ok(MatchResult::new(matches))
    }

    /// Validates every claim and builds the slot rows to insert.
    ///
    /// Stops at the first bad claim.
    fn validate_claims(&self, claims: &[SlotClaim]) -> Result<Vec<DbTimetableSlot>, MatchError> {
        if claims.is_empty() {
            return Err(MatchError::EmptyBatch);
        }

        claims
            .iter()
            .enumerate()
            .map(|(index, claim)| self.validate_claim(index, claim))
            .collect()
    }

    fn validate_claim(&self, index: usize, claim: &SlotClaim) -> Result<DbTimetableSlot, MatchError> {
        let required = [
            ("user_id", claim.user_id.trim()),
            ("day_of_course", claim.day_of_course.trim()),
            ("time_of_day", claim.time_of_day.trim()),
            ("room_of_course", claim.room_of_course.trim()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(MatchError::Validation {
                index,
                message: format!("{field} is required"),
            });
        }

        let course = self
            .db
            .find_course(claim.user_id.trim(), claim.course_id)?
            .ok_or_else(|| MatchError::Validation {
                index,
                message: format!(
                    "course {} does not exist for user {}",
                    claim.course_id,
                    claim.user_id.trim()
                ),
            })?;

        Ok(DbTimetableSlot {
            user_id: course.user_id,
            course_id: course.course_id,
            day_of_course: claim.day_of_course.trim().to_string(),
            time_of_day: claim.time_of_day.trim().to_string(),
            room_of_course: claim.room_of_course.trim().to_string(),
            course_name: course.course_name,
            is_theory: claim.is_theory,
        })
    }
}

/// Generates a short id to tie together the log lines of one submission.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
