/// Database module for courses, timetable slots and encrypted user secrets

mod types;

pub use types::{DbCourse, DbTimetableSlot, SlotKey};

use rusqlite::{Connection, OptionalExtension, Result, Row};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_timetable.sql");

const SLOT_COLUMNS: &str = "user_id, course_id, day_of_course, time_of_day, room_of_course, \
                            course_name, is_theory";

pub struct TimetableDb {
    db: Mutex<Connection>,
}

impl TimetableDb {
    /// Opens (or creates) the database at `db_path` and initializes the schema.
    ///
    /// `busy_timeout` bounds how long any single call waits on a locked database.
    pub fn open(db_path: &str, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::init(conn)
    }

    /// Opens a private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gets the course a user is enrolled in, if it has been recorded
    pub fn find_course(&self, user_id: &str, course_id: i64) -> Result<Option<DbCourse>> {
        let db = self.conn();
        db.query_row(
            "SELECT user_id, course_id, course_name, course_code, start_at, end_at
             FROM courses WHERE user_id = ?1 AND course_id = ?2",
            (user_id, course_id),
            course_from_row,
        )
        .optional()
    }

    /// Gets every recorded course for a user, ordered by course id
    pub fn list_courses(&self, user_id: &str) -> Result<Vec<DbCourse>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT user_id, course_id, course_name, course_code, start_at, end_at
             FROM courses WHERE user_id = ?1 ORDER BY course_id",
        )?;

        let courses = stmt.query_map([user_id], course_from_row)?;
        courses.collect()
    }

    /// Inserts or refreshes course rows. Returns the number of rows written.
    pub fn upsert_courses(&self, courses: &[DbCourse]) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO courses (user_id, course_id, course_name, course_code, start_at, end_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (user_id, course_id) DO UPDATE SET
                    course_name = excluded.course_name,
                    course_code = excluded.course_code,
                    start_at = excluded.start_at,
                    end_at = excluded.end_at,
                    updated_at = excluded.updated_at",
            )?;

            for course in courses {
                written += stmt.execute((
                    &course.user_id,
                    course.course_id,
                    &course.course_name,
                    &course.course_code,
                    &course.start_at,
                    &course.end_at,
                    &now,
                ))?;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    /// Checks whether a slot with the same identifying key is already recorded
    #[cfg(test)]
    pub fn slot_exists(&self, slot: &DbTimetableSlot) -> Result<bool> {
        let db = self.conn();
        db.query_row(
            "SELECT EXISTS (
                SELECT 1 FROM timetable
                WHERE user_id = ?1 AND course_id = ?2 AND day_of_course = ?3
                  AND time_of_day = ?4 AND room_of_course = ?5
             )",
            (
                &slot.user_id,
                slot.course_id,
                &slot.day_of_course,
                &slot.time_of_day,
                &slot.room_of_course,
            ),
            |row| row.get(0),
        )
    }

    /// Inserts a slot unless an identical one exists. Returns true if a row was written.
    #[cfg(test)]
    pub fn insert_slot(&self, slot: &DbTimetableSlot) -> Result<bool> {
        let db = self.conn();
        let written = insert_slot_if_absent(&db, slot, &chrono::Utc::now().to_rfc3339())?;
        Ok(written)
    }

    /// Inserts every slot that is not already recorded, all in one transaction.
    ///
    /// Returns the number of new rows.
    pub fn insert_slots(&self, slots: &[DbTimetableSlot]) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut inserted = 0;
        for slot in slots {
            if insert_slot_if_absent(&tx, slot, &now)? {
                inserted += 1;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// Gets all slots owned by a user, in insertion order
    pub fn find_slots_by_user(&self, user_id: &str) -> Result<Vec<DbTimetableSlot>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SLOT_COLUMNS} FROM timetable WHERE user_id = ?1 ORDER BY slot_id"
        ))?;

        let slots = stmt.query_map([user_id], slot_from_row)?;
        slots.collect()
    }

    /// Gets every slot at `key` that belongs to someone other than `excluding_user`
    pub fn find_slots_by_slot_key(
        &self,
        key: &SlotKey,
        excluding_user: &str,
    ) -> Result<Vec<DbTimetableSlot>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SLOT_COLUMNS} FROM timetable
             WHERE course_id = ?1 AND day_of_course = ?2 AND time_of_day = ?3
               AND room_of_course = ?4 AND is_theory = ?5 AND user_id <> ?6
             ORDER BY slot_id"
        ))?;

        let slots = stmt.query_map(
            (
                key.course_id,
                &key.day_of_course,
                &key.time_of_day,
                &key.room_of_course,
                key.is_theory,
                excluding_user,
            ),
            slot_from_row,
        )?;
        slots.collect()
    }

    /// Gets the encrypted LMS token stored for a user
    pub fn get_secret(&self, user_id: &str) -> Result<Option<String>> {
        let db = self.conn();
        db.query_row(
            "SELECT canvas_token_enc FROM user_secrets WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()
    }

    /// Stores the encrypted LMS token for a user, replacing any previous one
    pub fn put_secret(&self, user_id: &str, canvas_token_enc: &str) -> Result<()> {
        let db = self.conn();
        db.execute(
            "INSERT INTO user_secrets (user_id, canvas_token_enc, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id) DO UPDATE SET
                canvas_token_enc = excluded.canvas_token_enc,
                updated_at = excluded.updated_at",
            (user_id, canvas_token_enc, chrono::Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    /// Runs raw SQL against the connection. Test-only escape hatch.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn().execute_batch(sql)
    }
}

/// A fresh database file path under the system temp directory.
#[cfg(test)]
pub(crate) fn temp_db_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "classmate-{label}-{}-{:08x}.db",
        std::process::id(),
        rand::random::<u32>()
    ))
}

fn insert_slot_if_absent(conn: &Connection, slot: &DbTimetableSlot, now: &str) -> Result<bool> {
    let written = conn.execute(
        "INSERT OR IGNORE INTO timetable (
            user_id, course_id, day_of_course, time_of_day, room_of_course,
            course_name, is_theory, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            &slot.user_id,
            slot.course_id,
            &slot.day_of_course,
            &slot.time_of_day,
            &slot.room_of_course,
            &slot.course_name,
            slot.is_theory,
            now,
        ),
    )?;
    Ok(written > 0)
}

fn course_from_row(row: &Row<'_>) -> Result<DbCourse> {
    Ok(DbCourse {
        user_id: row.get(0)?,
        course_id: row.get(1)?,
        course_name: row.get(2)?,
        course_code: row.get(3)?,
        start_at: row.get(4)?,
        end_at: row.get(5)?,
    })
}

fn slot_from_row(row: &Row<'_>) -> Result<DbTimetableSlot> {
    Ok(DbTimetableSlot {
        user_id: row.get(0)?,
        course_id: row.get(1)?,
        day_of_course: row.get(2)?,
        time_of_day: row.get(3)?,
        room_of_course: row.get(4)?,
        course_name: row.get(5)?,
        is_theory: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(user_id: &str, course_id: i64, name: &str) -> DbCourse {
        DbCourse {
            user_id: user_id.to_string(),
            course_id,
            course_name: name.to_string(),
            course_code: None,
            start_at: None,
            end_at: None,
        }
    }

    fn slot(user_id: &str, course_id: i64, room: &str, is_theory: bool) -> DbTimetableSlot {
        DbTimetableSlot {
            user_id: user_id.to_string(),
            course_id,
            day_of_course: "Monday".to_string(),
            time_of_day: "10:00".to_string(),
            room_of_course: room.to_string(),
            course_name: "Systems".to_string(),
            is_theory,
        }
    }

    #[test]
    fn test_upsert_courses_refreshes_name() {
        let db = TimetableDb::open_in_memory().unwrap();
        db.upsert_courses(&[course("1", 101, "Systems")]).unwrap();
        db.upsert_courses(&[course("1", 101, "Systems Programming")]).unwrap();

        let found = db.find_course("1", 101).unwrap().unwrap();
        assert_eq!(found.course_name, "Systems Programming");
        assert_eq!(db.list_courses("1").unwrap().len(), 1);
        assert!(db.find_course("2", 101).unwrap().is_none());
    }

    #[test]
    fn test_insert_slot_ignores_duplicate_key() {
        let db = TimetableDb::open_in_memory().unwrap();
        let s = slot("1", 101, "R1", true);

        assert!(!db.slot_exists(&s).unwrap());
        assert!(db.insert_slot(&s).unwrap());
        assert!(db.slot_exists(&s).unwrap());
        assert!(!db.insert_slot(&s).unwrap());

        // is_theory is not part of the identifying key
        assert!(!db.insert_slot(&slot("1", 101, "R1", false)).unwrap());
        assert_eq!(db.find_slots_by_user("1").unwrap().len(), 1);
    }

    #[test]
    fn test_insert_slots_counts_new_rows() {
        let db = TimetableDb::open_in_memory().unwrap();
        let batch = vec![slot("1", 101, "R1", true), slot("1", 101, "R2", false)];

        assert_eq!(db.insert_slots(&batch).unwrap(), 2);
        assert_eq!(db.insert_slots(&batch).unwrap(), 0);
    }

    #[test]
    fn test_find_slots_by_slot_key_excludes_user() {
        let db = TimetableDb::open_in_memory().unwrap();
        db.insert_slot(&slot("1", 101, "R1", true)).unwrap();
        db.insert_slot(&slot("2", 101, "R1", true)).unwrap();
        db.insert_slot(&slot("3", 101, "R1", false)).unwrap();
        db.insert_slot(&slot("4", 101, "R9", true)).unwrap();

        let key = slot("1", 101, "R1", true).slot_key();
        let others = db.find_slots_by_slot_key(&key, "1").unwrap();

        assert_eq!(others.len(), 1);
        assert_eq!(others[0].user_id, "2");
    }

    #[test]
    fn test_put_secret_replaces_previous() {
        let db = TimetableDb::open_in_memory().unwrap();
        assert!(db.get_secret("u").unwrap().is_none());

        db.put_secret("u", "first").unwrap();
        db.put_secret("u", "second").unwrap();

        assert_eq!(db.get_secret("u").unwrap().as_deref(), Some("second"));
    }
}
