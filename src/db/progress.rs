//! User progress repository: counters, XP and streak state
//!
//! One row per user. Every mutation re-reads current state inside the
//! caller's transaction (read-modify-write), never trusting stale
//! in-memory values; lost-update races between concurrent activities
//! for the same user resolve at the transaction boundary.

use chrono::NaiveDate;
use diesel::prelude::*;

use super::models::{current_timestamp, date_string, parse_date, NewUserProgress, UserProgress};
use super::schema::user_progress;
use crate::error::ProgressError;
use crate::streak::{self, StreakChange};
use crate::xp::{self, XpAward};

// ============================================================================
// Read Operations
// ============================================================================

/// Get the progress row for a user
pub fn get_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<UserProgress>, ProgressError> {
    user_progress::table
        .filter(user_progress::user_id.eq(user_id))
        .first(conn)
        .optional()
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

/// Get the progress row, failing when it is missing
///
/// A missing row for an otherwise-valid user is a data-integrity
/// problem, not a user error.
pub fn require_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<UserProgress, ProgressError> {
    get_progress(conn, user_id)?
        .ok_or_else(|| ProgressError::NotFound(format!("Progress for user '{}' not found", user_id)))
}

/// List every known user id (weekly target fan-out)
pub fn all_user_ids(conn: &mut SqliteConnection) -> Result<Vec<String>, ProgressError> {
    user_progress::table
        .select(user_progress::user_id)
        .order(user_progress::user_id.asc())
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

// ============================================================================
// Write Operations
// ============================================================================

/// Create the zeroed progress row for a user if absent, returning it
pub fn ensure_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<UserProgress, ProgressError> {
    let row = NewUserProgress { user_id };
    diesel::insert_or_ignore_into(user_progress::table)
        .values(&row)
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Insert failed: {}", e)))?;

    require_progress(conn, user_id)
}

/// Bump the articles-read counter
pub fn record_article_read(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<(), ProgressError> {
    let updated = diesel::update(user_progress::table.filter(user_progress::user_id.eq(user_id)))
        .set((
            user_progress::articles_read.eq(user_progress::articles_read + 1),
            user_progress::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;
    missing_if_zero(updated, user_id)
}

/// Add reading minutes to the lifetime counter
pub fn add_reading_minutes(
    conn: &mut SqliteConnection,
    user_id: &str,
    minutes: i32,
) -> Result<(), ProgressError> {
    if minutes < 0 {
        return Err(ProgressError::InvalidInput(
            "Reading minutes must be non-negative".into(),
        ));
    }
    let current = require_progress(conn, user_id)?;
    let total = current.reading_minutes.saturating_add(minutes);
    diesel::update(user_progress::table.filter(user_progress::user_id.eq(user_id)))
        .set((
            user_progress::reading_minutes.eq(total),
            user_progress::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;
    Ok(())
}

/// Bump the quizzes-completed counter
pub fn record_quiz_completed(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<(), ProgressError> {
    let updated = diesel::update(user_progress::table.filter(user_progress::user_id.eq(user_id)))
        .set((
            user_progress::quizzes_completed.eq(user_progress::quizzes_completed + 1),
            user_progress::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;
    missing_if_zero(updated, user_id)
}

/// Bump the events-attended counter
pub fn record_event_attended(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<(), ProgressError> {
    let updated = diesel::update(user_progress::table.filter(user_progress::user_id.eq(user_id)))
        .set((
            user_progress::events_attended.eq(user_progress::events_attended + 1),
            user_progress::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;
    missing_if_zero(updated, user_id)
}

/// Store the recomputed literacy score (skill ledger writes through here)
pub fn set_literacy_score(
    conn: &mut SqliteConnection,
    user_id: &str,
    score: i32,
) -> Result<(), ProgressError> {
    let updated = diesel::update(user_progress::table.filter(user_progress::user_id.eq(user_id)))
        .set((
            user_progress::literacy_score.eq(score),
            user_progress::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;
    missing_if_zero(updated, user_id)
}

/// Award XP and recompute the level
///
/// XP only grows. `leveled_up` is reported when the new level exceeds
/// the previous one; nothing else depends on it.
pub fn award_xp(
    conn: &mut SqliteConnection,
    user_id: &str,
    amount: i32,
) -> Result<XpAward, ProgressError> {
    if amount < 0 {
        return Err(ProgressError::InvalidInput(
            "XP award must be non-negative".into(),
        ));
    }

    let current = require_progress(conn, user_id)?;
    // Saturate rather than wrap: a wrap would send XP negative and
    // break the never-decreases invariant.
    let total_xp = current.xp.saturating_add(amount);
    let level = xp::compute_level(total_xp);

    diesel::update(user_progress::table.filter(user_progress::user_id.eq(user_id)))
        .set((
            user_progress::xp.eq(total_xp),
            user_progress::level.eq(level),
            user_progress::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;

    Ok(XpAward {
        amount,
        total_xp,
        level,
        leveled_up: level > current.level,
    })
}

/// Register a qualifying activity for the streak counter
///
/// `last_activity_date` is refreshed unconditionally, even on same-day
/// touches, so last-seen stays accurate.
pub fn touch_streak(
    conn: &mut SqliteConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<(i32, StreakChange), ProgressError> {
    let current = require_progress(conn, user_id)?;
    let last = current.last_activity_date.as_deref().and_then(parse_date);
    let (next, change) = streak::next_streak(current.streak, last, today);

    diesel::update(user_progress::table.filter(user_progress::user_id.eq(user_id)))
        .set((
            user_progress::streak.eq(next),
            user_progress::last_activity_date.eq(Some(date_string(today))),
            user_progress::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;

    Ok((next, change))
}

fn missing_if_zero(updated: usize, user_id: &str) -> Result<(), ProgressError> {
    if updated == 0 {
        return Err(ProgressError::NotFound(format!(
            "Progress for user '{}' not found",
            user_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProgressDb;

    fn setup() -> (ProgressDb, crate::db::DbConn) {
        let db = ProgressDb::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        (db, conn)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let (_db, mut conn) = setup();
        let first = ensure_user(&mut conn, "reader-1").unwrap();
        assert_eq!(first.xp, 0);
        assert_eq!(first.level, 1);
        assert_eq!(first.streak, 0);

        award_xp(&mut conn, "reader-1", 150).unwrap();
        let again = ensure_user(&mut conn, "reader-1").unwrap();
        assert_eq!(again.xp, 150, "ensure_user must not reset existing rows");
    }

    #[test]
    fn test_missing_user_is_not_found() {
        let (_db, mut conn) = setup();
        let err = record_article_read(&mut conn, "ghost").unwrap_err();
        assert!(matches!(err, ProgressError::NotFound(_)));
        let err = award_xp(&mut conn, "ghost", 10).unwrap_err();
        assert!(matches!(err, ProgressError::NotFound(_)));
    }

    #[test]
    fn test_award_xp_levels_up() {
        let (_db, mut conn) = setup();
        ensure_user(&mut conn, "reader-1").unwrap();

        let award = award_xp(&mut conn, "reader-1", 250).unwrap();
        assert_eq!(award.total_xp, 250);
        assert_eq!(award.level, 2);
        assert!(award.leveled_up);

        // 250 XP + hard quiz 8/10 (+160) = 410, crossing the 300 threshold
        let award = award_xp(&mut conn, "reader-1", 160).unwrap();
        assert_eq!(award.total_xp, 410);
        assert_eq!(award.level, 3);
        assert!(award.leveled_up);

        let award = award_xp(&mut conn, "reader-1", 0).unwrap();
        assert!(!award.leveled_up);
        assert_eq!(award.total_xp, 410, "XP never decreases");

        assert!(award_xp(&mut conn, "reader-1", -5).is_err());
    }

    #[test]
    fn test_xp_and_minutes_saturate_at_ceiling() {
        let (_db, mut conn) = setup();
        ensure_user(&mut conn, "reader-1").unwrap();

        award_xp(&mut conn, "reader-1", i32::MAX).unwrap();
        let award = award_xp(&mut conn, "reader-1", i32::MAX).unwrap();
        assert_eq!(award.total_xp, i32::MAX, "XP pins at the ceiling, never wraps");
        assert!(!award.leveled_up);

        add_reading_minutes(&mut conn, "reader-1", i32::MAX).unwrap();
        add_reading_minutes(&mut conn, "reader-1", i32::MAX).unwrap();
        let row = require_progress(&mut conn, "reader-1").unwrap();
        assert_eq!(row.reading_minutes, i32::MAX);
    }

    #[test]
    fn test_streak_lifecycle() {
        let (_db, mut conn) = setup();
        ensure_user(&mut conn, "reader-1").unwrap();

        let (s, c) = touch_streak(&mut conn, "reader-1", d("2025-06-02")).unwrap();
        assert_eq!((s, c), (1, StreakChange::Reset));

        let (s, c) = touch_streak(&mut conn, "reader-1", d("2025-06-02")).unwrap();
        assert_eq!((s, c), (1, StreakChange::SameDay));

        let (s, c) = touch_streak(&mut conn, "reader-1", d("2025-06-03")).unwrap();
        assert_eq!((s, c), (2, StreakChange::Extended));

        let (s, c) = touch_streak(&mut conn, "reader-1", d("2025-06-06")).unwrap();
        assert_eq!((s, c), (1, StreakChange::Reset));

        let row = require_progress(&mut conn, "reader-1").unwrap();
        assert_eq!(row.last_activity_date.as_deref(), Some("2025-06-06"));
    }

    #[test]
    fn test_counters() {
        let (_db, mut conn) = setup();
        ensure_user(&mut conn, "reader-1").unwrap();
        record_article_read(&mut conn, "reader-1").unwrap();
        record_article_read(&mut conn, "reader-1").unwrap();
        add_reading_minutes(&mut conn, "reader-1", 30).unwrap();
        record_quiz_completed(&mut conn, "reader-1").unwrap();
        record_event_attended(&mut conn, "reader-1").unwrap();

        let row = require_progress(&mut conn, "reader-1").unwrap();
        assert_eq!(row.articles_read, 2);
        assert_eq!(row.reading_minutes, 30);
        assert_eq!(row.quizzes_completed, 1);
        assert_eq!(row.events_attended, 1);

        assert!(add_reading_minutes(&mut conn, "reader-1", -1).is_err());
    }
}
