//! Badge evaluation and append-only grants
//!
//! The evaluator scans the declarative catalog against a stats
//! snapshot built inside the caller's transaction. Grants insert with
//! `insert_or_ignore`, so the (user_id, badge_code) primary key is the
//! only concurrency guard: a racing duplicate is a benign no-op, never
//! an error, and grants are never revoked.

use diesel::prelude::*;
use tracing::debug;

use super::models::{current_timestamp, Badge, BadgeStatus, NewUserBadge, UserBadge};
use super::schema::{badges, user_badges};
use super::{progress, quiz_results, skills};
use crate::badges::{StatsSnapshot, CATALOG};
use crate::error::ProgressError;

/// Build the stats snapshot badge predicates evaluate against
pub fn stats_snapshot(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<StatsSnapshot, ProgressError> {
    let row = progress::require_progress(conn, user_id)?;
    let profile = skills::get_profile(conn, user_id)?;
    let perfect_quizzes = quiz_results::perfect_quiz_count(conn, user_id)?;

    let (reading_speed, critical_analysis) = match profile {
        Some(p) => (p.reading_speed, p.critical_analysis),
        None => (0.0, 0.0),
    };

    Ok(StatsSnapshot {
        articles_read: row.articles_read,
        quizzes_completed: row.quizzes_completed,
        events_attended: row.events_attended,
        streak: row.streak,
        perfect_quizzes,
        reading_speed,
        critical_analysis,
    })
}

/// Badge codes already granted to a user
pub fn granted_codes(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<String>, ProgressError> {
    user_badges::table
        .filter(user_badges::user_id.eq(user_id))
        .select(user_badges::badge_code)
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

/// Grant a badge, absorbing the duplicate race as a no-op
///
/// Returns true when this call created the grant row.
pub fn grant(
    conn: &mut SqliteConnection,
    user_id: &str,
    badge_code: &str,
) -> Result<bool, ProgressError> {
    let granted_at = current_timestamp();
    let row = NewUserBadge {
        user_id,
        badge_code,
        granted_at: &granted_at,
    };

    let inserted = diesel::insert_or_ignore_into(user_badges::table)
        .values(&row)
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Grant failed: {}", e)))?;

    Ok(inserted > 0)
}

/// Re-check unlock criteria and grant anything newly earned
///
/// Idempotent: a second pass over unchanged stats grants nothing.
pub fn evaluate(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<Badge>, ProgressError> {
    let snapshot = stats_snapshot(conn, user_id)?;
    let already = granted_codes(conn, user_id)?;

    let mut unlocked = Vec::new();
    for spec in &CATALOG {
        if already.iter().any(|c| c == spec.code) {
            continue;
        }
        if !(spec.unlocked)(&snapshot) {
            continue;
        }
        if grant(conn, user_id, spec.code)? {
            debug!(user = %user_id, badge = %spec.code, "Badge unlocked");
            unlocked.push(Badge {
                code: spec.code.to_string(),
                name: spec.name.to_string(),
                icon: spec.icon.to_string(),
            });
        }
    }

    Ok(unlocked)
}

/// Full catalog with the user's earned state and grant dates
pub fn badges_with_status(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<BadgeStatus>, ProgressError> {
    let catalog: Vec<Badge> = badges::table
        .order(badges::code.asc())
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))?;

    let grants: Vec<UserBadge> = user_badges::table
        .filter(user_badges::user_id.eq(user_id))
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))?;

    Ok(catalog
        .into_iter()
        .map(|badge| {
            let grant = grants.iter().find(|g| g.badge_code == badge.code);
            BadgeStatus {
                earned: grant.is_some(),
                granted_at: grant.map(|g| g.granted_at.clone()),
                badge,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::badge_codes;
    use crate::db::ProgressDb;

    fn setup() -> (ProgressDb, crate::db::DbConn) {
        let db = ProgressDb::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();
        progress::ensure_user(&mut conn, "reader-1").unwrap();
        (db, conn)
    }

    #[test]
    fn test_no_badges_for_fresh_user() {
        let (_db, mut conn) = setup();
        assert!(evaluate(&mut conn, "reader-1").unwrap().is_empty());
    }

    #[test]
    fn test_active_reader_unlock_and_idempotence() {
        let (_db, mut conn) = setup();
        for _ in 0..10 {
            progress::record_article_read(&mut conn, "reader-1").unwrap();
        }

        let unlocked = evaluate(&mut conn, "reader-1").unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].code, badge_codes::ACTIVE_READER);

        // Unchanged stats: second evaluation grants nothing.
        assert!(evaluate(&mut conn, "reader-1").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_grant_is_noop() {
        let (_db, mut conn) = setup();
        assert!(grant(&mut conn, "reader-1", badge_codes::SPEED_READER).unwrap());
        assert!(!grant(&mut conn, "reader-1", badge_codes::SPEED_READER).unwrap());

        let codes = granted_codes(&mut conn, "reader-1").unwrap();
        assert_eq!(codes.len(), 1);
    }

    #[test]
    fn test_skill_threshold_badges() {
        let (_db, mut conn) = setup();
        let deltas = skills::SkillDeltas {
            reading_speed: Some(85.0),
            critical_analysis: Some(95.0),
            ..Default::default()
        };
        skills::apply_deltas(&mut conn, "reader-1", &deltas).unwrap();

        let mut codes: Vec<String> = evaluate(&mut conn, "reader-1")
            .unwrap()
            .into_iter()
            .map(|b| b.code)
            .collect();
        codes.sort();
        assert_eq!(
            codes,
            vec![
                badge_codes::ANALYST_PRO.to_string(),
                badge_codes::SPEED_READER.to_string(),
            ]
        );
    }

    #[test]
    fn test_badges_with_status() {
        let (_db, mut conn) = setup();
        grant(&mut conn, "reader-1", badge_codes::SEVEN_DAY_STREAK).unwrap();

        let statuses = badges_with_status(&mut conn, "reader-1").unwrap();
        assert_eq!(statuses.len(), CATALOG.len());
        let earned: Vec<_> = statuses.iter().filter(|s| s.earned).collect();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].badge.code, badge_codes::SEVEN_DAY_STREAK);
        assert!(earned[0].granted_at.is_some());
    }
}
