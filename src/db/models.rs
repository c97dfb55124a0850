//! Diesel model definitions for database tables
//!
//! - Queryable structs: for SELECT queries (reading data)
//! - Insertable structs: for INSERT queries (writing data)
//!
//! SQLite stores timestamps as ISO-8601 TEXT and calendar dates as
//! `YYYY-MM-DD` TEXT; the helpers below keep both formats in one place.

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::*;

// ============================================================================
// Timestamp Helpers
// ============================================================================

/// Current UTC timestamp as ISO 8601 string for SQLite TEXT columns
pub fn current_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Current UTC calendar date as `YYYY-MM-DD` string
pub fn current_date() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Format a date for a SQLite TEXT column
pub fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` TEXT column back into a date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// ============================================================================
// User Progress Models
// ============================================================================

/// Per-user progress row: XP, level, streak, activity counters and the
/// derived literacy score.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = user_progress)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserProgress {
    pub user_id: String,
    pub xp: i32,
    pub level: i32,
    pub streak: i32,
    pub last_activity_date: Option<String>,
    pub articles_read: i32,
    pub quizzes_completed: i32,
    pub events_attended: i32,
    pub reading_minutes: i32,
    pub literacy_score: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// New progress row for INSERT (DB defaults handle counters/scores)
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_progress)]
pub struct NewUserProgress<'a> {
    pub user_id: &'a str,
}

// ============================================================================
// Skill Profile Models
// ============================================================================

/// Five literacy sub-scores, each held to [0, 100].
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = skill_profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SkillProfile {
    pub user_id: String,
    pub comprehension: f32,
    pub reading_speed: f32,
    pub critical_analysis: f32,
    pub fact_checking: f32,
    pub summary_writing: f32,
    pub updated_at: String,
}

impl SkillProfile {
    /// Sum of the five sub-scores (literacy score numerator).
    pub fn total(&self) -> f32 {
        self.comprehension
            + self.reading_speed
            + self.critical_analysis
            + self.fact_checking
            + self.summary_writing
    }
}

/// New skill profile for INSERT (DB defaults zero every score)
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = skill_profiles)]
pub struct NewSkillProfile<'a> {
    pub user_id: &'a str,
}

// ============================================================================
// Badge Models
// ============================================================================

/// Badge catalog row (read-only reference data, seeded at init)
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = badges)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Badge {
    pub code: String,
    pub name: String,
    pub icon: String,
}

/// New catalog row for the seed pass
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = badges)]
pub struct NewBadge<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub icon: &'a str,
}

/// Badge grant row - append-only, unique per (user, badge)
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = user_badges)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserBadge {
    pub user_id: String,
    pub badge_code: String,
    pub granted_at: String,
}

/// New grant for INSERT (via insert_or_ignore)
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_badges)]
pub struct NewUserBadge<'a> {
    pub user_id: &'a str,
    pub badge_code: &'a str,
    pub granted_at: &'a str,
}

/// Catalog entry with the caller's earned state (API response)
#[derive(Debug, Clone, Serialize)]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: Badge,
    pub earned: bool,
    pub granted_at: Option<String>,
}

// ============================================================================
// Quiz Result Models
// ============================================================================

/// One recorded quiz attempt
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = quiz_results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuizResult {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub completed_at: String,
}

/// New quiz result for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = quiz_results)]
pub struct NewQuizResult<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub quiz_id: &'a str,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub completed_at: &'a str,
}

// ============================================================================
// Reading History Models
// ============================================================================

/// One (user, article) read record; re-reads refresh `read_at`
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = reading_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReadingRecord {
    pub user_id: String,
    pub article_id: String,
    pub read_at: String,
}

/// New read record for upsert
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reading_history)]
pub struct NewReadingRecord<'a> {
    pub user_id: &'a str,
    pub article_id: &'a str,
    pub read_at: &'a str,
}

// ============================================================================
// Weekly Target Models
// ============================================================================

/// Weekly target row: admin-declared goals plus the user's counter
/// snapshot at creation time. The baseline is immutable; progress is
/// measured relative to it, not to lifetime totals.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = weekly_targets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WeeklyTarget {
    pub id: String,
    pub user_id: String,
    pub created_by: Option<String>,
    pub period_start: String,
    pub period_end: String,
    pub target_articles: i32,
    pub target_minutes: i32,
    pub target_quizzes: i32,
    pub baseline_articles: i32,
    pub baseline_minutes: i32,
    pub baseline_quizzes: i32,
    pub status: String,
    pub created_at: String,
}

/// New weekly target for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = weekly_targets)]
pub struct NewWeeklyTarget<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub created_by: Option<&'a str>,
    pub period_start: &'a str,
    pub period_end: &'a str,
    pub target_articles: i32,
    pub target_minutes: i32,
    pub target_quizzes: i32,
    pub baseline_articles: i32,
    pub baseline_minutes: i32,
    pub baseline_quizzes: i32,
    pub status: &'a str,
}

// ============================================================================
// Difficulty Constants
// ============================================================================

/// Content difficulty levels and their score multipliers
pub mod difficulty {
    use crate::error::ProgressError;

    pub const EASY: &str = "easy";
    pub const MEDIUM: &str = "medium";
    pub const HARD: &str = "hard";

    /// All difficulty levels in order
    pub const ALL: [&str; 3] = [EASY, MEDIUM, HARD];

    /// Check if a difficulty level is valid
    pub fn is_valid(diff: &str) -> bool {
        ALL.contains(&diff)
    }

    /// Multiplier for quiz XP and quiz skill increments
    pub fn xp_multiplier(diff: &str) -> Result<f64, ProgressError> {
        match diff {
            EASY => Ok(1.0),
            MEDIUM => Ok(1.5),
            HARD => Ok(2.0),
            other => Err(ProgressError::InvalidInput(format!(
                "Invalid difficulty: {}. Valid levels: {:?}",
                other, ALL
            ))),
        }
    }

    /// Multiplier for the summary-writing increment on authored articles
    pub fn authoring_multiplier(diff: &str) -> Result<f64, ProgressError> {
        match diff {
            EASY => Ok(1.0),
            MEDIUM => Ok(1.2),
            HARD => Ok(1.5),
            other => Err(ProgressError::InvalidInput(format!(
                "Invalid difficulty: {}. Valid levels: {:?}",
                other, ALL
            ))),
        }
    }
}

// ============================================================================
// Weekly Activity Kind Constants
// ============================================================================

/// Progress-update kinds accepted by the weekly target engine
pub mod activity_kinds {
    pub const ARTICLE: &str = "article";
    pub const MINUTES: &str = "minutes";
    pub const QUIZ: &str = "quiz";

    pub const ALL: [&str; 3] = [ARTICLE, MINUTES, QUIZ];

    pub fn is_valid(kind: &str) -> bool {
        ALL.contains(&kind)
    }
}

// ============================================================================
// Target Status Constants
// ============================================================================

/// Weekly target lifecycle states
pub mod target_status {
    pub const ACTIVE: &str = "active";
    pub const COMPLETED: &str = "completed";

    pub const ALL: [&str; 2] = [ACTIVE, COMPLETED];

    pub fn is_valid(status: &str) -> bool {
        ALL.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_round_trip() {
        let date = parse_date("2025-06-02").unwrap();
        assert_eq!(date_string(date), "2025-06-02");
        assert!(parse_date("junk").is_none());
    }

    #[test]
    fn test_difficulty_multipliers() {
        assert_eq!(difficulty::xp_multiplier(difficulty::MEDIUM).unwrap(), 1.5);
        assert_eq!(difficulty::authoring_multiplier(difficulty::MEDIUM).unwrap(), 1.2);
        assert!(difficulty::xp_multiplier("extreme").is_err());
        assert!(difficulty::is_valid(difficulty::HARD));
        assert!(!difficulty::is_valid("extreme"));
    }
}
