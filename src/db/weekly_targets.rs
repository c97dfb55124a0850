//! Weekly target rows and period-relative progress
//!
//! Each admin-declared period fans out one row per user, snapshotting
//! that user's counters as the baseline. Progress is measured as the
//! delta from the baseline, never lifetime totals, and the baseline is
//! immutable after creation. Completion flips the status exactly once
//! and never reverts.

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Serialize;

use super::models::{date_string, target_status, UserProgress, WeeklyTarget};
use super::schema::weekly_targets;
use crate::error::ProgressError;

// ============================================================================
// Computed Types
// ============================================================================

/// Period-relative progress against one weekly target
#[derive(Debug, Clone, Serialize)]
pub struct TargetProgress {
    pub articles_read: i32,
    pub minutes_read: i32,
    pub quizzes_completed: i32,
    pub articles_pct: f64,
    pub minutes_pct: f64,
    pub quizzes_pct: f64,
    /// Average of the three per-metric percentages, capped at 100.
    /// Display only - completion is decided per metric.
    pub completion_percentage: f64,
    pub is_completed: bool,
}

/// Target plus its computed progress (API response)
#[derive(Debug, Clone, Serialize)]
pub struct TargetWithProgress {
    pub target: WeeklyTarget,
    pub progress: TargetProgress,
}

/// One admin period across all users
#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub period_start: String,
    pub period_end: String,
    pub target_articles: i32,
    pub target_minutes: i32,
    pub target_quizzes: i32,
    pub created_by: Option<String>,
    pub user_count: usize,
}

// ============================================================================
// Progress Computation
// ============================================================================

/// Compute period-relative progress for a target
///
/// Deltas clamp at zero, per-metric percentages cap at 100 and a zero
/// target contributes 0%. Completion requires every metric to meet its
/// target individually; the averaged percentage is informational.
pub fn compute_progress(target: &WeeklyTarget, row: &UserProgress) -> TargetProgress {
    let articles = (row.articles_read - target.baseline_articles).max(0);
    let minutes = (row.reading_minutes - target.baseline_minutes).max(0);
    let quizzes = (row.quizzes_completed - target.baseline_quizzes).max(0);

    let pct = |delta: i32, goal: i32| -> f64 {
        if goal <= 0 {
            return 0.0;
        }
        (delta as f64 / goal as f64 * 100.0).min(100.0)
    };

    let articles_pct = pct(articles, target.target_articles);
    let minutes_pct = pct(minutes, target.target_minutes);
    let quizzes_pct = pct(quizzes, target.target_quizzes);

    let all_met = articles >= target.target_articles
        && minutes >= target.target_minutes
        && quizzes >= target.target_quizzes;

    TargetProgress {
        articles_read: articles,
        minutes_read: minutes,
        quizzes_completed: quizzes,
        articles_pct,
        minutes_pct,
        quizzes_pct,
        completion_percentage: (articles_pct + minutes_pct + quizzes_pct) / 3.0,
        is_completed: all_met || target.status == target_status::COMPLETED,
    }
}

// ============================================================================
// Read Operations
// ============================================================================

/// Does any target row exist for the exact (start, end) pair?
pub fn period_exists(
    conn: &mut SqliteConnection,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<bool, ProgressError> {
    let count: i64 = weekly_targets::table
        .filter(weekly_targets::period_start.eq(date_string(period_start)))
        .filter(weekly_targets::period_end.eq(date_string(period_end)))
        .count()
        .get_result(conn)
        .map_err(|e| ProgressError::Internal(format!("Count query failed: {}", e)))?;
    Ok(count > 0)
}

/// The target for a user whose period covers `today` (inclusive both
/// ends), newest period first. Completed targets still match so the
/// user keeps seeing their finished week.
pub fn current_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<WeeklyTarget>, ProgressError> {
    let today = date_string(today);
    weekly_targets::table
        .filter(weekly_targets::user_id.eq(user_id))
        .filter(weekly_targets::period_start.le(&today))
        .filter(weekly_targets::period_end.ge(&today))
        .order(weekly_targets::period_start.desc())
        .first(conn)
        .optional()
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

/// Get a target row by id
pub fn get_target(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<WeeklyTarget>, ProgressError> {
    weekly_targets::table
        .filter(weekly_targets::id.eq(id))
        .first(conn)
        .optional()
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

/// Past and present targets for a user, newest period first
pub fn history_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    limit: i64,
) -> Result<Vec<WeeklyTarget>, ProgressError> {
    weekly_targets::table
        .filter(weekly_targets::user_id.eq(user_id))
        .order(weekly_targets::period_start.desc())
        .limit(limit)
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

/// All declared periods, folded across users, newest first
pub fn list_periods(conn: &mut SqliteConnection) -> Result<Vec<PeriodSummary>, ProgressError> {
    let rows: Vec<WeeklyTarget> = weekly_targets::table
        .order(weekly_targets::period_start.desc())
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))?;

    let mut periods: Vec<PeriodSummary> = Vec::new();
    for row in rows {
        match periods
            .iter_mut()
            .find(|p| p.period_start == row.period_start && p.period_end == row.period_end)
        {
            Some(period) => period.user_count += 1,
            None => periods.push(PeriodSummary {
                period_start: row.period_start,
                period_end: row.period_end,
                target_articles: row.target_articles,
                target_minutes: row.target_minutes,
                target_quizzes: row.target_quizzes,
                created_by: row.created_by,
                user_count: 1,
            }),
        }
    }
    Ok(periods)
}

// ============================================================================
// Write Operations
// ============================================================================

/// Insert one fanned-out target row
pub fn insert_target(
    conn: &mut SqliteConnection,
    row: &super::models::NewWeeklyTarget<'_>,
) -> Result<(), ProgressError> {
    diesel::insert_into(weekly_targets::table)
        .values(row)
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Insert failed: {}", e)))?;
    Ok(())
}

/// Flip an active target to completed
///
/// The filter on current status makes the transition one-way: a
/// completed target is never touched again.
pub fn mark_completed(conn: &mut SqliteConnection, id: &str) -> Result<bool, ProgressError> {
    let updated = diesel::update(
        weekly_targets::table
            .filter(weekly_targets::id.eq(id))
            .filter(weekly_targets::status.eq(target_status::ACTIVE)),
    )
    .set(weekly_targets::status.eq(target_status::COMPLETED))
    .execute(conn)
    .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;

    Ok(updated > 0)
}

/// Remove every row of a declared period (admin operation)
pub fn delete_period(
    conn: &mut SqliteConnection,
    period_start: NaiveDate,
) -> Result<usize, ProgressError> {
    diesel::delete(
        weekly_targets::table.filter(weekly_targets::period_start.eq(date_string(period_start))),
    )
    .execute(conn)
    .map_err(|e| ProgressError::Internal(format!("Delete failed: {}", e)))
}
