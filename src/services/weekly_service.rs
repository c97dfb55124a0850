//! Weekly target engine
//!
//! Admins declare a period with three goals; creation fans out one row
//! per known user inside a single transaction, snapshotting each
//! user's counters as the baseline. All progress reads recheck
//! completion first, so a target flips to completed on the next touch
//! after the goals are met.

use std::sync::Arc;

use chrono::NaiveDate;
use diesel::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use super::events::{EventBus, ProgressEvent};
use crate::db::models::{
    activity_kinds, current_date, date_string, target_status, NewWeeklyTarget,
};
use crate::db::weekly_targets::{self, PeriodSummary, TargetWithProgress};
use crate::db::{progress, ProgressDb, WeeklyTarget};
use crate::error::ProgressError;

/// Goals for one declared period, shared by every fanned-out row
#[derive(Debug, Clone, Copy)]
pub struct TargetGoals {
    pub articles: i32,
    pub minutes: i32,
    pub quizzes: i32,
}

/// Service for declaring periods and reporting period-relative progress
pub struct WeeklyTargetService {
    db: Arc<ProgressDb>,
    events: Arc<EventBus>,
}

impl WeeklyTargetService {
    pub fn new(db: Arc<ProgressDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    /// Declare a period and fan out one target row per known user
    ///
    /// Returns the number of rows created. The whole fan-out is one
    /// transaction: either every user gets a target or none do.
    pub fn create_period(
        &self,
        admin_id: Option<&str>,
        period_start: NaiveDate,
        period_end: NaiveDate,
        goals: TargetGoals,
    ) -> Result<usize, ProgressError> {
        if period_start > period_end {
            return Err(ProgressError::InvalidInput(format!(
                "Period start {} is after end {}",
                period_start, period_end
            )));
        }
        if goals.articles < 0 || goals.minutes < 0 || goals.quizzes < 0 {
            return Err(ProgressError::InvalidInput(
                "Targets must be non-negative".into(),
            ));
        }

        let start = date_string(period_start);
        let end = date_string(period_end);

        let mut conn = self.db.conn()?;
        let user_count = conn.transaction(|conn| {
            if weekly_targets::period_exists(conn, period_start, period_end)? {
                return Err(ProgressError::DuplicatePeriod(format!(
                    "{} to {}",
                    start, end
                )));
            }

            let user_ids = progress::all_user_ids(conn)?;
            for user_id in &user_ids {
                let row = progress::require_progress(conn, user_id)?;
                let id = Uuid::new_v4().to_string();
                let target = NewWeeklyTarget {
                    id: &id,
                    user_id,
                    created_by: admin_id,
                    period_start: &start,
                    period_end: &end,
                    target_articles: goals.articles,
                    target_minutes: goals.minutes,
                    target_quizzes: goals.quizzes,
                    baseline_articles: row.articles_read,
                    baseline_minutes: row.reading_minutes,
                    baseline_quizzes: row.quizzes_completed,
                    status: target_status::ACTIVE,
                };
                weekly_targets::insert_target(conn, &target)?;
            }
            Ok(user_ids.len())
        })?;

        info!(start = %start, end = %end, users = %user_count, "Weekly period created");
        self.events.emit(ProgressEvent::PeriodCreated {
            period_start: start,
            period_end: end,
            user_count,
        });
        Ok(user_count)
    }

    /// The user's target covering today, with computed progress
    pub fn current_target(&self, user_id: &str) -> Result<Option<TargetWithProgress>, ProgressError> {
        self.current_target_on(user_id, current_date())
    }

    /// Date-injected variant of [`current_target`](Self::current_target)
    pub fn current_target_on(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Option<TargetWithProgress>, ProgressError> {
        let mut conn = self.db.conn()?;
        let (view, completed) =
            conn.transaction(|conn| current_view(conn, user_id, today))?;
        self.emit_completed(user_id, completed);
        Ok(view)
    }

    /// Apply an explicit progress update against the current period
    ///
    /// Bumps the matching lifetime counter (article +1, minutes +value,
    /// quiz +1), then recomputes progress. Returns None when no period
    /// covers today; the counter bump still sticks.
    pub fn record_period_activity(
        &self,
        user_id: &str,
        kind: &str,
        value: i32,
    ) -> Result<Option<TargetWithProgress>, ProgressError> {
        self.record_period_activity_on(user_id, kind, value, current_date())
    }

    /// Date-injected variant of
    /// [`record_period_activity`](Self::record_period_activity)
    pub fn record_period_activity_on(
        &self,
        user_id: &str,
        kind: &str,
        value: i32,
        today: NaiveDate,
    ) -> Result<Option<TargetWithProgress>, ProgressError> {
        if !activity_kinds::is_valid(kind) {
            return Err(ProgressError::InvalidActivityType(format!(
                "{}. Valid kinds: {:?}",
                kind,
                activity_kinds::ALL
            )));
        }

        let mut conn = self.db.conn()?;
        let (view, completed) = conn.transaction(|conn| {
            match kind {
                activity_kinds::ARTICLE => progress::record_article_read(conn, user_id)?,
                activity_kinds::MINUTES => progress::add_reading_minutes(conn, user_id, value)?,
                activity_kinds::QUIZ => progress::record_quiz_completed(conn, user_id)?,
                _ => unreachable!("kind validated above"),
            }
            current_view(conn, user_id, today)
        })?;

        self.emit_completed(user_id, completed);
        Ok(view)
    }

    /// Past and present targets with computed progress, newest first
    pub fn progress_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<TargetWithProgress>, ProgressError> {
        let mut conn = self.db.conn()?;
        let row = progress::require_progress(&mut conn, user_id)?;
        let targets = weekly_targets::history_for_user(&mut conn, user_id, limit)?;

        Ok(targets
            .into_iter()
            .map(|target| {
                let progress = weekly_targets::compute_progress(&target, &row);
                TargetWithProgress { target, progress }
            })
            .collect())
    }

    /// All declared periods, folded across users (admin view)
    pub fn list_periods(&self) -> Result<Vec<PeriodSummary>, ProgressError> {
        let mut conn = self.db.conn()?;
        weekly_targets::list_periods(&mut conn)
    }

    /// Remove every row of a declared period (admin operation)
    pub fn delete_period(&self, period_start: NaiveDate) -> Result<usize, ProgressError> {
        let mut conn = self.db.conn()?;
        let removed = weekly_targets::delete_period(&mut conn, period_start)?;

        info!(start = %period_start, removed = %removed, "Weekly period deleted");
        self.events.emit(ProgressEvent::PeriodDeleted {
            period_start: date_string(period_start),
            removed,
        });
        Ok(removed)
    }

    fn emit_completed(&self, user_id: &str, completed: Option<WeeklyTarget>) {
        if let Some(target) = completed {
            self.events.emit(ProgressEvent::TargetCompleted {
                user_id: user_id.to_string(),
                target_id: target.id,
                period_start: target.period_start,
            });
        }
    }
}

/// Flip the current target to completed when its goals are all met
///
/// Returns the target that just flipped, for event emission after
/// commit. Runs inside the caller's transaction; the activity
/// dispatcher calls this after every counter mutation.
pub(crate) fn refresh_completion(
    conn: &mut SqliteConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<WeeklyTarget>, ProgressError> {
    let target = match weekly_targets::current_for_user(conn, user_id, today)? {
        Some(t) if t.status == target_status::ACTIVE => t,
        _ => return Ok(None),
    };

    let row = progress::require_progress(conn, user_id)?;
    let computed = weekly_targets::compute_progress(&target, &row);
    if computed.is_completed && weekly_targets::mark_completed(conn, &target.id)? {
        debug!(user = %user_id, period = %target.period_start, "Weekly target completed");
        return Ok(Some(target));
    }
    Ok(None)
}

/// Completion-refreshed view of the current target
fn current_view(
    conn: &mut SqliteConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<(Option<TargetWithProgress>, Option<WeeklyTarget>), ProgressError> {
    let completed = refresh_completion(conn, user_id, today)?;

    let target = match weekly_targets::current_for_user(conn, user_id, today)? {
        Some(t) => t,
        None => return Ok((None, completed)),
    };
    let row = progress::require_progress(conn, user_id)?;
    let progress = weekly_targets::compute_progress(&target, &row);
    Ok((Some(TargetWithProgress { target, progress }), completed))
}
