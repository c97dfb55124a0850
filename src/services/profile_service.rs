//! Read views over progress state, plus user provisioning
//!
//! The web layer calls `ensure_user` at signup and the view methods on
//! profile pages. Views never mutate state.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::events::{EventBus, ProgressEvent};
use crate::db::{badge_grants, progress, reading_history, skills};
use crate::db::{BadgeStatus, ProgressDb, ReadingRecord, UserProgress};
use crate::error::ProgressError;
use crate::xp;

/// Profile header: XP, level, streak and lifetime counters
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub xp: i32,
    pub level: i32,
    pub xp_to_next_level: i32,
    pub streak: i32,
    pub last_activity_date: Option<String>,
    pub literacy_score: i32,
    pub articles_read: i32,
    pub quizzes_completed: i32,
    pub events_attended: i32,
    pub reading_minutes: i32,
}

/// The five named sub-scores plus the derived literacy score
#[derive(Debug, Clone, Serialize)]
pub struct SkillBreakdown {
    pub comprehension: f32,
    pub reading_speed: f32,
    pub critical_analysis: f32,
    pub fact_checking: f32,
    pub summary_writing: f32,
    pub literacy_score: i32,
}

/// Service for profile reads and user provisioning
pub struct ProfileService {
    db: Arc<ProgressDb>,
    events: Arc<EventBus>,
}

impl ProfileService {
    pub fn new(db: Arc<ProgressDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    /// Create the zeroed progress and skill rows for a new user
    ///
    /// Idempotent; existing rows are left untouched.
    pub fn ensure_user(&self, user_id: &str) -> Result<UserProgress, ProgressError> {
        let mut conn = self.db.conn()?;
        let existed = progress::get_progress(&mut conn, user_id)?.is_some();
        let row = progress::ensure_user(&mut conn, user_id)?;
        skills::ensure_profile(&mut conn, user_id)?;

        if !existed {
            info!(user = %user_id, "User registered");
            self.events.emit(ProgressEvent::UserRegistered {
                user_id: user_id.to_string(),
            });
        }
        Ok(row)
    }

    /// Profile header for a user
    pub fn profile_summary(&self, user_id: &str) -> Result<ProfileSummary, ProgressError> {
        let mut conn = self.db.conn()?;
        let row = progress::require_progress(&mut conn, user_id)?;

        Ok(ProfileSummary {
            xp_to_next_level: xp::xp_to_next_level(row.xp),
            user_id: row.user_id,
            xp: row.xp,
            level: row.level,
            streak: row.streak,
            last_activity_date: row.last_activity_date,
            literacy_score: row.literacy_score,
            articles_read: row.articles_read,
            quizzes_completed: row.quizzes_completed,
            events_attended: row.events_attended,
            reading_minutes: row.reading_minutes,
        })
    }

    /// The five skill scores; all zeros until the first skill mutation
    pub fn skill_breakdown(&self, user_id: &str) -> Result<SkillBreakdown, ProgressError> {
        let mut conn = self.db.conn()?;
        let row = progress::require_progress(&mut conn, user_id)?;

        Ok(match skills::get_profile(&mut conn, user_id)? {
            Some(p) => SkillBreakdown {
                comprehension: p.comprehension,
                reading_speed: p.reading_speed,
                critical_analysis: p.critical_analysis,
                fact_checking: p.fact_checking,
                summary_writing: p.summary_writing,
                literacy_score: row.literacy_score,
            },
            None => SkillBreakdown {
                comprehension: 0.0,
                reading_speed: 0.0,
                critical_analysis: 0.0,
                fact_checking: 0.0,
                summary_writing: 0.0,
                literacy_score: 0,
            },
        })
    }

    /// Full badge catalog with the user's earned state
    pub fn badges(&self, user_id: &str) -> Result<Vec<BadgeStatus>, ProgressError> {
        let mut conn = self.db.conn()?;
        badge_grants::badges_with_status(&mut conn, user_id)
    }

    /// Most recently read articles, newest first
    pub fn recent_reads(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ReadingRecord>, ProgressError> {
        let mut conn = self.db.conn()?;
        reading_history::recent_reads(&mut conn, user_id, limit)
    }
}
