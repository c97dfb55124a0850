//! Skill ledger: the five literacy sub-scores and the derived
//! literacy score
//!
//! Every mutation clamps the affected skills to [0, 100] and rewrites
//! `user_progress.literacy_score` as the rounded average of all five,
//! inside the caller's transaction. A missing profile row is created
//! with a zero baseline on first write; a missing progress row is the
//! caller's data-integrity problem and surfaces as `NotFound`.

use diesel::prelude::*;

use super::models::{current_timestamp, NewSkillProfile, SkillProfile};
use super::progress;
use super::schema::skill_profiles;
use crate::error::ProgressError;

/// Partial map of skill increments. Unset skills are untouched;
/// negative increments are allowed and clamp at zero.
#[derive(Debug, Clone, Default)]
pub struct SkillDeltas {
    pub comprehension: Option<f32>,
    pub reading_speed: Option<f32>,
    pub critical_analysis: Option<f32>,
    pub fact_checking: Option<f32>,
    pub summary_writing: Option<f32>,
}

impl SkillDeltas {
    /// Deltas for a completed article read: comprehension +2,
    /// reading speed +1.5. Applied on every read - re-reads keep
    /// granting by design.
    pub fn article_read() -> Self {
        Self {
            comprehension: Some(2.0),
            reading_speed: Some(1.5),
            ..Default::default()
        }
    }

    /// Deltas for a first quiz attempt: the same content-dependent
    /// increase on critical analysis and fact checking.
    pub fn quiz_completed(score: i32, diff: &str) -> Result<Self, ProgressError> {
        let delta = quiz_skill_delta(score, diff)?;
        Ok(Self {
            critical_analysis: Some(delta),
            fact_checking: Some(delta),
            ..Default::default()
        })
    }

    /// Delta for an authored article: summary writing only.
    pub fn article_authored(word_count: i32, diff: &str) -> Result<Self, ProgressError> {
        Ok(Self {
            summary_writing: Some(authorship_skill_delta(word_count, diff)?),
            ..Default::default()
        })
    }
}

/// Skill increase for a quiz score: `min(3, (1 + score/100 * 2) * m)`
pub fn quiz_skill_delta(score: i32, diff: &str) -> Result<f32, ProgressError> {
    let m = super::models::difficulty::xp_multiplier(diff)?;
    let base = 1.0 + (score as f64 / 100.0) * 2.0;
    Ok((base * m).min(3.0) as f32)
}

/// Skill increase for an authored article:
/// `min(3, (1 + min(words, 500)/500 * 2) * m)`
pub fn authorship_skill_delta(word_count: i32, diff: &str) -> Result<f32, ProgressError> {
    let m = super::models::difficulty::authoring_multiplier(diff)?;
    let capped = word_count.clamp(0, 500) as f64;
    let base = 1.0 + capped / 500.0 * 2.0;
    Ok((base * m).min(3.0) as f32)
}

/// Get the skill profile for a user
pub fn get_profile(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<SkillProfile>, ProgressError> {
    skill_profiles::table
        .filter(skill_profiles::user_id.eq(user_id))
        .first(conn)
        .optional()
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

/// Create the zero-baseline profile row if absent, returning it
pub fn ensure_profile(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<SkillProfile, ProgressError> {
    let row = NewSkillProfile { user_id };
    diesel::insert_or_ignore_into(skill_profiles::table)
        .values(&row)
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Insert failed: {}", e)))?;

    get_profile(conn, user_id)?
        .ok_or_else(|| ProgressError::Internal("Failed to retrieve created profile".into()))
}

/// Apply skill increments and recompute the literacy score
///
/// Returns the updated profile and the new literacy score.
pub fn apply_deltas(
    conn: &mut SqliteConnection,
    user_id: &str,
    deltas: &SkillDeltas,
) -> Result<(SkillProfile, i32), ProgressError> {
    // The owning progress row must exist before any skill mutation.
    progress::require_progress(conn, user_id)?;

    let current = ensure_profile(conn, user_id)?;

    let apply = |value: f32, delta: Option<f32>| -> f32 {
        (value + delta.unwrap_or(0.0)).clamp(0.0, 100.0)
    };

    let comprehension = apply(current.comprehension, deltas.comprehension);
    let reading_speed = apply(current.reading_speed, deltas.reading_speed);
    let critical_analysis = apply(current.critical_analysis, deltas.critical_analysis);
    let fact_checking = apply(current.fact_checking, deltas.fact_checking);
    let summary_writing = apply(current.summary_writing, deltas.summary_writing);

    diesel::update(skill_profiles::table.filter(skill_profiles::user_id.eq(user_id)))
        .set((
            skill_profiles::comprehension.eq(comprehension),
            skill_profiles::reading_speed.eq(reading_speed),
            skill_profiles::critical_analysis.eq(critical_analysis),
            skill_profiles::fact_checking.eq(fact_checking),
            skill_profiles::summary_writing.eq(summary_writing),
            skill_profiles::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Update failed: {}", e)))?;

    let updated = get_profile(conn, user_id)?
        .ok_or_else(|| ProgressError::Internal("Failed to retrieve updated profile".into()))?;

    let literacy = literacy_score(&updated);
    progress::set_literacy_score(conn, user_id, literacy)?;

    Ok((updated, literacy))
}

/// Rounded average of the five sub-scores
pub fn literacy_score(profile: &SkillProfile) -> i32 {
    (profile.total() as f64 / 5.0).round() as i32
}
