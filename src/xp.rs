//! XP and level calculations
//!
//! Levels follow a triangular progression: going from level N to N+1
//! costs `N * 100` XP, so the cumulative XP needed to reach level L is
//! `100 * (L-1) * L / 2`. Level 1 is the floor; XP never decreases.

use serde::Serialize;

use crate::db::models::difficulty;
use crate::error::ProgressError;

/// Result of an XP award, reported back to the caller.
///
/// `leveled_up` is informational only; no other state depends on it.
#[derive(Debug, Clone, Serialize)]
pub struct XpAward {
    pub amount: i32,
    pub total_xp: i32,
    pub level: i32,
    pub leveled_up: bool,
}

/// Cumulative XP required to reach `level`.
pub fn cumulative_xp(level: i32) -> i64 {
    if level <= 1 {
        return 0;
    }
    let l = level as i64;
    100 * (l - 1) * l / 2
}

/// Largest level whose cumulative requirement fits within `xp`.
pub fn compute_level(xp: i32) -> i32 {
    let xp = xp.max(0) as i64;
    let mut level = 1;
    while cumulative_xp(level + 1) <= xp {
        level += 1;
    }
    level
}

/// XP still needed from `xp` to reach the next level.
pub fn xp_to_next_level(xp: i32) -> i32 {
    let level = compute_level(xp);
    (cumulative_xp(level + 1) - xp.max(0) as i64) as i32
}

/// XP earned for a quiz submission.
///
/// `correct = round(score/100 * total_questions)`, then
/// `round(correct * 10 * difficulty multiplier)`.
pub fn quiz_xp(score: i32, total_questions: i32, diff: &str) -> Result<i32, ProgressError> {
    let multiplier = difficulty::xp_multiplier(diff)?;
    let correct = (score as f64 / 100.0 * total_questions as f64).round();
    Ok((correct * 10.0 * multiplier).round() as i32)
}
