//! Consecutive-day streak tracking
//!
//! All calendar-day math uses UTC dates. The persisted
//! `last_activity_date` is a `YYYY-MM-DD` UTC string; callers pass
//! `NaiveDate`s obtained from `Utc::now().date_naive()` so the policy
//! is applied in one place.

use chrono::NaiveDate;

/// Outcome of a streak touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Activity on the same calendar day; counter unchanged.
    SameDay,
    /// Activity exactly one day after the last; counter incremented.
    Extended,
    /// Gap of more than one day (or first activity ever); counter
    /// restarts at 1 - the new activity counts as day one.
    Reset,
}

/// Compute the next streak value for an activity on `today`.
pub fn next_streak(
    current: i32,
    last_activity: Option<NaiveDate>,
    today: NaiveDate,
) -> (i32, StreakChange) {
    let last = match last_activity {
        Some(d) => d,
        None => return (1, StreakChange::Reset),
    };

    let gap = (today - last).num_days();
    if gap <= 0 {
        // Same day; negative gaps (clock skew) are treated the same
        // rather than punishing the user.
        (current, StreakChange::SameDay)
    } else if gap == 1 {
        (current + 1, StreakChange::Extended)
    } else {
        (1, StreakChange::Reset)
    }
}
