//! Activity dispatcher: one transaction per reported activity
//!
//! Each report reads current state, applies every side effect (counters,
//! skills, XP, streak, badge grants, weekly completion) and commits as a
//! unit; a failure anywhere rolls the whole activity back. Events are
//! emitted only after the transaction commits.

use std::sync::Arc;

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::events::{EventBus, ProgressEvent};
use super::weekly_service;
use crate::db::models::current_date;
use crate::db::{badge_grants, progress, quiz_results, reading_history, skills};
use crate::db::{Badge, ProgressDb, UserProgress};
use crate::error::ProgressError;
use crate::streak::StreakChange;
use crate::xp::{self, XpAward};

/// Side effects of one reported activity
#[derive(Debug, Clone, Serialize)]
pub struct ActivityOutcome {
    /// Progress row after the activity committed
    pub progress: UserProgress,
    /// Badges unlocked by this activity
    pub new_badges: Vec<Badge>,
    /// XP outcome, present for XP-bearing activities (quizzes)
    pub xp: Option<XpAward>,
}

/// Service for reporting user activities
pub struct ActivityService {
    db: Arc<ProgressDb>,
    events: Arc<EventBus>,
}

impl ActivityService {
    pub fn new(db: Arc<ProgressDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    /// Report a completed article read
    ///
    /// Logs the (user, article) pair, bumps the read counter, grants
    /// the comprehension / reading-speed increments, touches the streak
    /// and re-evaluates badges.
    pub fn report_article_read(
        &self,
        user_id: &str,
        article_id: &str,
    ) -> Result<ActivityOutcome, ProgressError> {
        self.report_article_read_on(user_id, article_id, current_date())
    }

    /// Date-injected variant of
    /// [`report_article_read`](Self::report_article_read)
    pub fn report_article_read_on(
        &self,
        user_id: &str,
        article_id: &str,
        today: NaiveDate,
    ) -> Result<ActivityOutcome, ProgressError> {
        let mut conn = self.db.conn()?;
        let (outcome, pending) = conn.transaction::<_, ProgressError, _>(|conn| {
            reading_history::record_read(conn, user_id, article_id)?;
            progress::record_article_read(conn, user_id)?;
            skills::apply_deltas(conn, user_id, &skills::SkillDeltas::article_read())?;
            let (streak, change) = progress::touch_streak(conn, user_id, today)?;
            let new_badges = badge_grants::evaluate(conn, user_id)?;
            let completed = weekly_service::refresh_completion(conn, user_id, today)?;
            let row = progress::require_progress(conn, user_id)?;

            let mut pending = Vec::new();
            push_streak_event(&mut pending, user_id, streak, change);
            push_badge_events(&mut pending, user_id, &new_badges);
            push_completed_event(&mut pending, user_id, completed);

            Ok((
                ActivityOutcome {
                    progress: row,
                    new_badges,
                    xp: None,
                },
                pending,
            ))
        })?;

        debug!(user = %user_id, article = %article_id, "Article read reported");
        self.emit_all(pending);
        Ok(outcome)
    }

    /// Report accumulated reading time in minutes
    pub fn report_reading_time(
        &self,
        user_id: &str,
        minutes: i32,
    ) -> Result<ActivityOutcome, ProgressError> {
        self.report_reading_time_on(user_id, minutes, current_date())
    }

    /// Date-injected variant of
    /// [`report_reading_time`](Self::report_reading_time)
    pub fn report_reading_time_on(
        &self,
        user_id: &str,
        minutes: i32,
        today: NaiveDate,
    ) -> Result<ActivityOutcome, ProgressError> {
        let mut conn = self.db.conn()?;
        let (outcome, pending) = conn.transaction::<_, ProgressError, _>(|conn| {
            progress::add_reading_minutes(conn, user_id, minutes)?;
            let completed = weekly_service::refresh_completion(conn, user_id, today)?;
            let row = progress::require_progress(conn, user_id)?;

            let mut pending = Vec::new();
            push_completed_event(&mut pending, user_id, completed);

            Ok((
                ActivityOutcome {
                    progress: row,
                    new_badges: Vec::new(),
                    xp: None,
                },
                pending,
            ))
        })?;

        debug!(user = %user_id, minutes = %minutes, "Reading time reported");
        self.emit_all(pending);
        Ok(outcome)
    }

    /// Report an article authored by the user
    ///
    /// Grants the summary-writing increment scaled by length and
    /// difficulty; authoring does not touch counters or the streak.
    pub fn report_article_authored(
        &self,
        user_id: &str,
        article_id: &str,
        word_count: i32,
        difficulty: &str,
    ) -> Result<ActivityOutcome, ProgressError> {
        if word_count < 0 {
            return Err(ProgressError::InvalidInput(
                "Word count must be non-negative".into(),
            ));
        }
        let deltas = skills::SkillDeltas::article_authored(word_count, difficulty)?;

        let mut conn = self.db.conn()?;
        let (outcome, pending) = conn.transaction::<_, ProgressError, _>(|conn| {
            skills::apply_deltas(conn, user_id, &deltas)?;
            let new_badges = badge_grants::evaluate(conn, user_id)?;
            let row = progress::require_progress(conn, user_id)?;

            let mut pending = Vec::new();
            push_badge_events(&mut pending, user_id, &new_badges);

            Ok((
                ActivityOutcome {
                    progress: row,
                    new_badges,
                    xp: None,
                },
                pending,
            ))
        })?;

        debug!(user = %user_id, article = %article_id, words = %word_count, "Authored article reported");
        self.emit_all(pending);
        Ok(outcome)
    }

    /// Report a submitted quiz
    ///
    /// Always records the attempt and the XP award; skill increments
    /// apply only on the first attempt per quiz so retakes cannot farm
    /// the skill ledger.
    #[allow(clippy::too_many_arguments)]
    pub fn report_quiz_completed(
        &self,
        user_id: &str,
        quiz_id: &str,
        score: i32,
        total_questions: i32,
        difficulty: &str,
        is_first_attempt: bool,
    ) -> Result<ActivityOutcome, ProgressError> {
        self.report_quiz_completed_on(
            user_id,
            quiz_id,
            score,
            total_questions,
            difficulty,
            is_first_attempt,
            current_date(),
        )
    }

    /// Date-injected variant of
    /// [`report_quiz_completed`](Self::report_quiz_completed)
    #[allow(clippy::too_many_arguments)]
    pub fn report_quiz_completed_on(
        &self,
        user_id: &str,
        quiz_id: &str,
        score: i32,
        total_questions: i32,
        difficulty: &str,
        is_first_attempt: bool,
        today: NaiveDate,
    ) -> Result<ActivityOutcome, ProgressError> {
        if !(0..=100).contains(&score) {
            return Err(ProgressError::InvalidInput(format!(
                "Score must be in 0..=100, got {}",
                score
            )));
        }
        if total_questions <= 0 {
            return Err(ProgressError::InvalidInput(
                "Quiz must have at least one question".into(),
            ));
        }

        let xp_amount = xp::quiz_xp(score, total_questions, difficulty)?;
        let correct = (score as f64 / 100.0 * total_questions as f64).round() as i32;
        let deltas = if is_first_attempt {
            Some(skills::SkillDeltas::quiz_completed(score, difficulty)?)
        } else {
            None
        };

        let mut conn = self.db.conn()?;
        let (outcome, pending) = conn.transaction::<_, ProgressError, _>(|conn| {
            quiz_results::record_result(conn, user_id, quiz_id, score, correct, total_questions)?;
            progress::record_quiz_completed(conn, user_id)?;
            let award = progress::award_xp(conn, user_id, xp_amount)?;
            if let Some(deltas) = &deltas {
                skills::apply_deltas(conn, user_id, deltas)?;
            }
            let (streak, change) = progress::touch_streak(conn, user_id, today)?;
            let new_badges = badge_grants::evaluate(conn, user_id)?;
            let completed = weekly_service::refresh_completion(conn, user_id, today)?;
            let row = progress::require_progress(conn, user_id)?;

            let mut pending = Vec::new();
            pending.push(ProgressEvent::XpAwarded {
                user_id: user_id.to_string(),
                amount: award.amount,
                total_xp: award.total_xp,
            });
            if award.leveled_up {
                pending.push(ProgressEvent::LeveledUp {
                    user_id: user_id.to_string(),
                    level: award.level,
                });
            }
            push_streak_event(&mut pending, user_id, streak, change);
            push_badge_events(&mut pending, user_id, &new_badges);
            push_completed_event(&mut pending, user_id, completed);

            Ok((
                ActivityOutcome {
                    progress: row,
                    new_badges,
                    xp: Some(award),
                },
                pending,
            ))
        })?;

        debug!(user = %user_id, quiz = %quiz_id, score = %score, xp = %xp_amount, "Quiz reported");
        self.emit_all(pending);
        Ok(outcome)
    }

    /// Report attendance at a community event
    ///
    /// Attendance counts toward the Event Explorer badge but does not
    /// drive the reading streak.
    pub fn report_event_attended(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<ActivityOutcome, ProgressError> {
        let mut conn = self.db.conn()?;
        let (outcome, pending) = conn.transaction::<_, ProgressError, _>(|conn| {
            progress::record_event_attended(conn, user_id)?;
            let new_badges = badge_grants::evaluate(conn, user_id)?;
            let row = progress::require_progress(conn, user_id)?;

            let mut pending = Vec::new();
            push_badge_events(&mut pending, user_id, &new_badges);

            Ok((
                ActivityOutcome {
                    progress: row,
                    new_badges,
                    xp: None,
                },
                pending,
            ))
        })?;

        debug!(user = %user_id, event = %event_id, "Event attendance reported");
        self.emit_all(pending);
        Ok(outcome)
    }

    fn emit_all(&self, pending: Vec<ProgressEvent>) {
        for event in pending {
            self.events.emit(event);
        }
    }
}

fn push_streak_event(
    pending: &mut Vec<ProgressEvent>,
    user_id: &str,
    streak: i32,
    change: StreakChange,
) {
    if change == StreakChange::SameDay {
        return;
    }
    pending.push(ProgressEvent::StreakChanged {
        user_id: user_id.to_string(),
        streak,
        reset: change == StreakChange::Reset,
    });
}

fn push_badge_events(pending: &mut Vec<ProgressEvent>, user_id: &str, badges: &[Badge]) {
    for badge in badges {
        pending.push(ProgressEvent::BadgeUnlocked {
            user_id: user_id.to_string(),
            badge_code: badge.code.clone(),
            badge_name: badge.name.clone(),
        });
    }
}

fn push_completed_event(
    pending: &mut Vec<ProgressEvent>,
    user_id: &str,
    completed: Option<crate::db::WeeklyTarget>,
) {
    if let Some(target) = completed {
        pending.push(ProgressEvent::TargetCompleted {
            user_id: user_id.to_string(),
            target_id: target.id,
            period_start: target.period_start,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::badge_codes;
    use crate::db::models::difficulty;

    fn setup(users: &[&str]) -> ActivityService {
        let db = Arc::new(ProgressDb::open_in_memory().unwrap());
        {
            let mut conn = db.conn().unwrap();
            for user in users {
                progress::ensure_user(&mut conn, user).unwrap();
            }
        }
        ActivityService::new(db, Arc::new(EventBus::new()))
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_article_read_side_effects() {
        let service = setup(&["reader-1"]);

        let outcome = service
            .report_article_read_on("reader-1", "article-1", d("2025-06-02"))
            .unwrap();
        assert_eq!(outcome.progress.articles_read, 1);
        assert_eq!(outcome.progress.streak, 1);
        assert!(outcome.xp.is_none());

        let mut conn = service.db.conn().unwrap();
        let profile = skills::get_profile(&mut conn, "reader-1").unwrap().unwrap();
        assert_eq!(profile.comprehension, 2.0);
        assert_eq!(profile.reading_speed, 1.5);
        drop(conn);

        // Re-read same day: counter and skills keep granting, streak holds.
        let outcome = service
            .report_article_read_on("reader-1", "article-1", d("2025-06-02"))
            .unwrap();
        assert_eq!(outcome.progress.articles_read, 2);
        assert_eq!(outcome.progress.streak, 1);
    }

    #[test]
    fn test_quiz_levels_up_and_grants_skills() {
        let service = setup(&["reader-1"]);
        {
            let mut conn = service.db.conn().unwrap();
            progress::award_xp(&mut conn, "reader-1", 250).unwrap();
        }

        // 8/10 on hard: +160 XP -> 410 total, level 3.
        let outcome = service
            .report_quiz_completed_on(
                "reader-1",
                "quiz-1",
                80,
                10,
                difficulty::HARD,
                true,
                d("2025-06-02"),
            )
            .unwrap();
        let award = outcome.xp.unwrap();
        assert_eq!(award.amount, 160);
        assert_eq!(award.total_xp, 410);
        assert_eq!(award.level, 3);
        assert!(award.leveled_up);
        assert_eq!(outcome.progress.quizzes_completed, 1);
        assert_eq!(outcome.progress.streak, 1);

        let mut conn = service.db.conn().unwrap();
        let profile = skills::get_profile(&mut conn, "reader-1").unwrap().unwrap();
        // min(3, (1 + 1.6) * 2) = 3
        assert_eq!(profile.critical_analysis, 3.0);
        assert_eq!(profile.fact_checking, 3.0);
    }

    #[test]
    fn test_quiz_retake_skips_skill_deltas() {
        let service = setup(&["reader-1"]);
        service
            .report_quiz_completed_on(
                "reader-1",
                "quiz-1",
                100,
                5,
                difficulty::EASY,
                false,
                d("2025-06-02"),
            )
            .unwrap();

        let mut conn = service.db.conn().unwrap();
        let profile = skills::get_profile(&mut conn, "reader-1").unwrap();
        assert!(
            profile.map(|p| p.critical_analysis == 0.0).unwrap_or(true),
            "Retake must not touch the skill ledger"
        );
        // The attempt itself still counts everywhere else.
        assert_eq!(quiz_results::perfect_quiz_count(&mut conn, "reader-1").unwrap(), 1);
        let row = progress::require_progress(&mut conn, "reader-1").unwrap();
        assert_eq!(row.quizzes_completed, 1);
        assert!(row.xp > 0);
    }

    #[test]
    fn test_oversized_quiz_keeps_xp_monotone() {
        let service = setup(&["reader-1"]);
        let day = d("2025-06-02");

        // A quiz this large saturates the XP formula near the i32
        // ceiling; the follow-up award must not wrap negative.
        let first = service
            .report_quiz_completed_on(
                "reader-1",
                "quiz-1",
                100,
                300_000_000,
                difficulty::HARD,
                true,
                day,
            )
            .unwrap()
            .xp
            .unwrap();
        let second = service
            .report_quiz_completed_on(
                "reader-1",
                "quiz-2",
                100,
                300_000_000,
                difficulty::HARD,
                false,
                day,
            )
            .unwrap()
            .xp
            .unwrap();

        assert!(second.total_xp >= first.total_xp, "XP never decreases");
        assert_eq!(second.total_xp, i32::MAX);
    }

    #[test]
    fn test_quiz_validation() {
        let service = setup(&["reader-1"]);
        assert!(service
            .report_quiz_completed("reader-1", "q", 101, 10, difficulty::EASY, true)
            .is_err());
        assert!(service
            .report_quiz_completed("reader-1", "q", 50, 0, difficulty::EASY, true)
            .is_err());
        assert!(service
            .report_quiz_completed("reader-1", "q", 50, 10, "brutal", true)
            .is_err());
    }

    #[test]
    fn test_event_attendance_does_not_touch_streak() {
        let service = setup(&["reader-1"]);
        let outcome = service.report_event_attended("reader-1", "event-1").unwrap();
        assert_eq!(outcome.progress.events_attended, 1);
        assert_eq!(outcome.progress.streak, 0);
        assert!(outcome.progress.last_activity_date.is_none());
    }

    #[test]
    fn test_authoring_grants_summary_writing() {
        let service = setup(&["writer-1"]);
        let outcome = service
            .report_article_authored("writer-1", "article-9", 250, difficulty::MEDIUM)
            .unwrap();
        assert_eq!(outcome.progress.articles_read, 0);

        let mut conn = service.db.conn().unwrap();
        let profile = skills::get_profile(&mut conn, "writer-1").unwrap().unwrap();
        // min(3, (1 + 1.0) * 1.2) = 2.4
        assert!((profile.summary_writing - 2.4).abs() < 1e-6);

        assert!(service
            .report_article_authored("writer-1", "article-9", -5, difficulty::EASY)
            .is_err());
    }

    #[test]
    fn test_badge_unlock_through_dispatcher() {
        let service = setup(&["reader-1"]);
        let day = d("2025-06-02");
        for i in 0..9 {
            let outcome = service
                .report_article_read_on("reader-1", &format!("article-{}", i), day)
                .unwrap();
            assert!(outcome.new_badges.is_empty());
        }

        let outcome = service
            .report_article_read_on("reader-1", "article-9", day)
            .unwrap();
        assert_eq!(outcome.new_badges.len(), 1);
        assert_eq!(outcome.new_badges[0].code, badge_codes::ACTIVE_READER);
    }

    #[test]
    fn test_unknown_user_rolls_back() {
        let service = setup(&[]);
        let err = service
            .report_article_read_on("ghost", "article-1", d("2025-06-02"))
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotFound(_)));

        // The reading-history upsert from the failed transaction must
        // not survive.
        let mut conn = service.db.conn().unwrap();
        assert!(reading_history::recent_reads(&mut conn, "ghost", 10)
            .unwrap()
            .is_empty());
    }
}
