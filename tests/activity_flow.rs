//! End-to-end flows through the service layer: a reader's activities
//! drive XP, streaks, skills, badges and weekly targets as one unit.

use std::sync::Arc;

use chrono::NaiveDate;

use literacy_progress::badges::badge_codes;
use literacy_progress::db::models::difficulty;
use literacy_progress::db::ProgressDb;
use literacy_progress::services::{ProgressEvent, Services, TargetGoals};

fn setup() -> Services {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let db = Arc::new(ProgressDb::open_in_memory().unwrap());
    Services::new(db)
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn reader_journey_xp_and_levels() {
    let services = setup();
    services.profile.ensure_user("reader-1").unwrap();

    // Five perfect easy quizzes, 5 questions each: 50 XP apiece.
    for i in 0..5 {
        services
            .activity
            .report_quiz_completed_on(
                "reader-1",
                &format!("quiz-{}", i),
                100,
                5,
                difficulty::EASY,
                true,
                d("2025-06-02"),
            )
            .unwrap();
    }
    let summary = services.profile.profile_summary("reader-1").unwrap();
    assert_eq!(summary.xp, 250);
    assert_eq!(summary.level, 2);
    assert_eq!(summary.xp_to_next_level, 50);

    // 8/10 on a hard quiz: +160 XP crosses the 300 threshold.
    let outcome = services
        .activity
        .report_quiz_completed_on(
            "reader-1",
            "quiz-final",
            80,
            10,
            difficulty::HARD,
            true,
            d("2025-06-02"),
        )
        .unwrap();
    let award = outcome.xp.unwrap();
    assert_eq!(award.total_xp, 410);
    assert_eq!(award.level, 3);
    assert!(award.leveled_up);

    let summary = services.profile.profile_summary("reader-1").unwrap();
    assert_eq!(summary.level, 3);
    assert_eq!(summary.quizzes_completed, 6);
}

#[test]
fn streak_builds_and_unlocks_badge() {
    let services = setup();
    services.profile.ensure_user("reader-1").unwrap();

    let days = [
        "2025-06-02",
        "2025-06-03",
        "2025-06-04",
        "2025-06-05",
        "2025-06-06",
        "2025-06-07",
    ];
    for (i, day) in days.iter().enumerate() {
        let outcome = services
            .activity
            .report_article_read_on("reader-1", &format!("article-{}", i), d(day))
            .unwrap();
        assert_eq!(outcome.progress.streak, i as i32 + 1);
        assert!(outcome.new_badges.is_empty());
    }

    // Day seven trips the streak badge.
    let outcome = services
        .activity
        .report_article_read_on("reader-1", "article-7", d("2025-06-08"))
        .unwrap();
    assert_eq!(outcome.progress.streak, 7);
    assert_eq!(outcome.new_badges.len(), 1);
    assert_eq!(outcome.new_badges[0].code, badge_codes::SEVEN_DAY_STREAK);

    // Missing two days resets to 1; the badge stays granted.
    let outcome = services
        .activity
        .report_article_read_on("reader-1", "article-8", d("2025-06-11"))
        .unwrap();
    assert_eq!(outcome.progress.streak, 1);

    let badges = services.profile.badges("reader-1").unwrap();
    let streak_badge = badges
        .iter()
        .find(|b| b.badge.code == badge_codes::SEVEN_DAY_STREAK)
        .unwrap();
    assert!(streak_badge.earned);
}

#[test]
fn weekly_target_completes_through_dispatcher() {
    let services = setup();
    services.profile.ensure_user("reader-1").unwrap();
    // Pre-period activity raises the baseline.
    services
        .activity
        .report_article_read_on("reader-1", "article-0", d("2025-06-01"))
        .unwrap();

    services
        .weekly
        .create_period(
            Some("admin-1"),
            d("2025-06-02"),
            d("2025-06-08"),
            TargetGoals {
                articles: 2,
                minutes: 30,
                quizzes: 1,
            },
        )
        .unwrap();

    let mut events = services.events.subscribe();
    let today = d("2025-06-03");

    services
        .activity
        .report_article_read_on("reader-1", "article-1", today)
        .unwrap();
    services
        .activity
        .report_article_read_on("reader-1", "article-2", today)
        .unwrap();
    services
        .activity
        .report_reading_time_on("reader-1", 45, today)
        .unwrap();

    let view = services
        .weekly
        .current_target_on("reader-1", today)
        .unwrap()
        .unwrap();
    assert_eq!(view.progress.articles_read, 2, "baseline excludes article-0");
    assert!(!view.progress.is_completed);

    services
        .activity
        .report_quiz_completed_on(
            "reader-1",
            "quiz-1",
            60,
            5,
            difficulty::EASY,
            true,
            today,
        )
        .unwrap();

    let view = services
        .weekly
        .current_target_on("reader-1", today)
        .unwrap()
        .unwrap();
    assert!(view.progress.is_completed);
    assert_eq!(view.target.status, "completed");

    let mut saw_completion = false;
    while let Ok(event) = events.try_recv() {
        if let ProgressEvent::TargetCompleted { user_id, .. } = event {
            assert_eq!(user_id, "reader-1");
            saw_completion = true;
        }
    }
    assert!(saw_completion, "completion event must be emitted after commit");
}

#[test]
fn skills_clamp_and_literacy_score_stays_consistent() {
    let services = setup();
    services.profile.ensure_user("reader-1").unwrap();

    let day = d("2025-06-02");
    for i in 0..80 {
        services
            .activity
            .report_article_read_on("reader-1", &format!("article-{}", i), day)
            .unwrap();
    }

    let breakdown = services.profile.skill_breakdown("reader-1").unwrap();
    assert_eq!(breakdown.comprehension, 100.0);
    assert_eq!(breakdown.reading_speed, 100.0);
    // round((100 + 100 + 0 + 0 + 0) / 5) = 40
    assert_eq!(breakdown.literacy_score, 40);

    let summary = services.profile.profile_summary("reader-1").unwrap();
    assert_eq!(summary.literacy_score, breakdown.literacy_score);

    let reads = services.profile.recent_reads("reader-1", 100).unwrap();
    assert_eq!(reads.len(), 80);
}
