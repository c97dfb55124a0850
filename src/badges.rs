//! Declarative badge catalog
//!
//! Unlock criteria are tabulated as data rather than branched over
//! literal badge ids, so new badges extend the table without touching
//! the evaluator. Each predicate is a pure function of a stats
//! snapshot; the evaluator in `db::badge_grants` handles persistence
//! and race safety.

/// Aggregate stats a badge predicate may inspect.
///
/// Built inside the caller's transaction so concurrent activities see
/// consistent values.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub articles_read: i32,
    pub quizzes_completed: i32,
    pub events_attended: i32,
    pub streak: i32,
    /// `count(*)` of quiz results with score = 100.
    pub perfect_quizzes: i64,
    pub reading_speed: f32,
    pub critical_analysis: f32,
}

/// One catalog entry: identity plus its unlock predicate.
pub struct BadgeSpec {
    pub code: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub unlocked: fn(&StatsSnapshot) -> bool,
}

/// Stable badge codes
pub mod badge_codes {
    pub const ACTIVE_READER: &str = "active_reader";
    pub const QUIZ_MASTER: &str = "quiz_master";
    pub const SEVEN_DAY_STREAK: &str = "seven_day_streak";
    pub const EVENT_EXPLORER: &str = "event_explorer";
    pub const SPEED_READER: &str = "speed_reader";
    pub const ANALYST_PRO: &str = "analyst_pro";

    pub const ALL: [&str; 6] = [
        ACTIVE_READER,
        QUIZ_MASTER,
        SEVEN_DAY_STREAK,
        EVENT_EXPLORER,
        SPEED_READER,
        ANALYST_PRO,
    ];
}

/// The full badge catalog with unlock predicates.
pub const CATALOG: [BadgeSpec; 6] = [
    BadgeSpec {
        code: badge_codes::ACTIVE_READER,
        name: "Active Reader",
        icon: "📚",
        unlocked: |s| s.articles_read >= 10,
    },
    BadgeSpec {
        code: badge_codes::QUIZ_MASTER,
        name: "Quiz Master",
        icon: "🏆",
        unlocked: |s| s.perfect_quizzes >= 10,
    },
    BadgeSpec {
        code: badge_codes::SEVEN_DAY_STREAK,
        name: "7-Day Streak",
        icon: "🔥",
        unlocked: |s| s.streak >= 7,
    },
    BadgeSpec {
        code: badge_codes::EVENT_EXPLORER,
        name: "Event Explorer",
        icon: "🎫",
        unlocked: |s| s.events_attended >= 5,
    },
    BadgeSpec {
        code: badge_codes::SPEED_READER,
        name: "Speed Reader",
        icon: "⚡",
        unlocked: |s| s.reading_speed >= 80.0,
    },
    BadgeSpec {
        code: badge_codes::ANALYST_PRO,
        name: "Analyst Pro",
        icon: "🔍",
        unlocked: |s| s.critical_analysis >= 90.0,
    },
];

/// Look up a catalog entry by its stable code.
pub fn spec_for(code: &str) -> Option<&'static BadgeSpec> {
    CATALOG.iter().find(|s| s.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_codes_are_unique_and_complete() {
        for code in badge_codes::ALL {
            assert!(spec_for(code).is_some(), "missing spec for {}", code);
        }
        assert_eq!(CATALOG.len(), badge_codes::ALL.len());
    }

    #[test]
    fn test_thresholds() {
        let mut stats = StatsSnapshot::default();
        assert!(CATALOG.iter().all(|b| !(b.unlocked)(&stats)));

        stats.articles_read = 10;
        assert!((spec_for(badge_codes::ACTIVE_READER).unwrap().unlocked)(&stats));

        stats.perfect_quizzes = 9;
        assert!(!(spec_for(badge_codes::QUIZ_MASTER).unwrap().unlocked)(&stats));
        stats.perfect_quizzes = 10;
        assert!((spec_for(badge_codes::QUIZ_MASTER).unwrap().unlocked)(&stats));

        stats.streak = 7;
        assert!((spec_for(badge_codes::SEVEN_DAY_STREAK).unwrap().unlocked)(&stats));

        stats.events_attended = 5;
        assert!((spec_for(badge_codes::EVENT_EXPLORER).unwrap().unlocked)(&stats));

        stats.reading_speed = 80.0;
        assert!((spec_for(badge_codes::SPEED_READER).unwrap().unlocked)(&stats));

        stats.critical_analysis = 89.9;
        assert!(!(spec_for(badge_codes::ANALYST_PRO).unwrap().unlocked)(&stats));
        stats.critical_analysis = 90.0;
        assert!((spec_for(badge_codes::ANALYST_PRO).unwrap().unlocked)(&stats));
    }
}
