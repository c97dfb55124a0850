//! SQLite database module for progress and gamification state
//!
//! ## Architecture
//!
//! - One row of `user_progress` + `skill_profiles` per user
//! - Append-only `user_badges` grants guarded by the primary key
//! - `weekly_targets` rows fanned out per user per admin period
//! - `quiz_results` / `reading_history` as activity evidence
//!
//! All writes run inside the caller's Diesel transaction; the modules
//! here never commit on their own.

pub mod schema;
pub mod models;
pub mod progress;
pub mod skills;
pub mod badge_grants;
pub mod quiz_results;
pub mod reading_history;
pub mod weekly_targets;

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use tracing::{debug, info};

use crate::badges::CATALOG;
use crate::error::ProgressError;
use models::NewBadge;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// SQLite schema, applied idempotently at open time.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user_progress (
    user_id TEXT PRIMARY KEY NOT NULL,
    xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    streak INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT,
    articles_read INTEGER NOT NULL DEFAULT 0,
    quizzes_completed INTEGER NOT NULL DEFAULT 0,
    events_attended INTEGER NOT NULL DEFAULT 0,
    reading_minutes INTEGER NOT NULL DEFAULT 0,
    literacy_score INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS skill_profiles (
    user_id TEXT PRIMARY KEY NOT NULL,
    comprehension REAL NOT NULL DEFAULT 0,
    reading_speed REAL NOT NULL DEFAULT 0,
    critical_analysis REAL NOT NULL DEFAULT 0,
    fact_checking REAL NOT NULL DEFAULT 0,
    summary_writing REAL NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS badges (
    code TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    icon TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_badges (
    user_id TEXT NOT NULL,
    badge_code TEXT NOT NULL,
    granted_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, badge_code)
);

CREATE TABLE IF NOT EXISTS quiz_results (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    quiz_id TEXT NOT NULL,
    score INTEGER NOT NULL,
    correct_answers INTEGER NOT NULL,
    total_questions INTEGER NOT NULL,
    completed_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_quiz_results_user_score
    ON quiz_results(user_id, score);

CREATE TABLE IF NOT EXISTS reading_history (
    user_id TEXT NOT NULL,
    article_id TEXT NOT NULL,
    read_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, article_id)
);

CREATE TABLE IF NOT EXISTS weekly_targets (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    created_by TEXT,
    period_start TEXT NOT NULL,
    period_end TEXT NOT NULL,
    target_articles INTEGER NOT NULL DEFAULT 0,
    target_minutes INTEGER NOT NULL DEFAULT 0,
    target_quizzes INTEGER NOT NULL DEFAULT 0,
    baseline_articles INTEGER NOT NULL DEFAULT 0,
    baseline_minutes INTEGER NOT NULL DEFAULT 0,
    baseline_quizzes INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_weekly_targets_user_period
    ON weekly_targets(user_id, period_start, period_end);
"#;

/// Pooled SQLite database for progress state
pub struct ProgressDb {
    pool: DbPool,
}

impl ProgressDb {
    /// Open or create the progress database under `storage_dir`
    pub fn open(storage_dir: &Path) -> Result<Self, ProgressError> {
        std::fs::create_dir_all(storage_dir)?;
        let db_path = storage_dir.join("progress.db");
        info!("Opening SQLite database at {:?}", db_path);

        let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
        let pool = Pool::builder()
            .build(manager)
            .map_err(|e| ProgressError::Internal(format!("Failed to build pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    ///
    /// Pool size is pinned to 1: each in-memory connection would
    /// otherwise be a distinct empty database.
    pub fn open_in_memory() -> Result<Self, ProgressError> {
        debug!("Opening in-memory SQLite database");

        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| ProgressError::Internal(format!("Failed to build pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Check out a pooled connection
    pub fn conn(&self) -> Result<DbConn, ProgressError> {
        self.pool
            .get()
            .map_err(|e| ProgressError::Internal(format!("Pool checkout failed: {}", e)))
    }

    /// Apply pragmas, create tables and seed the badge catalog
    fn init_schema(&self) -> Result<(), ProgressError> {
        let mut conn = self.conn()?;

        // WAL for better concurrent read performance; busy_timeout so
        // pooled writers queue instead of failing fast.
        conn.batch_execute(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )
        .map_err(|e| ProgressError::Internal(format!("Failed to set PRAGMA: {}", e)))?;

        conn.batch_execute(SCHEMA_SQL)
            .map_err(|e| ProgressError::Internal(format!("Failed to init schema: {}", e)))?;

        seed_badge_catalog(&mut conn)?;
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, ProgressError> {
        use schema::{badges, user_badges, user_progress, weekly_targets};

        let mut conn = self.conn()?;

        let user_count: i64 = user_progress::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| ProgressError::Internal(format!("Count query failed: {}", e)))?;

        let badge_count: i64 = badges::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| ProgressError::Internal(format!("Count query failed: {}", e)))?;

        let grant_count: i64 = user_badges::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| ProgressError::Internal(format!("Count query failed: {}", e)))?;

        let target_count: i64 = weekly_targets::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| ProgressError::Internal(format!("Count query failed: {}", e)))?;

        Ok(DbStats {
            user_count: user_count as u64,
            badge_count: badge_count as u64,
            grant_count: grant_count as u64,
            target_count: target_count as u64,
        })
    }
}

/// Seed the badge catalog from the declarative table. Idempotent:
/// existing rows keep their values so grants stay consistent.
fn seed_badge_catalog(conn: &mut SqliteConnection) -> Result<(), ProgressError> {
    use schema::badges;

    for spec in &CATALOG {
        let row = NewBadge {
            code: spec.code,
            name: spec.name,
            icon: spec.icon,
        };
        diesel::insert_or_ignore_into(badges::table)
            .values(&row)
            .execute(conn)
            .map_err(|e| ProgressError::Internal(format!("Badge seed failed: {}", e)))?;
    }
    Ok(())
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub user_count: u64,
    pub badge_count: u64,
    pub grant_count: u64,
    pub target_count: u64,
}

// Re-exports
pub use models::{
    Badge, BadgeStatus, QuizResult, ReadingRecord, SkillProfile, UserBadge, UserProgress,
    WeeklyTarget,
};
