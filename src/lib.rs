//! Progress and gamification scoring engine for a literacy platform
//!
//! Tracks the state a reader accumulates across the platform - skill
//! scores, XP and levels, daily streaks, weekly-target completion and
//! badge grants - behind a service layer the web tier calls.
//!
//! ## Modules
//!
//! - `config` - TOML configuration with defaults
//! - `error` - error taxonomy (`ProgressError`)
//! - `xp` - pure XP/level math (triangular progression)
//! - `streak` - pure consecutive-day streak decisions
//! - `badges` - declarative badge catalog with unlock predicates
//! - `db` - SQLite persistence (Diesel, one module per table)
//! - `services` - business logic, transaction boundaries and events
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use literacy_progress::db::ProgressDb;
//! use literacy_progress::services::Services;
//!
//! # fn main() -> Result<(), literacy_progress::ProgressError> {
//! let config = literacy_progress::Config::default();
//! let db = Arc::new(ProgressDb::open(&config.storage_dir)?);
//! let services = Services::new(db);
//!
//! services.profile.ensure_user("reader-1")?;
//! let outcome = services.activity.report_article_read("reader-1", "article-1")?;
//! println!("streak: {}", outcome.progress.streak);
//! # Ok(())
//! # }
//! ```

pub mod badges;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod streak;
pub mod xp;

// Re-exports
pub use config::Config;
pub use db::ProgressDb;
pub use error::ProgressError;
pub use services::Services;
pub use xp::XpAward;
