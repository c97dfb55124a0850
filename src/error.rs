//! Error types for literacy-progress

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Weekly period already exists: {0}")]
    DuplicatePeriod(String),

    #[error("Invalid activity type: {0}")]
    InvalidActivityType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Lets repository calls run inside `conn.transaction(...)` without
// wrapping every `?` site. Unique-violation races on badge grants never
// reach this path (grants use insert_or_ignore).
impl From<diesel::result::Error> for ProgressError {
    fn from(e: diesel::result::Error) -> Self {
        ProgressError::Internal(format!("Database error: {}", e))
    }
}
