//! Per-(user, article) reading log
//!
//! One row per pair; a re-read refreshes `read_at` in place so the
//! recent-reads view reflects the latest visit.

use diesel::prelude::*;

use super::models::{current_timestamp, NewReadingRecord, ReadingRecord};
use super::schema::reading_history;
use crate::error::ProgressError;

/// Record that a user read an article (upsert on re-read)
pub fn record_read(
    conn: &mut SqliteConnection,
    user_id: &str,
    article_id: &str,
) -> Result<(), ProgressError> {
    let read_at = current_timestamp();
    let row = NewReadingRecord {
        user_id,
        article_id,
        read_at: &read_at,
    };

    diesel::insert_into(reading_history::table)
        .values(&row)
        .on_conflict((reading_history::user_id, reading_history::article_id))
        .do_update()
        .set(reading_history::read_at.eq(&read_at))
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Upsert failed: {}", e)))?;

    Ok(())
}

/// Most recent reads for a user, newest first
pub fn recent_reads(
    conn: &mut SqliteConnection,
    user_id: &str,
    limit: i64,
) -> Result<Vec<ReadingRecord>, ProgressError> {
    reading_history::table
        .filter(reading_history::user_id.eq(user_id))
        .order(reading_history::read_at.desc())
        .limit(limit)
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}
