//! Quiz result rows: evidence for the perfect-quiz badge count
//!
//! Every submitted attempt is appended; the Quiz Master predicate
//! counts rows with a perfect score.

use diesel::prelude::*;
use uuid::Uuid;

use super::models::{current_timestamp, NewQuizResult, QuizResult};
use super::schema::quiz_results;
use crate::error::ProgressError;

/// Record one quiz attempt
pub fn record_result(
    conn: &mut SqliteConnection,
    user_id: &str,
    quiz_id: &str,
    score: i32,
    correct_answers: i32,
    total_questions: i32,
) -> Result<QuizResult, ProgressError> {
    let id = Uuid::new_v4().to_string();
    let completed_at = current_timestamp();
    let row = NewQuizResult {
        id: &id,
        user_id,
        quiz_id,
        score,
        correct_answers,
        total_questions,
        completed_at: &completed_at,
    };

    diesel::insert_into(quiz_results::table)
        .values(&row)
        .execute(conn)
        .map_err(|e| ProgressError::Internal(format!("Insert failed: {}", e)))?;

    quiz_results::table
        .filter(quiz_results::id.eq(&id))
        .first(conn)
        .map_err(|e| ProgressError::Internal(format!("Fetch failed: {}", e)))
}

/// Count of attempts with a perfect score
pub fn perfect_quiz_count(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<i64, ProgressError> {
    quiz_results::table
        .filter(quiz_results::user_id.eq(user_id))
        .filter(quiz_results::score.eq(100))
        .count()
        .get_result(conn)
        .map_err(|e| ProgressError::Internal(format!("Count query failed: {}", e)))
}

/// Recent attempts for a user, newest first
pub fn results_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    limit: i64,
) -> Result<Vec<QuizResult>, ProgressError> {
    quiz_results::table
        .filter(quiz_results::user_id.eq(user_id))
        .order(quiz_results::completed_at.desc())
        .limit(limit)
        .load(conn)
        .map_err(|e| ProgressError::Internal(format!("Query failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProgressDb;

    #[test]
    fn test_perfect_quiz_count() {
        let db = ProgressDb::open_in_memory().unwrap();
        let mut conn = db.conn().unwrap();

        record_result(&mut conn, "reader-1", "quiz-1", 100, 10, 10).unwrap();
        record_result(&mut conn, "reader-1", "quiz-2", 80, 8, 10).unwrap();
        // Retaking the same quiz to a perfect score counts again.
        record_result(&mut conn, "reader-1", "quiz-2", 100, 10, 10).unwrap();
        record_result(&mut conn, "reader-2", "quiz-1", 100, 10, 10).unwrap();

        assert_eq!(perfect_quiz_count(&mut conn, "reader-1").unwrap(), 2);
        assert_eq!(perfect_quiz_count(&mut conn, "reader-2").unwrap(), 1);
        assert_eq!(results_for_user(&mut conn, "reader-1", 10).unwrap().len(), 3);
    }
}
