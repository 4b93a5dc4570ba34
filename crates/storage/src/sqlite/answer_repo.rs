use slinky_core::model::{Answer, SessionId};

use super::{
    SqliteRepository,
    mapping::{db_err, map_answer_row},
};
use crate::repository::{AnswerRepository, StorageError};

#[async_trait::async_trait]
impl AnswerRepository for SqliteRepository {
    async fn append_answer(&self, answer: &Answer) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO questions (session_id, question_name, question_value, answered_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(answer.session_id().to_string())
        .bind(answer.question_name())
        .bind(answer.value())
        .bind(answer.answered_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<Answer>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT session_id, question_name, question_value, answered_at
                FROM questions
                WHERE session_id = ?1
                ORDER BY rowid ASC
            ",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_answer_row(&row)?);
        }
        Ok(out)
    }
}
