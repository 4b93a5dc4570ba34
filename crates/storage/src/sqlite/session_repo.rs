use chrono::{DateTime, Utc};
use slinky_core::model::{Session, SessionId};

use super::{
    SqliteRepository,
    mapping::{db_err, index_to_i64, map_session_row},
};
use crate::repository::{SessionRepository, StorageError};

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO user_sessions (
                    session_id, current_question_index, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(session.id().to_string())
        .bind(index_to_i64(session.current_question_index()))
        .bind(session.created_at())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let row = sqlx::query(
            r"
                SELECT session_id, current_question_index, created_at, updated_at
                FROM user_sessions
                WHERE session_id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn advance_session(
        &self,
        id: SessionId,
        expected: u32,
        next: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
                UPDATE user_sessions
                SET current_question_index = ?1,
                    updated_at = ?2
                WHERE session_id = ?3 AND current_question_index = ?4
            ",
        )
        .bind(index_to_i64(next))
        .bind(at)
        .bind(id.as_str())
        .bind(index_to_i64(expected))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            // Distinguish a missing session from a lost race.
            let exists = sqlx::query("SELECT 1 FROM user_sessions WHERE session_id = ?1")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?
                .is_some();
            tx.rollback().await.map_err(db_err)?;
            return Err(if exists {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
