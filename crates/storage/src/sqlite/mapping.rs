use slinky_core::model::{Answer, Session, SessionId};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn session_id_from_str(raw: &str) -> Result<SessionId, StorageError> {
    raw.parse::<SessionId>().map_err(ser)
}

pub(crate) fn index_to_i64(index: u32) -> i64 {
    i64::from(index)
}

pub(crate) fn index_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v)
        .map_err(|_| StorageError::Serialization(format!("invalid current_question_index: {v}")))
}

/// Translates a sqlx error into a storage error, keeping the constraint
/// violations callers branch on.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<Session, StorageError> {
    let id = session_id_from_str(&row.try_get::<String, _>("session_id").map_err(ser)?)?;
    let index = index_from_i64(
        row.try_get::<i64, _>("current_question_index")
            .map_err(ser)?,
    )?;

    Session::from_persisted(
        id,
        index,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<Answer, StorageError> {
    let session_id = session_id_from_str(&row.try_get::<String, _>("session_id").map_err(ser)?)?;

    Ok(Answer::from_persisted(
        session_id,
        row.try_get("question_name").map_err(ser)?,
        row.try_get("question_value").map_err(ser)?,
        row.try_get("answered_at").map_err(ser)?,
    ))
}
