//! Shared error types for the services crate.

use thiserror::Error;

use slinky_core::model::{AnswerError, CatalogError, SessionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `SessionController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionnaireError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("session {session_id} has no more questions")]
    NoMoreQuestions { session_id: SessionId },
    #[error("session {session_id} is being advanced concurrently; gave up after {attempts} attempts")]
    Contended { session_id: SessionId, attempts: usize },
    #[error(transparent)]
    InvalidAnswer(#[from] AnswerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuestionnaireError {
    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contended { .. } | Self::Storage(_))
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
