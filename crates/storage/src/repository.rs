use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slinky_core::model::{Answer, Session, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Session store: one progress pointer per session id.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a brand-new session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a session with the same id exists,
    /// or other storage errors.
    async fn create_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError>;

    /// Move a session from `expected` to `next`, only if it still points at `expected`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist and
    /// `StorageError::Conflict` if its stored index is no longer `expected`.
    async fn advance_session(
        &self,
        id: SessionId,
        expected: u32,
        next: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// Append-only answer log.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Append one answer and return its position in the log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning session does not exist,
    /// or other storage errors.
    async fn append_answer(&self, answer: &Answer) -> Result<i64, StorageError>;

    /// All answers recorded for a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read.
    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<Answer>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    answers: Arc<Mutex<Vec<Answer>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            answers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn advance_session(
        &self,
        id: SessionId,
        expected: u32,
        next: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let session = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        if session.current_question_index() != expected {
            return Err(StorageError::Conflict);
        }
        *session = session.moved_to(next, at);
        Ok(())
    }
}

#[async_trait]
impl AnswerRepository for InMemoryRepository {
    async fn append_answer(&self, answer: &Answer) -> Result<i64, StorageError> {
        {
            let sessions = self
                .sessions
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            if !sessions.contains_key(&answer.session_id()) {
                return Err(StorageError::NotFound);
            }
        }

        let mut guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(answer.clone());
        i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("answer log overflow".into()))
    }

    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<Answer>, StorageError> {
        let guard = self
            .answers
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|a| a.session_id() == session_id)
            .cloned()
            .collect())
    }
}

/// Aggregates the session store and answer log behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub answers: Arc<dyn AnswerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let answers: Arc<dyn AnswerRepository> = Arc::new(repo);
        Self { sessions, answers }
    }
}
