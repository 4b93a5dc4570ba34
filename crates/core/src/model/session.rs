use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::SessionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("question index {index} is past the end of a {len}-question catalog")]
    IndexOutOfRange { index: u32, len: usize },

    #[error("updated_at is before created_at")]
    InvalidTimeRange,
}

/// Where a session stands relative to a catalog of `len` questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `index` questions have been issued; `index < len`.
    Active(u32),
    /// Every question has been issued.
    Complete,
}

impl SessionState {
    /// Classify a stored index against the catalog length.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::IndexOutOfRange` if `index > len`.
    pub fn classify(index: u32, len: usize) -> Result<Self, SessionStateError> {
        let as_usize = usize::try_from(index).unwrap_or(usize::MAX);
        match as_usize.cmp(&len) {
            std::cmp::Ordering::Less => Ok(Self::Active(index)),
            std::cmp::Ordering::Equal => Ok(Self::Complete),
            std::cmp::Ordering::Greater => Err(SessionStateError::IndexOutOfRange { index, len }),
        }
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Persisted progress pointer for one questionnaire session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    current_question_index: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// A brand-new session that has not been issued any question yet.
    #[must_use]
    pub fn start(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            current_question_index: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InvalidTimeRange` if `updated_at` precedes `created_at`.
    pub fn from_persisted(
        id: SessionId,
        current_question_index: u32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, SessionStateError> {
        if updated_at < created_at {
            return Err(SessionStateError::InvalidTimeRange);
        }
        Ok(Self {
            id,
            current_question_index,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn current_question_index(&self) -> u32 {
        self.current_question_index
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// State of this session against a catalog of `len` questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::IndexOutOfRange` if the stored index exceeds `len`,
    /// which happens when the catalog shrank after the session advanced.
    pub fn state(&self, len: usize) -> Result<SessionState, SessionStateError> {
        SessionState::classify(self.current_question_index, len)
    }

    /// Copy of this session pointing at `index`, stamped at `at`.
    #[must_use]
    pub fn moved_to(&self, index: u32, at: DateTime<Utc>) -> Self {
        Self {
            current_question_index: index,
            updated_at: at.max(self.created_at),
            ..self.clone()
        }
    }

    /// Catalog position of the question most recently issued.
    ///
    /// A session that has not been issued anything yet resumes at the first question.
    #[must_use]
    pub fn last_issued_index(&self) -> usize {
        usize::try_from(self.current_question_index.saturating_sub(1)).unwrap_or(usize::MAX)
    }
}
