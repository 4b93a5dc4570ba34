use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::SessionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question name cannot be empty")]
    EmptyQuestionName,
}

/// One immutable entry in the answer log.
///
/// Repeated answers to the same question are separate entries; the log keeps
/// the full edit history in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(skip)]
    session_id: SessionId,
    #[serde(rename = "name")]
    question_name: String,
    value: String,
    answered_at: DateTime<Utc>,
}

impl Answer {
    /// Create an answer for `question_name`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::EmptyQuestionName` if the name is blank.
    pub fn new(
        session_id: SessionId,
        question_name: impl Into<String>,
        value: impl Into<String>,
        answered_at: DateTime<Utc>,
    ) -> Result<Self, AnswerError> {
        let question_name = question_name.into();
        if question_name.trim().is_empty() {
            return Err(AnswerError::EmptyQuestionName);
        }
        Ok(Self {
            session_id,
            question_name,
            value: value.into(),
            answered_at,
        })
    }

    /// Rehydrate an answer from persisted storage without re-validating it.
    #[must_use]
    pub fn from_persisted(
        session_id: SessionId,
        question_name: String,
        value: String,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            question_name,
            value,
            answered_at,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn question_name(&self) -> &str {
        &self.question_name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.answered_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_blank_question_name() {
        let err = Answer::new(SessionId::generate(), "   ", "x", fixed_now()).unwrap_err();
        assert_eq!(err, AnswerError::EmptyQuestionName);
    }

    #[test]
    fn allows_empty_value() {
        let answer = Answer::new(SessionId::generate(), "comments", "", fixed_now()).unwrap();
        assert_eq!(answer.value(), "");
    }

    #[test]
    fn serializes_without_session_id() {
        let answer = Answer::new(SessionId::generate(), "colour", "blue", fixed_now()).unwrap();
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["name"], "colour");
        assert_eq!(json["value"], "blue");
        assert!(json.get("answeredAt").is_some());
        assert!(json.get("sessionId").is_none());
    }
}
