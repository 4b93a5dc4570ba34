use serde::Serialize;
use slinky_core::model::{Question, SessionId};

/// A catalog question handed to a client, tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedQuestion {
    session_id: SessionId,
    position: usize,
    #[serde(flatten)]
    question: Question,
}

impl IssuedQuestion {
    #[must_use]
    pub fn new(session_id: SessionId, position: usize, question: Question) -> Self {
        Self {
            session_id,
            position,
            question,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Zero-based position of the question in the catalog.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.question.name()
    }
}
