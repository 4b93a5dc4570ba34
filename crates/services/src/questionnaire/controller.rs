use std::sync::Arc;

use slinky_core::model::{Answer, QuestionCatalog, Session, SessionId, SessionState};
use storage::repository::{AnswerRepository, SessionRepository, StorageError};
use tracing::{debug, info, warn};

use super::issued::IssuedQuestion;
use super::progress::SessionProgress;
use crate::Clock;
use crate::error::QuestionnaireError;

/// How many times Advance re-reads the session after losing a compare-and-swap.
const MAX_ADVANCE_ATTEMPTS: usize = 8;

/// Drives a session through the question catalog.
///
/// Holds no per-session state: every operation reads the session store and
/// answer log, so any instance can serve any request. Advancing is a
/// compare-and-swap on the stored index, which keeps two concurrent advances
/// of one session from issuing the same question twice.
#[derive(Clone)]
pub struct SessionController {
    clock: Clock,
    catalog: Arc<QuestionCatalog>,
    sessions: Arc<dyn SessionRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<QuestionCatalog>,
        sessions: Arc<dyn SessionRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            sessions,
            answers,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// Create a session and issue its first question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionnaireError::Storage` if the session cannot be persisted.
    pub async fn start(&self) -> Result<IssuedQuestion, QuestionnaireError> {
        let session = Session::start(SessionId::generate(), self.clock.now());
        self.sessions.create_session(&session).await?;
        info!(session_id = %session.id(), "session started");

        self.next_question(session.id()).await
    }

    /// Issue the question at the session's pointer and move the pointer forward.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id, `NoMoreQuestions` once every
    /// question has been issued (the session is left untouched), and
    /// `Contended` if concurrent advances keep winning the race.
    pub async fn next_question(&self, id: SessionId) -> Result<IssuedQuestion, QuestionnaireError> {
        for attempt in 1..=MAX_ADVANCE_ATTEMPTS {
            let session = self.load_session(id).await?;
            let index = match session
                .state(self.catalog.len())
                .unwrap_or(SessionState::Complete)
            {
                SessionState::Active(index) => index,
                SessionState::Complete => {
                    debug!(session_id = %id, "advance requested on completed session");
                    return Err(QuestionnaireError::NoMoreQuestions { session_id: id });
                }
            };

            let position = usize::try_from(index).unwrap_or(usize::MAX);
            let Some(question) = self.catalog.get(position) else {
                return Err(QuestionnaireError::NoMoreQuestions { session_id: id });
            };

            let at = self.clock.now().max(session.created_at());
            match self
                .sessions
                .advance_session(id, index, index + 1, at)
                .await
            {
                Ok(()) => {
                    debug!(session_id = %id, position, question = question.name(), "issued question");
                    return Ok(IssuedQuestion::new(id, position, question.clone()));
                }
                Err(StorageError::Conflict) => {
                    debug!(session_id = %id, attempt, "lost advance race, retrying");
                }
                Err(StorageError::NotFound) => {
                    return Err(QuestionnaireError::SessionNotFound(id));
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(session_id = %id, attempts = MAX_ADVANCE_ATTEMPTS, "advance contended");
        Err(QuestionnaireError::Contended {
            session_id: id,
            attempts: MAX_ADVANCE_ATTEMPTS,
        })
    }

    /// Re-issue the most recently issued question without moving the pointer.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id.
    pub async fn resume(&self, id: SessionId) -> Result<IssuedQuestion, QuestionnaireError> {
        let session = self.load_session(id).await?;
        let position = session
            .last_issued_index()
            .min(self.catalog.len().saturating_sub(1));
        let question = self
            .catalog
            .get(position)
            .ok_or(QuestionnaireError::NoMoreQuestions { session_id: id })?;

        Ok(IssuedQuestion::new(id, position, question.clone()))
    }

    /// Append an answer to the log. Does not move the pointer.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id and `InvalidAnswer` for a
    /// blank question name.
    pub async fn record_answer(
        &self,
        id: SessionId,
        question_name: &str,
        value: &str,
    ) -> Result<(), QuestionnaireError> {
        self.load_session(id).await?;

        if self.catalog.position(question_name).is_none() {
            warn!(session_id = %id, question_name, "answer for a question not in the catalog");
        }

        let answer = Answer::new(id, question_name, value, self.clock.now())?;
        let seq = self.answers.append_answer(&answer).await.map_err(|e| match e {
            StorageError::NotFound => QuestionnaireError::SessionNotFound(id),
            other => other.into(),
        })?;
        debug!(session_id = %id, question_name, seq, "recorded answer");
        Ok(())
    }

    /// Record an answer and issue the next question.
    ///
    /// The answer is kept even when no question is left to issue.
    ///
    /// # Errors
    ///
    /// See [`SessionController::record_answer`] and [`SessionController::next_question`].
    pub async fn submit(
        &self,
        id: SessionId,
        question_name: &str,
        value: &str,
    ) -> Result<IssuedQuestion, QuestionnaireError> {
        self.record_answer(id, question_name, value).await?;
        self.next_question(id).await
    }

    /// Every answer recorded for the session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id.
    pub async fn list_answers(&self, id: SessionId) -> Result<Vec<Answer>, QuestionnaireError> {
        self.load_session(id).await?;
        Ok(self.answers.list_answers(id).await?)
    }

    /// How far the session has got through the catalog.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown id.
    pub async fn progress(&self, id: SessionId) -> Result<SessionProgress, QuestionnaireError> {
        let session = self.load_session(id).await?;
        Ok(SessionProgress::at(
            session.current_question_index(),
            self.catalog.len(),
        ))
    }

    async fn load_session(&self, id: SessionId) -> Result<Session, QuestionnaireError> {
        self.sessions.get_session(id).await.map_err(|e| match e {
            StorageError::NotFound => QuestionnaireError::SessionNotFound(id),
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slinky_core::model::Question;
    use slinky_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn controller(names: &[&str]) -> (SessionController, InMemoryRepository) {
        let catalog = QuestionCatalog::new(
            names
                .iter()
                .map(|name| Question::new(*name, format!("Question {name}")))
                .collect(),
        )
        .unwrap();
        let repo = InMemoryRepository::new();
        let controller = SessionController::new(
            fixed_clock(),
            Arc::new(catalog),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (controller, repo)
    }

    #[tokio::test]
    async fn start_issues_first_question_and_moves_pointer() {
        let (controller, repo) = controller(&["q0", "q1"]);
        let issued = controller.start().await.unwrap();
        assert_eq!(issued.name(), "q0");
        assert_eq!(issued.position(), 0);

        let session = repo.get_session(issued.session_id()).await.unwrap();
        assert_eq!(session.current_question_index(), 1);
    }

    #[tokio::test]
    async fn next_question_on_complete_session_leaves_state_alone() {
        let (controller, repo) = controller(&["only"]);
        let id = controller.start().await.unwrap().session_id();

        for _ in 0..3 {
            let err = controller.next_question(id).await.unwrap_err();
            assert!(matches!(err, QuestionnaireError::NoMoreQuestions { session_id } if session_id == id));
        }
        let session = repo.get_session(id).await.unwrap();
        assert_eq!(session.current_question_index(), 1);
    }

    #[tokio::test]
    async fn resume_returns_last_issued_question_repeatedly() {
        let (controller, _repo) = controller(&["q0", "q1", "q2"]);
        let id = controller.start().await.unwrap().session_id();
        controller.next_question(id).await.unwrap();

        for _ in 0..3 {
            let resumed = controller.resume(id).await.unwrap();
            assert_eq!(resumed.name(), "q1");
            assert_eq!(resumed.session_id(), id);
        }
        assert_eq!(controller.progress(id).await.unwrap().issued, 2);
    }

    #[tokio::test]
    async fn resume_of_unissued_session_is_first_question() {
        let (controller, repo) = controller(&["q0", "q1"]);
        let session = Session::start(SessionId::generate(), fixed_clock().now());
        repo.create_session(&session).await.unwrap();

        let resumed = controller.resume(session.id()).await.unwrap();
        assert_eq!(resumed.name(), "q0");
    }

    #[tokio::test]
    async fn record_answer_does_not_advance() {
        let (controller, repo) = controller(&["q0", "q1"]);
        let id = controller.start().await.unwrap().session_id();

        controller.record_answer(id, "q0", "first").await.unwrap();
        controller.record_answer(id, "q0", "second").await.unwrap();

        let session = repo.get_session(id).await.unwrap();
        assert_eq!(session.current_question_index(), 1);
        let values: Vec<_> = controller
            .list_answers(id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.value().to_owned())
            .collect();
        assert_eq!(values, ["first", "second"]);
    }

    #[tokio::test]
    async fn blank_question_name_is_rejected() {
        let (controller, _repo) = controller(&["q0"]);
        let id = controller.start().await.unwrap().session_id();
        let err = controller.record_answer(id, "", "x").await.unwrap_err();
        assert!(matches!(err, QuestionnaireError::InvalidAnswer(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn unknown_session_is_reported_everywhere() {
        let (controller, _repo) = controller(&["q0"]);
        let missing = SessionId::generate();

        assert!(matches!(
            controller.resume(missing).await.unwrap_err(),
            QuestionnaireError::SessionNotFound(id) if id == missing
        ));
        assert!(matches!(
            controller.submit(missing, "q0", "x").await.unwrap_err(),
            QuestionnaireError::SessionNotFound(_)
        ));
        assert!(matches!(
            controller.list_answers(missing).await.unwrap_err(),
            QuestionnaireError::SessionNotFound(_)
        ));
        assert!(matches!(
            controller.next_question(missing).await.unwrap_err(),
            QuestionnaireError::SessionNotFound(_)
        ));
        assert!(matches!(
            controller.progress(missing).await.unwrap_err(),
            QuestionnaireError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn pointer_past_shrunken_catalog_is_complete() {
        let (controller, repo) = controller(&["q0", "q1"]);
        let now = fixed_clock().now();
        let session = Session::from_persisted(SessionId::generate(), 5, now, now).unwrap();
        repo.create_session(&session).await.unwrap();

        assert!(matches!(
            controller.next_question(session.id()).await.unwrap_err(),
            QuestionnaireError::NoMoreQuestions { .. }
        ));
        assert_eq!(controller.resume(session.id()).await.unwrap().name(), "q1");
    }
}
