use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use services::{QuestionnaireError, SessionController};
use slinky_core::model::{Question, QuestionCatalog, Session, SessionId};
use slinky_core::time::fixed_clock;
use storage::repository::{InMemoryRepository, SessionRepository, StorageError};

fn catalog(names: &[&str]) -> Arc<QuestionCatalog> {
    let questions = names
        .iter()
        .map(|name| Question::new(*name, format!("Title {name}")))
        .collect();
    Arc::new(QuestionCatalog::new(questions).unwrap())
}

fn controller(names: &[&str]) -> (SessionController, InMemoryRepository) {
    let repo = InMemoryRepository::new();
    let controller = SessionController::new(
        fixed_clock(),
        catalog(names),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    (controller, repo)
}

#[tokio::test]
async fn three_question_walkthrough() {
    let (controller, repo) = controller(&["Q0", "Q1", "Q2"]);

    let first = controller.start().await.unwrap();
    let id = first.session_id();
    assert_eq!(first.name(), "Q0");
    assert_eq!(repo.get_session(id).await.unwrap().current_question_index(), 1);

    let second = controller.submit(id, "Q0", "42").await.unwrap();
    assert_eq!(second.name(), "Q1");
    assert_eq!(second.session_id(), id);
    assert_eq!(repo.get_session(id).await.unwrap().current_question_index(), 2);

    let third = controller.submit(id, "Q1", "blue").await.unwrap();
    assert_eq!(third.name(), "Q2");
    assert_eq!(repo.get_session(id).await.unwrap().current_question_index(), 3);

    let err = controller.submit(id, "Q2", "yes").await.unwrap_err();
    assert!(matches!(err, QuestionnaireError::NoMoreQuestions { session_id } if session_id == id));
    assert_eq!(repo.get_session(id).await.unwrap().current_question_index(), 3);

    let answers: Vec<_> = controller
        .list_answers(id)
        .await
        .unwrap()
        .iter()
        .map(|a| (a.question_name().to_owned(), a.value().to_owned()))
        .collect();
    assert_eq!(
        answers,
        [
            ("Q0".to_owned(), "42".to_owned()),
            ("Q1".to_owned(), "blue".to_owned()),
            ("Q2".to_owned(), "yes".to_owned()),
        ]
    );

    let progress = controller.progress(id).await.unwrap();
    assert!(progress.is_complete);
    assert_eq!(progress.remaining, 0);
}

#[tokio::test]
async fn index_after_n_advances_is_capped_at_catalog_length() {
    let names = ["a", "b", "c", "d"];
    for n in 0..=7_usize {
        let (controller, repo) = controller(&names);
        let session = Session::start(SessionId::generate(), fixed_clock().now());
        repo.create_session(&session).await.unwrap();

        let mut successes = 0;
        for _ in 0..n {
            if controller.next_question(session.id()).await.is_ok() {
                successes += 1;
            }
        }

        let stored = repo.get_session(session.id()).await.unwrap();
        let expected = n.min(names.len());
        assert_eq!(successes, expected);
        assert_eq!(stored.current_question_index() as usize, expected);
    }
}

#[tokio::test]
async fn start_always_hands_out_fresh_ids() {
    let (controller, _repo) = controller(&["only"]);
    let mut seen = HashSet::new();
    for _ in 0..50 {
        let issued = controller.start().await.unwrap();
        assert_eq!(issued.position(), 0);
        assert!(seen.insert(issued.session_id()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_advances_issue_each_question_once() {
    let names: Vec<String> = (0..20).map(|i| format!("q{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (controller, repo) = controller(&refs);
    let session = Session::start(SessionId::generate(), fixed_clock().now());
    repo.create_session(&session).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let controller = controller.clone();
        let id = session.id();
        handles.push(tokio::spawn(async move {
            let mut issued = Vec::new();
            loop {
                match controller.next_question(id).await {
                    Ok(q) => issued.push(q.position()),
                    Err(QuestionnaireError::NoMoreQuestions { .. }) => break,
                    Err(QuestionnaireError::Contended { .. }) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            issued
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort_unstable();
    assert_eq!(all, (0..20).collect::<Vec<_>>());
    assert_eq!(
        repo.get_session(session.id()).await.unwrap().current_question_index(),
        20
    );
}

/// Session store whose compare-and-swap always loses.
struct AlwaysRacing {
    inner: InMemoryRepository,
}

#[async_trait::async_trait]
impl SessionRepository for AlwaysRacing {
    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        self.inner.create_session(session).await
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        self.inner.get_session(id).await
    }

    async fn advance_session(
        &self,
        _id: SessionId,
        _expected: u32,
        _next: u32,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Conflict)
    }
}

#[tokio::test]
async fn persistent_races_surface_as_retryable_contention() {
    let inner = InMemoryRepository::new();
    let controller = SessionController::new(
        fixed_clock(),
        catalog(&["q0", "q1"]),
        Arc::new(AlwaysRacing {
            inner: inner.clone(),
        }),
        Arc::new(inner.clone()),
    );

    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, QuestionnaireError::Contended { attempts, .. } if attempts > 1));
    assert!(err.is_retryable());
}

/// Session store that is down.
struct Unavailable;

#[async_trait::async_trait]
impl SessionRepository for Unavailable {
    async fn create_session(&self, _session: &Session) -> Result<(), StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }

    async fn get_session(&self, _id: SessionId) -> Result<Session, StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }

    async fn advance_session(
        &self,
        _id: SessionId,
        _expected: u32,
        _next: u32,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("database is down".into()))
    }
}

#[tokio::test]
async fn storage_outage_is_a_retryable_storage_error() {
    let controller = SessionController::new(
        fixed_clock(),
        catalog(&["q0"]),
        Arc::new(Unavailable),
        Arc::new(InMemoryRepository::new()),
    );

    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, QuestionnaireError::Storage(StorageError::Connection(_))));
    assert!(err.is_retryable());

    let err = controller.resume(SessionId::generate()).await.unwrap_err();
    assert!(matches!(err, QuestionnaireError::Storage(_)));
}
