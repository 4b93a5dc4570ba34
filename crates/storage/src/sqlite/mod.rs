use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{AnswerRepository, SessionRepository, Storage};

mod answer_repo;
mod mapping;
mod migrate;
mod session_repo;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("not a sqlite database url (scheme {scheme:?})")]
    NotSqlite { scheme: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open a pool on `database_url`.
    ///
    /// Accepts `sqlite::memory:`, `sqlite://path` and `sqlite:file:name?mode=memory&cache=shared`
    /// URLs. A missing database file is created; its directory must exist.
    /// Connections enforce foreign keys, run in WAL mode and wait on a busy
    /// database instead of failing, so concurrent advances of one session
    /// resolve as compare-and-swap conflicts rather than lock errors.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::NotSqlite` for a URL of another database and
    /// `SqliteInitError::Sqlx` if the URL does not parse or no connection can be
    /// opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        if !database_url.starts_with("sqlite:") {
            let scheme = database_url.split(':').next().unwrap_or_default();
            return Err(SqliteInitError::NotSqlite {
                scheme: scheme.to_owned(),
            });
        }
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;
        tracing::debug!(database_url, "sqlite pool connected");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let answers: Arc<dyn AnswerRepository> = Arc::new(repo);
        Ok(Self { sessions, answers })
    }
}
