use std::path::Path;
use std::sync::Arc;

use slinky_core::model::QuestionCatalog;
use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::error::AppServicesError;
use crate::questionnaire::SessionController;

/// Assembles app-facing services over a storage backend and a loaded catalog.
#[derive(Clone)]
pub struct AppServices {
    controller: Arc<SessionController>,
}

impl AppServices {
    /// Load the catalog at `catalog_path` and open `SQLite` storage at `db_url`.
    ///
    /// The catalog is loaded first so a broken catalog fails startup before
    /// anything touches the database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the catalog is missing or
    /// malformed, or `AppServicesError::Sqlite` if storage initialization fails.
    pub async fn bootstrap(
        db_url: &str,
        catalog_path: &Path,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let catalog = QuestionCatalog::load(catalog_path)?;
        info!(
            path = %catalog_path.display(),
            questions = catalog.len(),
            "loaded question catalog"
        );
        Self::new_sqlite(db_url, catalog, clock).await
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        catalog: QuestionCatalog,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(&storage, catalog, clock))
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(catalog: QuestionCatalog, clock: Clock) -> Self {
        Self::with_storage(&Storage::in_memory(), catalog, clock)
    }

    #[must_use]
    pub fn with_storage(storage: &Storage, catalog: QuestionCatalog, clock: Clock) -> Self {
        let controller = Arc::new(SessionController::new(
            clock,
            Arc::new(catalog),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.answers),
        ));
        Self { controller }
    }

    #[must_use]
    pub fn controller(&self) -> Arc<SessionController> {
        Arc::clone(&self.controller)
    }
}
