use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// The question catalog could not be loaded; fatal at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("failed to read question catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed question catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("question catalog is empty")]
    Empty,

    #[error("question at position {index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate question name: {name}")]
    DuplicateName { name: String },

    #[error("question {name} uses reserved key {key}")]
    ReservedKey { name: String, key: String },
}

/// Keys the service adds when it issues a question; a catalog entry may not carry them.
pub const RESERVED_KEYS: [&str; 2] = ["sessionId", "position"];

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Ordered, immutable list of questions served to every session.
///
/// A question is addressed by its position; a session index equal to
/// [`QuestionCatalog::len`] means the questionnaire is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Build a catalog from already-parsed questions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Empty` for an empty list, `EmptyName` if a name is
    /// blank, `DuplicateName` if two questions share a name and `ReservedKey`
    /// if a question carries one of [`RESERVED_KEYS`].
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if question.name().trim().is_empty() {
                return Err(CatalogError::EmptyName { index });
            }
            if !seen.insert(question.name()) {
                return Err(CatalogError::DuplicateName {
                    name: question.name().to_owned(),
                });
            }
            if let Some(key) = RESERVED_KEYS
                .into_iter()
                .find(|key| question.extra().contains_key(*key))
            {
                return Err(CatalogError::ReservedKey {
                    name: question.name().to_owned(),
                    key: key.to_owned(),
                });
            }
        }

        Ok(Self { questions })
    }

    /// Parse a YAML document whose top level is a sequence of questions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed YAML, otherwise see [`QuestionCatalog::new`].
    pub fn from_yaml_str(source: &str) -> Result<Self, CatalogError> {
        let questions: Vec<Question> = serde_yaml::from_str(source)?;
        Self::new(questions)
    }

    /// Read and parse the catalog file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise see
    /// [`QuestionCatalog::from_yaml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Position of the question called `name`, if any.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}
