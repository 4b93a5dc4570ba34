//! Command-line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("--db must be a sqlite URL or file path, got a {scheme} URL")]
    UnsupportedDb { scheme: String },
    #[error("invalid --bind address: {raw}")]
    InvalidBind { raw: String },
    #[error("failed to prepare sqlite directory {path}: {source}")]
    PrepareDb {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

const DEFAULT_DB: &str = "sqlite://slinky.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "slinky")]
#[command(about = "Session-driven questionnaire service")]
pub struct Args {
    /// SQLite database URL or file path (falls back to DATABASE_URL)
    #[arg(long = "db", env = "SLINKY_DB_URL")]
    pub db: Option<String>,

    /// YAML question catalog loaded at startup
    #[arg(long, env = "SLINKY_QUESTIONS", default_value = "questions.yaml")]
    pub questions: PathBuf,

    /// Address to bind the server to
    #[arg(long, env = "SLINKY_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    /// Port to listen on
    #[arg(long, env = "SLINKY_PORT", default_value = "5000")]
    pub port: u16,
}

/// Where the answers live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    /// An in-memory database, passed to the pool unchanged.
    Memory { url: String },
    /// A database file, addressed by an absolute `sqlite://` URL.
    File { url: String, path: PathBuf },
}

impl Database {
    /// Parse one of the accepted forms:
    ///
    /// - `sqlite::memory:`
    /// - `sqlite:file:NAME?mode=memory[&cache=shared]`
    /// - `sqlite://PATH[?params]`, `sqlite:PATH[?params]`, `sqlite:file:PATH[?params]`
    /// - a bare file path
    ///
    /// Relative paths are resolved against the working directory.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDb` for a URL with any other scheme and
    /// `InvalidDbUrl` for a blank value or a URL without a path.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let invalid = || ConfigError::InvalidDbUrl {
            raw: raw.to_owned(),
        };
        if raw.is_empty() {
            return Err(invalid());
        }

        let location = match raw.strip_prefix("sqlite:") {
            Some(rest) => rest.strip_prefix("//").unwrap_or(rest),
            None => match url_scheme(raw) {
                Some(scheme) => {
                    return Err(ConfigError::UnsupportedDb {
                        scheme: scheme.to_owned(),
                    });
                }
                None => raw,
            },
        };
        let location = location.strip_prefix("file:").unwrap_or(location);
        let (path, params) = match location.split_once('?') {
            Some((path, params)) => (path, Some(params)),
            None => (location, None),
        };

        let in_memory = path == ":memory:"
            || params.is_some_and(|p| p.split('&').any(|kv| kv == "mode=memory"));
        if in_memory {
            return Ok(Self::Memory {
                url: raw.to_owned(),
            });
        }
        if path.is_empty() {
            return Err(invalid());
        }

        let path = absolute(Path::new(path));
        let url = match params {
            Some(params) => format!("sqlite://{}?{params}", path.display()),
            None => format!("sqlite://{}", path.display()),
        };
        Ok(Self::File { url, path })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Memory { url } | Self::File { url, .. } => url,
        }
    }

    /// Create the directory holding the database file. The pool creates the file itself.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PrepareDb` if the directory cannot be created.
    pub fn prepare(&self) -> Result<(), ConfigError> {
        let Self::File { path, .. } = self else {
            return Ok(());
        };
        match path.parent() {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|source| ConfigError::PrepareDb {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            None => Ok(()),
        }
    }
}

/// The scheme of `raw` when it looks like `scheme:...`.
///
/// Single letters are not schemes so Windows drive paths stay paths.
fn url_scheme(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

/// Resolved settings the server starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db: Database,
    pub questions: PathBuf,
    pub addr: SocketAddr,
}

impl Settings {
    /// Resolve parsed arguments, using `fallback_db` (`DATABASE_URL`) when `--db` is absent.
    ///
    /// `DATABASE_URL` is commonly set for other databases, so a fallback with
    /// a non-sqlite scheme is ignored with a warning and the default file is used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unusable `--db` value or an unparsable bind address.
    pub fn resolve(args: Args, fallback_db: Option<String>) -> Result<Self, ConfigError> {
        let db = match (args.db, fallback_db) {
            (Some(db), _) => Database::parse(&db)?,
            (None, Some(fallback)) => match Database::parse(&fallback) {
                Err(ConfigError::UnsupportedDb { scheme }) => {
                    warn!(%scheme, default = DEFAULT_DB, "ignoring non-sqlite DATABASE_URL");
                    Database::parse(DEFAULT_DB)?
                }
                other => other?,
            },
            (None, None) => Database::parse(DEFAULT_DB)?,
        };

        let ip: IpAddr = args
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind { raw: args.bind.clone() })?;

        Ok(Self {
            db,
            questions: args.questions,
            addr: SocketAddr::new(ip, args.port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("slinky").chain(argv.iter().copied())).unwrap()
    }

    fn defaults() -> Args {
        Args {
            db: None,
            questions: PathBuf::from("questions.yaml"),
            bind: "127.0.0.1".into(),
            port: 5000,
        }
    }

    #[test]
    fn explicit_flags_win() {
        let args = parse(&[
            "--db",
            "sqlite:///tmp/answers.db",
            "--questions",
            "q.yaml",
            "--bind",
            "0.0.0.0",
            "--port",
            "8080",
        ]);
        let settings = Settings::resolve(args, Some("sqlite:///ignored.db".into())).unwrap();
        assert_eq!(settings.db.url(), "sqlite:///tmp/answers.db");
        assert_eq!(settings.questions, PathBuf::from("q.yaml"));
        assert_eq!(settings.addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn falls_back_to_database_url() {
        let settings = Settings::resolve(defaults(), Some("sqlite::memory:".into())).unwrap();
        assert_eq!(settings.db.url(), "sqlite::memory:");
    }

    #[test]
    fn postgres_database_url_falls_back_to_default_file() {
        let settings = Settings::resolve(
            defaults(),
            Some("postgres://user:pw@db.example.com:5432/slinky".into()),
        )
        .unwrap();
        let Database::File { url, path } = &settings.db else {
            panic!("expected a file database, got {:?}", settings.db);
        };
        assert!(path.ends_with("slinky.sqlite3"));
        assert!(path.is_absolute());
        assert!(!url.contains("postgres"));
    }

    #[test]
    fn explicit_postgres_url_is_rejected() {
        let mut args = defaults();
        args.db = Some("postgresql://db.example.com/slinky".into());
        assert!(matches!(
            Settings::resolve(args, None),
            Err(ConfigError::UnsupportedDb { scheme }) if scheme == "postgresql"
        ));
    }

    #[test]
    fn rejects_bad_bind_and_blank_db() {
        let mut args = defaults();
        args.bind = "not-an-ip".into();
        assert!(matches!(
            Settings::resolve(args, None),
            Err(ConfigError::InvalidBind { .. })
        ));

        let mut args = defaults();
        args.db = Some("  ".into());
        assert!(matches!(
            Settings::resolve(args, None),
            Err(ConfigError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn memory_urls_pass_through_untouched() {
        for raw in [
            "sqlite::memory:",
            "sqlite:file:memdb_config?mode=memory&cache=shared",
            "sqlite://file:memdb_config?cache=shared&mode=memory",
        ] {
            assert_eq!(
                Database::parse(raw).unwrap(),
                Database::Memory { url: raw.into() }
            );
        }
    }

    #[test]
    fn file_urls_become_absolute() {
        let db = Database::parse("sqlite:///abs/db.sqlite3").unwrap();
        assert_eq!(db.url(), "sqlite:///abs/db.sqlite3");

        let db = Database::parse("sqlite:/abs/db.sqlite3").unwrap();
        assert_eq!(db.url(), "sqlite:///abs/db.sqlite3");

        let db = Database::parse("sqlite:file:/abs/db.sqlite3?mode=rwc").unwrap();
        assert_eq!(db.url(), "sqlite:///abs/db.sqlite3?mode=rwc");

        let Database::File { url, path } = Database::parse("data/db.sqlite3").unwrap() else {
            panic!("bare path is a file database");
        };
        assert!(url.starts_with("sqlite:///"));
        assert!(path.is_absolute());
        assert!(path.ends_with("data/db.sqlite3"));
    }

    #[test]
    fn urls_without_a_path_are_invalid() {
        for raw in ["sqlite://", "sqlite:", "sqlite://?mode=rwc"] {
            assert!(
                matches!(Database::parse(raw), Err(ConfigError::InvalidDbUrl { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn prepare_creates_the_parent_directory_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/answers.sqlite3");
        let db = Database::parse(&path.display().to_string()).unwrap();

        db.prepare().unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());

        assert!(Database::parse("sqlite::memory:").unwrap().prepare().is_ok());
    }
}
