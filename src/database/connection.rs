use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite extended result code for `SQLITE_CONSTRAINT_UNIQUE`.
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DatabaseManager {
    pub pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_timeout(database_url, DEFAULT_TIMEOUT).await
    }

    /// Opens the pool. `timeout` bounds both pool acquisition and SQLite's
    /// wait on a locked database, so writers queue instead of failing fast.
    pub async fn with_timeout(database_url: &str, timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(timeout);

        info!("Opening database {}", database_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Path of the database file behind a `sqlite:` URL, if it names one.
pub fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

/// SQLite creates missing files but not missing directories.
pub fn ensure_parent_dir(database_url: &str) -> Result<()> {
    if let Some(parent) = sqlite_file_path(database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating directory {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE)
                || db_err.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}
