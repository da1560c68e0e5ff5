//! `SQLite` adapter for study content and the progress log.
//!
//! One `SqliteRepository` serves every storage trait: decks and quizzes live
//! in `study_items` with their `cards` / `questions`, and progress is
//! append-only rows in `flash_reviews`, `quiz_attempts` and `xp_events`.

use std::time::Duration;

use sqlx::{SqliteConnection, SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod content_repo;
mod mapping;
mod migrate;
mod progress_repo;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
/// A writer waits this long on a locked database (the seed binary may run alongside).
const BUSY_TIMEOUT_PRAGMA: &str = "PRAGMA busy_timeout = 5000;";

/// Study item and progress store backed by an `SQLite` pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Per-connection settings: cascade deletes of cards/questions need foreign keys.
async fn configure_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(&mut *conn)
        .await?;
    sqlx::query(BUSY_TIMEOUT_PRAGMA)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl SqliteRepository {
    /// Open the study database at `database_url`.
    ///
    /// The schema is not touched; call [`SqliteRepository::migrate`] or use
    /// [`Storage::sqlite`] to get a ready store.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or a
    /// connection pragma fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .after_connect(|conn, _meta| Box::pin(configure_connection(conn)))
            .connect(database_url)
            .await?;
        tracing::debug!(database_url, "study database opened");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the study schema up to date. Safe to run on every start.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Open and migrate the study database, exposing it through every
    /// storage trait.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if opening or migrating fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self::from_repo(repo))
    }
}
