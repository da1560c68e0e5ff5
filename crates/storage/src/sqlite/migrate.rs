use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 holds study content (items, cards, questions) and the progress
/// log (flash reviews, quiz attempts, XP events).
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS study_items (
                id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL CHECK (kind IN ('deck', 'quiz')),
                title TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS cards (
                item_id INTEGER NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                PRIMARY KEY (item_id, position),
                FOREIGN KEY (item_id) REFERENCES study_items(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    // `body` is the serde JSON of the question, tagged by variant.
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS questions (
                item_id INTEGER NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                kind TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (item_id, position),
                FOREIGN KEY (item_id) REFERENCES study_items(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS flash_reviews (
                id INTEGER PRIMARY KEY,
                item_id INTEGER NOT NULL,
                card_index INTEGER NOT NULL CHECK (card_index >= 0),
                known INTEGER NOT NULL CHECK (known IN (0, 1)),
                reviewed_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id INTEGER PRIMARY KEY,
                item_id INTEGER NOT NULL,
                correct INTEGER NOT NULL CHECK (correct >= 0),
                total INTEGER NOT NULL CHECK (total >= correct),
                attempted_at TEXT NOT NULL,
                history TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS xp_events (
                id INTEGER PRIMARY KEY,
                item_id INTEGER,
                xp INTEGER NOT NULL CHECK (xp >= 0),
                occurred_at TEXT NOT NULL,
                reason TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_quiz_attempts_item_attempted
                ON quiz_attempts (item_id, attempted_at);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_xp_events_occurred
                ON xp_events (occurred_at);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!("applied schema migration 1");

    Ok(())
}
