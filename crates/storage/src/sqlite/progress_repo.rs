use study_core::model::{FlashReviewRecord, QuizAttemptRecord, XpEvent};

use super::{
    SqliteRepository,
    mapping::{
        conn, id_i64, map_flash_review_row, map_quiz_attempt_row, map_xp_event_row, ser,
        usize_i64,
    },
};
use crate::repository::{ProgressQueries, ProgressRecorder, StorageError};

#[async_trait::async_trait]
impl ProgressRecorder for SqliteRepository {
    async fn record_flash_review(&self, review: &FlashReviewRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO flash_reviews (item_id, card_index, known, reviewed_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_i64("item_id", review.item_id.value())?)
        .bind(usize_i64("card_index", review.card_index)?)
        .bind(review.known)
        .bind(review.reviewed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn record_quiz_attempt(&self, attempt: &QuizAttemptRecord) -> Result<(), StorageError> {
        if attempt.correct > attempt.total {
            return Err(StorageError::Conflict);
        }
        let history = serde_json::to_string(&attempt.history).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO quiz_attempts (item_id, correct, total, attempted_at, history)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_i64("item_id", attempt.item_id.value())?)
        .bind(i64::from(attempt.correct))
        .bind(i64::from(attempt.total))
        .bind(attempt.attempted_at)
        .bind(history)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn record_xp(&self, event: &XpEvent) -> Result<(), StorageError> {
        let item_id = event
            .item_id
            .map(|id| id_i64("item_id", id.value()))
            .transpose()?;

        sqlx::query(
            r"
                INSERT INTO xp_events (item_id, xp, occurred_at, reason)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(item_id)
        .bind(i64::from(event.xp))
        .bind(event.occurred_at)
        .bind(event.reason.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressQueries for SqliteRepository {
    async fn quiz_attempts(&self) -> Result<Vec<QuizAttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT item_id, correct, total, attempted_at, history
                FROM quiz_attempts
                ORDER BY attempted_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_attempt_row).collect()
    }

    async fn flash_reviews(&self) -> Result<Vec<FlashReviewRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT item_id, card_index, known, reviewed_at
                FROM flash_reviews
                ORDER BY reviewed_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_flash_review_row).collect()
    }

    async fn xp_events(&self) -> Result<Vec<XpEvent>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT item_id, xp, occurred_at, reason
                FROM xp_events
                ORDER BY occurred_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_xp_event_row).collect()
    }
}
