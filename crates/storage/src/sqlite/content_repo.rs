use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use study_core::model::{Card, ItemId, Question};

use super::{
    SqliteRepository,
    mapping::{conn, id_i64, map_card_row, map_question_row, parse_item_kind, ser, usize_i64},
};
use crate::repository::{ContentSource, ContentWriter, StorageError, StudyItemKind};

impl SqliteRepository {
    async fn item_kind(&self, item_id: i64) -> Result<Option<StudyItemKind>, StorageError> {
        let row = sqlx::query("SELECT kind FROM study_items WHERE id = ?1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.map(|r| parse_item_kind(r.try_get::<String, _>("kind").map_err(ser)?.as_str()))
            .transpose()
    }

    async fn require_kind(&self, item_id: i64, kind: StudyItemKind) -> Result<(), StorageError> {
        match self.item_kind(item_id).await? {
            Some(found) if found == kind => Ok(()),
            _ => Err(StorageError::NotFound),
        }
    }
}

/// Upsert the item row, refusing to change its kind.
async fn upsert_item(
    tx: &mut Transaction<'_, Sqlite>,
    item_id: i64,
    kind: StudyItemKind,
    title: &str,
) -> Result<(), StorageError> {
    let existing = sqlx::query("SELECT kind FROM study_items WHERE id = ?1")
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(conn)?;
    if let Some(row) = existing {
        let found = parse_item_kind(row.try_get::<String, _>("kind").map_err(ser)?.as_str())?;
        if found != kind {
            return Err(StorageError::Conflict);
        }
    }

    sqlx::query(
        r"
            INSERT INTO study_items (id, kind, title, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at
        ",
    )
    .bind(item_id)
    .bind(kind.as_str())
    .bind(title)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(conn)?;
    Ok(())
}

#[async_trait::async_trait]
impl ContentSource for SqliteRepository {
    async fn load_cards(&self, item_id: ItemId) -> Result<Vec<Card>, StorageError> {
        let id = id_i64("item_id", item_id.value())?;
        self.require_kind(id, StudyItemKind::Deck).await?;

        let rows = sqlx::query(
            r"
                SELECT front, back
                FROM cards
                WHERE item_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_card_row(&row)?);
        }
        tracing::debug!(%item_id, cards = out.len(), "loaded deck");
        Ok(out)
    }

    async fn load_questions(&self, item_id: ItemId) -> Result<Vec<Question>, StorageError> {
        let id = id_i64("item_id", item_id.value())?;
        self.require_kind(id, StudyItemKind::Quiz).await?;

        let rows = sqlx::query(
            r"
                SELECT body
                FROM questions
                WHERE item_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        tracing::debug!(%item_id, questions = out.len(), "loaded quiz");
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ContentWriter for SqliteRepository {
    async fn save_deck(
        &self,
        item_id: ItemId,
        title: &str,
        cards: &[Card],
    ) -> Result<(), StorageError> {
        let id = id_i64("item_id", item_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        upsert_item(&mut tx, id, StudyItemKind::Deck, title).await?;

        sqlx::query("DELETE FROM cards WHERE item_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, card) in cards.iter().enumerate() {
            sqlx::query(
                r"
                    INSERT INTO cards (item_id, position, front, back)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(id)
            .bind(usize_i64("position", position)?)
            .bind(card.front())
            .bind(card.back())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn save_quiz(
        &self,
        item_id: ItemId,
        title: &str,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        let id = id_i64("item_id", item_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        upsert_item(&mut tx, id, StudyItemKind::Quiz, title).await?;

        sqlx::query("DELETE FROM questions WHERE item_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in questions.iter().enumerate() {
            let body = serde_json::to_string(question).map_err(ser)?;
            sqlx::query(
                r"
                    INSERT INTO questions (item_id, position, kind, body)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(id)
            .bind(usize_i64("position", position)?)
            .bind(question.kind().as_str())
            .bind(body)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
