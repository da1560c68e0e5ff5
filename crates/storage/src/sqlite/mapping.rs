use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::model::{
    Card, FlashReviewRecord, ItemId, Question, QuizAttemptRecord, QuizHistory, XpEvent,
};

use crate::repository::{StorageError, StudyItemKind};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn usize_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn item_id_from_i64(v: i64) -> Result<ItemId, StorageError> {
    Ok(ItemId::new(i64_to_u64("item_id", v)?))
}

pub(crate) fn parse_item_kind(s: &str) -> Result<StudyItemKind, StorageError> {
    match s {
        "deck" => Ok(StudyItemKind::Deck),
        "quiz" => Ok(StudyItemKind::Quiz),
        _ => Err(StorageError::Serialization(format!("invalid item kind: {s}"))),
    }
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Card, StorageError> {
    let front: String = row.try_get("front").map_err(ser)?;
    let back: String = row.try_get("back").map_err(ser)?;
    Card::new(front, back).map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let body: String = row.try_get("body").map_err(ser)?;
    serde_json::from_str(&body).map_err(ser)
}

pub(crate) fn map_flash_review_row(row: &SqliteRow) -> Result<FlashReviewRecord, StorageError> {
    let card_index: i64 = row.try_get("card_index").map_err(ser)?;
    Ok(FlashReviewRecord {
        item_id: item_id_from_i64(row.try_get("item_id").map_err(ser)?)?,
        card_index: usize::try_from(card_index)
            .map_err(|_| StorageError::Serialization(format!("invalid card_index: {card_index}")))?,
        known: row.try_get("known").map_err(ser)?,
        reviewed_at: row.try_get("reviewed_at").map_err(ser)?,
    })
}

pub(crate) fn map_quiz_attempt_row(row: &SqliteRow) -> Result<QuizAttemptRecord, StorageError> {
    let history: String = row.try_get("history").map_err(ser)?;
    let history: QuizHistory = serde_json::from_str(&history).map_err(ser)?;
    let attempted_at: DateTime<Utc> = row.try_get("attempted_at").map_err(ser)?;

    Ok(QuizAttemptRecord {
        item_id: item_id_from_i64(row.try_get("item_id").map_err(ser)?)?,
        correct: u32_from_i64("correct", row.try_get("correct").map_err(ser)?)?,
        total: u32_from_i64("total", row.try_get("total").map_err(ser)?)?,
        attempted_at,
        history,
    })
}

pub(crate) fn map_xp_event_row(row: &SqliteRow) -> Result<XpEvent, StorageError> {
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(ser)?;
    let item_id = row
        .try_get::<Option<i64>, _>("item_id")
        .map_err(ser)?
        .map(item_id_from_i64)
        .transpose()?;

    Ok(XpEvent::new(
        item_id,
        u32_from_i64("xp", row.try_get("xp").map_err(ser)?)?,
        &occurred_at,
        row.try_get::<String, _>("reason").map_err(ser)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_parses_known_values() {
        assert_eq!(parse_item_kind("deck").unwrap(), StudyItemKind::Deck);
        assert_eq!(parse_item_kind("quiz").unwrap(), StudyItemKind::Quiz);
        assert!(matches!(
            parse_item_kind("folder"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(item_id_from_i64(-1).is_err());
        assert_eq!(item_id_from_i64(7).unwrap(), ItemId::new(7));
    }
}
