use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ItemId;
use crate::progress::passes;
use crate::time::to_utc;

//
// ─── QUIZ OUTCOMES ────────────────────────────────────────────────────────────
//

/// Graded result for one question.
///
/// `was_correct` is `None` when the outcome was rehydrated from a store that
/// only kept scores; [`QuestionOutcome::is_correct`] then falls back to the
/// pass threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub score: u32,
    pub max_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_correct: Option<bool>,
}

impl QuestionOutcome {
    #[must_use]
    pub fn new(score: u32, max_score: u32, was_correct: bool) -> Self {
        Self {
            score,
            max_score,
            was_correct: Some(was_correct),
        }
    }

    /// Outcome without an explicit verdict.
    #[must_use]
    pub fn scored(score: u32, max_score: u32) -> Self {
        Self {
            score,
            max_score,
            was_correct: None,
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.was_correct
            .unwrap_or_else(|| passes(self.score, self.max_score))
    }
}

/// Sparse per-question history keyed by original question index.
pub type QuizHistory = BTreeMap<usize, QuestionOutcome>;

/// One finished quiz run as handed to a progress recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttemptRecord {
    pub item_id: ItemId,
    pub correct: u32,
    pub total: u32,
    pub attempted_at: DateTime<Utc>,
    #[serde(default)]
    pub history: QuizHistory,
}

impl QuizAttemptRecord {
    /// `correct / total`, or 0 when nothing was considered.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }
}

//
// ─── FLASHCARD REVIEWS ────────────────────────────────────────────────────────
//

/// A single known/again judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashReviewRecord {
    pub item_id: ItemId,
    pub card_index: usize,
    pub known: bool,
    pub reviewed_at: DateTime<Utc>,
}

//
// ─── XP ───────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEvent {
    pub item_id: Option<ItemId>,
    pub xp: u32,
    pub occurred_at: DateTime<Utc>,
    pub reason: String,
}

impl XpEvent {
    /// Build an event, normalizing `occurred_at` to UTC.
    #[must_use]
    pub fn new<Tz: TimeZone>(
        item_id: Option<ItemId>,
        xp: u32,
        occurred_at: &DateTime<Tz>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            xp,
            occurred_at: to_utc(occurred_at),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn explicit_verdict_wins_over_threshold() {
        let outcome = QuestionOutcome::new(9, 10, false);
        assert!(!outcome.is_correct());
    }

    #[test]
    fn missing_verdict_uses_threshold() {
        assert!(QuestionOutcome::scored(7, 10).is_correct());
        assert!(!QuestionOutcome::scored(6, 10).is_correct());
        assert!(!QuestionOutcome::scored(0, 0).is_correct());
    }

    #[test]
    fn attempt_ratio_handles_zero_total() {
        let attempt = QuizAttemptRecord {
            item_id: ItemId::new(1),
            correct: 0,
            total: 0,
            attempted_at: fixed_now(),
            history: QuizHistory::new(),
        };
        assert_eq!(attempt.ratio(), 0.0);
    }

    #[test]
    fn history_without_verdict_deserializes() {
        let history: QuizHistory =
            serde_json::from_str(r#"{"0":{"score":8,"max_score":10},"3":{"score":0,"max_score":10,"was_correct":false}}"#)
                .unwrap();
        assert_eq!(history[&0].was_correct, None);
        assert!(history[&0].is_correct());
        assert!(!history[&3].is_correct());
    }
}
