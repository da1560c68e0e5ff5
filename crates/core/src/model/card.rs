use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// A term/definition pair. Immutable once loaded.
///
/// Cards carry no identity of their own: a session refers to a card by its
/// position in the deck it was loaded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CardParts")]
pub struct Card {
    front: String,
    back: String,
}

impl Card {
    /// Build a card, trimming both sides.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyFront` or `CardError::EmptyBack` when a side is blank.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Result<Self, CardError> {
        let front = front.into().trim().to_owned();
        let back = back.into().trim().to_owned();

        if front.is_empty() {
            return Err(CardError::EmptyFront);
        }
        if back.is_empty() {
            return Err(CardError::EmptyBack);
        }

        Ok(Self { front, back })
    }

    #[must_use]
    pub fn front(&self) -> &str {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &str {
        &self.back
    }
}

#[derive(Deserialize)]
struct CardParts {
    front: String,
    back: String,
}

impl TryFrom<CardParts> for Card {
    type Error = CardError;

    fn try_from(parts: CardParts) -> Result<Self, Self::Error> {
        Card::new(parts.front, parts.back)
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card front is empty")]
    EmptyFront,

    #[error("card back is empty")]
    EmptyBack,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_fails_if_front_blank() {
        let err = Card::new("   ", "ok").unwrap_err();
        assert_eq!(err, CardError::EmptyFront);
    }

    #[test]
    fn card_fails_if_back_blank() {
        let err = Card::new("ok", "\n").unwrap_err();
        assert_eq!(err, CardError::EmptyBack);
    }

    #[test]
    fn card_trims_sides() {
        let card = Card::new("  mitochondria ", " powerhouse of the cell\n").unwrap();
        assert_eq!(card.front(), "mitochondria");
        assert_eq!(card.back(), "powerhouse of the cell");
    }

    #[test]
    fn deserialize_rejects_blank_side() {
        let err = serde_json::from_str::<Card>(r#"{"front":"x","back":" "}"#).unwrap_err();
        assert!(err.to_string().contains("card back is empty"));
    }
}
