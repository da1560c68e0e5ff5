use std::collections::BTreeSet;
use std::fmt;

use study_core::model::{Card, ItemId};

use crate::error::SessionError;

/// How many queue slots ahead a card marked "again" is reinserted.
pub const REQUEUE_OFFSET: usize = 4;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// A judgment applied to one card, by original deck index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashJudgment {
    pub card_index: usize,
    pub known: bool,
}

/// End-of-run counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashcardSummary {
    pub known_count: usize,
    pub not_known_count: usize,
    pub total: usize,
}

/// Aggregated view of deck progress, useful for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashcardProgress {
    pub total: usize,
    pub remaining: usize,
    pub known: usize,
    pub again: usize,
    pub is_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory study run over one deck.
///
/// `order` holds original card indices still pending. Known cards are retired
/// from it; cards marked "again" are moved [`REQUEUE_OFFSET`] slots further
/// back. The run is complete once `order` is empty.
pub struct FlashcardSession {
    item_id: ItemId,
    cards: Vec<Card>,
    order: Vec<usize>,
    cursor: usize,
    known: BTreeSet<usize>,
    again: BTreeSet<usize>,
    revealed: bool,
}

impl FlashcardSession {
    /// Start a run over `cards` in deck order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no cards are provided.
    pub fn new(item_id: ItemId, cards: Vec<Card>) -> Result<Self, SessionError> {
        if cards.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            item_id,
            order: (0..cards.len()).collect(),
            cards,
            cursor: 0,
            known: BTreeSet::new(),
            again: BTreeSet::new(),
            revealed: false,
        })
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    #[must_use]
    pub fn known(&self) -> &BTreeSet<usize> {
        &self.known
    }

    #[must_use]
    pub fn again(&self) -> &BTreeSet<usize> {
        &self.again
    }

    /// Original index of the card under the cursor.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    /// The card under the cursor.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` once every card has been retired.
    pub fn current(&self) -> Result<&Card, SessionError> {
        self.current_index()
            .map(|index| &self.cards[index])
            .ok_or(SessionError::EmptyDeck)
    }

    pub fn reveal(&mut self) {
        self.revealed = !self.revealed;
    }

    pub fn prev(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        self.revealed = false;
    }

    pub fn next(&mut self) {
        if self.cursor + 1 < self.order.len() {
            self.cursor += 1;
        }
        self.revealed = false;
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.order.is_empty()
    }

    /// Mark a card known and retire it for the rest of the run.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` if the run is complete, or
    /// `SessionError::UnknownCard` if `index` is not pending.
    pub fn judge_known(&mut self, index: usize) -> Result<FlashJudgment, SessionError> {
        let slot = self.slot_of(index)?;

        self.again.remove(&index);
        self.known.insert(index);
        self.order.remove(slot);
        self.settle();

        Ok(FlashJudgment {
            card_index: index,
            known: true,
        })
    }

    /// Mark a card for another pass and push it [`REQUEUE_OFFSET`] slots back.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` if the run is complete, or
    /// `SessionError::UnknownCard` if `index` is not pending.
    pub fn judge_again(&mut self, index: usize) -> Result<FlashJudgment, SessionError> {
        let slot = self.slot_of(index)?;

        if !self.known.contains(&index) {
            self.again.insert(index);
        }
        let card = self.order.remove(slot);
        let target = (slot + REQUEUE_OFFSET).min(self.order.len());
        self.order.insert(target, card);
        self.settle();

        Ok(FlashJudgment {
            card_index: index,
            known: false,
        })
    }

    pub fn restart(&mut self) {
        self.order = (0..self.cards.len()).collect();
        self.known.clear();
        self.again.clear();
        self.cursor = 0;
        self.revealed = false;
    }

    #[must_use]
    pub fn summary(&self) -> FlashcardSummary {
        FlashcardSummary {
            known_count: self.known.len(),
            not_known_count: self.again.difference(&self.known).count(),
            total: self.cards.len(),
        }
    }

    #[must_use]
    pub fn progress(&self) -> FlashcardProgress {
        FlashcardProgress {
            total: self.cards.len(),
            remaining: self.order.len(),
            known: self.known.len(),
            again: self.again.len(),
            is_complete: self.is_complete(),
        }
    }

    /// Queue slot holding `index`: the cursor slot if it matches, else the first occurrence.
    fn slot_of(&self, index: usize) -> Result<usize, SessionError> {
        if self.order.is_empty() {
            return Err(SessionError::EmptyDeck);
        }
        if self.order.get(self.cursor) == Some(&index) {
            return Ok(self.cursor);
        }
        self.order
            .iter()
            .position(|&i| i == index)
            .ok_or(SessionError::UnknownCard { index })
    }

    fn settle(&mut self) {
        self.cursor = self.cursor.min(self.order.len().saturating_sub(1));
        self.revealed = false;
    }
}

impl fmt::Debug for FlashcardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashcardSession")
            .field("item_id", &self.item_id)
            .field("cards_len", &self.cards.len())
            .field("order", &self.order)
            .field("cursor", &self.cursor)
            .field("known", &self.known)
            .field("again", &self.again)
            .field("revealed", &self.revealed)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(n: usize) -> FlashcardSession {
        let cards = (0..n)
            .map(|i| Card::new(format!("term {i}"), format!("definition {i}")).unwrap())
            .collect();
        FlashcardSession::new(ItemId::new(1), cards).unwrap()
    }

    #[test]
    fn empty_deck_cannot_start() {
        let err = FlashcardSession::new(ItemId::new(1), Vec::new()).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn judging_off_cursor_card_uses_its_queue_slot() {
        let mut session = deck(6);
        session.judge_again(3).unwrap();
        assert_eq!(session.order(), &[0, 1, 2, 4, 5, 3]);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.current_index(), Some(0));

        session.next();
        session.next();
        session.judge_known(4).unwrap();
        assert_eq!(session.order(), &[0, 1, 2, 5, 3]);
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.current_index(), Some(2));
        assert!(session.known().contains(&4));
        assert!(session.again().contains(&3));
    }

    #[test]
    fn judging_every_card_known_completes_the_deck() {
        for n in 1..=7 {
            let mut session = deck(n);
            for i in 0..n {
                session.judge_known(i).unwrap();
            }
            assert!(session.is_complete());
            assert_eq!(session.summary().known_count, n);
            assert_eq!(session.summary().not_known_count, 0);
            assert!(matches!(session.current(), Err(SessionError::EmptyDeck)));
        }
    }

    #[test]
    fn again_requeues_four_slots_ahead() {
        let mut session = deck(6);
        session.judge_again(0).unwrap();
        assert_eq!(session.order(), &[1, 2, 3, 4, 0, 5]);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.current_index(), Some(1));
    }

    #[test]
    fn again_near_the_end_goes_last() {
        let mut session = deck(3);
        session.judge_again(0).unwrap();
        assert_eq!(session.order(), &[1, 2, 0]);

        let mut single = deck(1);
        single.judge_again(0).unwrap();
        assert_eq!(single.order(), &[0]);
        assert!(!single.is_complete());
    }

    #[test]
    fn again_then_known_restores_exclusivity() {
        let mut session = deck(3);
        session.judge_again(1).unwrap();
        assert!(session.again().contains(&1));

        session.judge_known(1).unwrap();
        assert!(session.known().contains(&1));
        assert!(!session.again().contains(&1));
        assert_eq!(session.summary().not_known_count, 0);
    }

    #[test]
    fn judging_at_last_slot_clamps_cursor() {
        let mut session = deck(3);
        session.next();
        session.next();
        assert_eq!(session.cursor(), 2);

        session.judge_known(2).unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.current_index(), Some(1));
    }

    #[test]
    fn judgment_prefers_the_cursor_slot() {
        let mut session = deck(6);
        session.next();
        let judged = session.judge_again(1).unwrap();
        assert_eq!(judged.card_index, 1);
        assert_eq!(session.order(), &[0, 2, 3, 4, 5, 1]);
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn unknown_or_retired_card_is_rejected() {
        let mut session = deck(2);
        session.judge_known(0).unwrap();
        let err = session.judge_known(0).unwrap_err();
        assert!(matches!(err, SessionError::UnknownCard { index: 0 }));
        assert_eq!(session.order(), &[1]);
    }

    #[test]
    fn judging_a_complete_deck_is_empty_deck() {
        let mut session = deck(1);
        session.judge_known(0).unwrap();
        assert!(matches!(session.judge_again(0), Err(SessionError::EmptyDeck)));
    }

    #[test]
    fn reveal_toggles_and_navigation_resets() {
        let mut session = deck(3);
        session.reveal();
        assert!(session.is_revealed());
        session.reveal();
        assert!(!session.is_revealed());

        session.reveal();
        session.next();
        assert!(!session.is_revealed());
        assert_eq!(session.cursor(), 1);

        session.reveal();
        session.prev();
        assert!(!session.is_revealed());
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn navigation_is_clamped() {
        let mut session = deck(2);
        session.prev();
        assert_eq!(session.cursor(), 0);
        session.next();
        session.next();
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn reveal_changes_nothing_else() {
        let mut session = deck(3);
        session.next();
        let before = (session.order().to_vec(), session.cursor());
        session.reveal();
        assert_eq!((session.order().to_vec(), session.cursor()), before);
    }

    #[test]
    fn restart_resets_everything() {
        let mut session = deck(4);
        session.judge_known(0).unwrap();
        session.judge_again(1).unwrap();
        session.reveal();

        session.restart();

        assert_eq!(session.order(), &[0, 1, 2, 3]);
        assert!(session.known().is_empty());
        assert!(session.again().is_empty());
        assert_eq!(session.cursor(), 0);
        assert!(!session.is_revealed());
    }

    #[test]
    fn summary_counts_again_not_known() {
        let mut session = deck(5);
        session.judge_again(0).unwrap();
        session.judge_again(1).unwrap();
        session.judge_known(2).unwrap();

        let summary = session.summary();
        assert_eq!(summary.known_count, 1);
        assert_eq!(summary.not_known_count, 2);
        assert_eq!(summary.total, 5);

        let progress = session.progress();
        assert_eq!(progress.remaining, 4);
        assert!(!progress.is_complete);
    }

    #[test]
    fn order_never_holds_duplicates() {
        let mut session = deck(5);
        for _ in 0..12 {
            let index = session.current_index().unwrap();
            session.judge_again(index).unwrap();
            let mut seen = session.order().to_vec();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), session.order().len());
        }
        assert_eq!(session.order().len(), 5);
    }
}
