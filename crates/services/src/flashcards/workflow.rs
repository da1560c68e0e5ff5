use std::sync::Arc;

use storage::repository::{ContentSource, ProgressRecorder, StorageError};
use study_core::model::{FlashReviewRecord, ItemId};

use super::session::{FlashJudgment, FlashcardSession};
use crate::Clock;
use crate::error::SessionError;

/// Result of judging a single card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashcardAnswerResult {
    pub judgment: FlashJudgment,
    pub is_complete: bool,
}

/// Orchestrates deck loading and best-effort review recording.
#[derive(Clone)]
pub struct FlashcardLoopService {
    clock: Clock,
    content: Arc<dyn ContentSource>,
    recorder: Option<Arc<dyn ProgressRecorder>>,
}

impl FlashcardLoopService {
    #[must_use]
    pub fn new(clock: Clock, content: Arc<dyn ContentSource>) -> Self {
        Self {
            clock,
            content,
            recorder: None,
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ProgressRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Load a deck and start a fresh run over it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the deck cannot be loaded, or
    /// `SessionError::Empty` if it has no cards.
    pub async fn start_session(&self, item_id: ItemId) -> Result<FlashcardSession, SessionError> {
        let cards = self.content.load_cards(item_id).await?;
        tracing::debug!(%item_id, cards = cards.len(), "starting flashcard session");
        FlashcardSession::new(item_id, cards)
    }

    /// Mark a card known, then record the review.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the judgment itself is invalid. Recording never fails the call.
    pub async fn judge_known(
        &self,
        session: &mut FlashcardSession,
        index: usize,
    ) -> Result<FlashcardAnswerResult, SessionError> {
        let judgment = session.judge_known(index)?;
        self.finish_judgment(session, judgment).await
    }

    /// Mark a card for another pass, then record the review.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the judgment itself is invalid. Recording never fails the call.
    pub async fn judge_again(
        &self,
        session: &mut FlashcardSession,
        index: usize,
    ) -> Result<FlashcardAnswerResult, SessionError> {
        let judgment = session.judge_again(index)?;
        self.finish_judgment(session, judgment).await
    }

    async fn finish_judgment(
        &self,
        session: &FlashcardSession,
        judgment: FlashJudgment,
    ) -> Result<FlashcardAnswerResult, SessionError> {
        tracing::debug!(
            item_id = %session.item_id(),
            card_index = judgment.card_index,
            known = judgment.known,
            remaining = session.order().len(),
            "flashcard judged"
        );

        // Best-effort: the in-memory session is authoritative.
        let _ = self.record(session.item_id(), judgment).await;

        Ok(FlashcardAnswerResult {
            judgment,
            is_complete: session.is_complete(),
        })
    }

    async fn record(&self, item_id: ItemId, judgment: FlashJudgment) -> Result<(), StorageError> {
        let Some(recorder) = &self.recorder else {
            return Ok(());
        };

        let review = FlashReviewRecord {
            item_id,
            card_index: judgment.card_index,
            known: judgment.known,
            reviewed_at: self.clock.now(),
        };
        let result = recorder.record_flash_review(&review).await;
        if let Err(err) = &result {
            tracing::warn!(
                error = %err,
                %item_id,
                card_index = judgment.card_index,
                "failed to record flashcard review"
            );
        }
        result
    }
}
