use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use study_core::model::{Card, FlashReviewRecord, ItemId, Question, QuizAttemptRecord, XpEvent};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// This is also the error a `ProgressRecorder` reports; session code logs it and moves on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// What a study item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudyItemKind {
    Deck,
    Quiz,
}

impl StudyItemKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StudyItemKind::Deck => "deck",
            StudyItemKind::Quiz => "quiz",
        }
    }
}

/// Read side for generated study content.
///
/// Sessions receive fully materialized content; nothing is fetched incrementally.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Load every card of a deck in deck order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn load_cards(&self, item_id: ItemId) -> Result<Vec<Card>, StorageError>;

    /// Load every question of a quiz in quiz order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn load_questions(&self, item_id: ItemId) -> Result<Vec<Question>, StorageError>;
}

/// Write side for study content; used by seeding and tests.
#[async_trait]
pub trait ContentWriter: Send + Sync {
    /// Create or replace a deck and its cards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id belongs to a quiz.
    async fn save_deck(
        &self,
        item_id: ItemId,
        title: &str,
        cards: &[Card],
    ) -> Result<(), StorageError>;

    /// Create or replace a quiz and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id belongs to a deck.
    async fn save_quiz(
        &self,
        item_id: ItemId,
        title: &str,
        questions: &[Question],
    ) -> Result<(), StorageError>;
}

/// Best-effort sink for study outcomes.
///
/// Callers treat every error as non-fatal.
#[async_trait]
pub trait ProgressRecorder: Send + Sync {
    async fn record_flash_review(&self, review: &FlashReviewRecord) -> Result<(), StorageError>;

    async fn record_quiz_attempt(&self, attempt: &QuizAttemptRecord) -> Result<(), StorageError>;

    async fn record_xp(&self, event: &XpEvent) -> Result<(), StorageError>;
}

/// Read side for recorded progress, fed into `study_core::progress`.
#[async_trait]
pub trait ProgressQueries: Send + Sync {
    /// All quiz attempts, oldest first.
    async fn quiz_attempts(&self) -> Result<Vec<QuizAttemptRecord>, StorageError>;

    /// All flashcard reviews, oldest first.
    async fn flash_reviews(&self) -> Result<Vec<FlashReviewRecord>, StorageError>;

    /// All XP events, oldest first.
    async fn xp_events(&self) -> Result<Vec<XpEvent>, StorageError>;
}

#[derive(Debug, Clone)]
enum StoredContent {
    Deck(Vec<Card>),
    Quiz(Vec<Question>),
}

#[derive(Debug, Default)]
struct ProgressLog {
    attempts: Vec<QuizAttemptRecord>,
    reviews: Vec<FlashReviewRecord>,
    xp: Vec<XpEvent>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    content: Arc<Mutex<HashMap<ItemId, (String, StoredContent)>>>,
    progress: Arc<Mutex<ProgressLog>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
        StorageError::Connection(e.to_string())
    }

    fn store(&self, item_id: ItemId, title: &str, content: StoredContent) -> Result<(), StorageError> {
        let mut guard = self.content.lock().map_err(Self::lock_err)?;
        let same_kind = match (guard.get(&item_id), &content) {
            (None, _)
            | (Some((_, StoredContent::Deck(_))), StoredContent::Deck(_))
            | (Some((_, StoredContent::Quiz(_))), StoredContent::Quiz(_)) => true,
            _ => false,
        };
        if !same_kind {
            return Err(StorageError::Conflict);
        }
        guard.insert(item_id, (title.to_owned(), content));
        Ok(())
    }
}

#[async_trait]
impl ContentSource for InMemoryRepository {
    async fn load_cards(&self, item_id: ItemId) -> Result<Vec<Card>, StorageError> {
        let guard = self.content.lock().map_err(Self::lock_err)?;
        match guard.get(&item_id) {
            Some((_, StoredContent::Deck(cards))) => Ok(cards.clone()),
            _ => Err(StorageError::NotFound),
        }
    }

    async fn load_questions(&self, item_id: ItemId) -> Result<Vec<Question>, StorageError> {
        let guard = self.content.lock().map_err(Self::lock_err)?;
        match guard.get(&item_id) {
            Some((_, StoredContent::Quiz(questions))) => Ok(questions.clone()),
            _ => Err(StorageError::NotFound),
        }
    }
}

#[async_trait]
impl ContentWriter for InMemoryRepository {
    async fn save_deck(
        &self,
        item_id: ItemId,
        title: &str,
        cards: &[Card],
    ) -> Result<(), StorageError> {
        self.store(item_id, title, StoredContent::Deck(cards.to_vec()))
    }

    async fn save_quiz(
        &self,
        item_id: ItemId,
        title: &str,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        self.store(item_id, title, StoredContent::Quiz(questions.to_vec()))
    }
}

#[async_trait]
impl ProgressRecorder for InMemoryRepository {
    async fn record_flash_review(&self, review: &FlashReviewRecord) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(Self::lock_err)?;
        guard.reviews.push(review.clone());
        Ok(())
    }

    async fn record_quiz_attempt(&self, attempt: &QuizAttemptRecord) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(Self::lock_err)?;
        guard.attempts.push(attempt.clone());
        Ok(())
    }

    async fn record_xp(&self, event: &XpEvent) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(Self::lock_err)?;
        guard.xp.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressQueries for InMemoryRepository {
    async fn quiz_attempts(&self) -> Result<Vec<QuizAttemptRecord>, StorageError> {
        let guard = self.progress.lock().map_err(Self::lock_err)?;
        Ok(guard.attempts.clone())
    }

    async fn flash_reviews(&self) -> Result<Vec<FlashReviewRecord>, StorageError> {
        let guard = self.progress.lock().map_err(Self::lock_err)?;
        Ok(guard.reviews.clone())
    }

    async fn xp_events(&self) -> Result<Vec<XpEvent>, StorageError> {
        let guard = self.progress.lock().map_err(Self::lock_err)?;
        Ok(guard.xp.clone())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentSource>,
    pub writer: Arc<dyn ContentWriter>,
    pub recorder: Arc<dyn ProgressRecorder>,
    pub progress: Arc<dyn ProgressQueries>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new())
    }

    pub(crate) fn from_repo<R>(repo: R) -> Self
    where
        R: ContentSource + ContentWriter + ProgressRecorder + ProgressQueries + Clone + 'static,
    {
        Self {
            content: Arc::new(repo.clone()),
            writer: Arc::new(repo.clone()),
            recorder: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{FreeResponse, QuizHistory};
    use study_core::time::fixed_now;

    fn cards() -> Vec<Card> {
        vec![
            Card::new("osmosis", "diffusion of water").unwrap(),
            Card::new("mitosis", "cell division").unwrap(),
        ]
    }

    #[tokio::test]
    async fn deck_round_trips_in_order() {
        let repo = InMemoryRepository::new();
        repo.save_deck(ItemId::new(1), "Biology", &cards()).await.unwrap();

        let loaded = repo.load_cards(ItemId::new(1)).await.unwrap();
        assert_eq!(loaded, cards());
    }

    #[tokio::test]
    async fn loading_wrong_kind_is_not_found() {
        let repo = InMemoryRepository::new();
        repo.save_deck(ItemId::new(1), "Biology", &cards()).await.unwrap();

        let err = repo.load_questions(ItemId::new(1)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn saving_quiz_over_deck_conflicts() {
        let repo = InMemoryRepository::new();
        repo.save_deck(ItemId::new(1), "Biology", &cards()).await.unwrap();

        let question: Question = FreeResponse::new("Define osmosis.", "", vec![]).unwrap().into();
        let err = repo
            .save_quiz(ItemId::new(1), "Biology quiz", &[question])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn recorded_progress_is_queryable() {
        let storage = Storage::in_memory();
        storage
            .recorder
            .record_quiz_attempt(&QuizAttemptRecord {
                item_id: ItemId::new(2),
                correct: 1,
                total: 2,
                attempted_at: fixed_now(),
                history: QuizHistory::new(),
            })
            .await
            .unwrap();
        storage
            .recorder
            .record_flash_review(&FlashReviewRecord {
                item_id: ItemId::new(1),
                card_index: 0,
                known: true,
                reviewed_at: fixed_now(),
            })
            .await
            .unwrap();

        assert_eq!(storage.progress.quiz_attempts().await.unwrap().len(), 1);
        assert_eq!(storage.progress.flash_reviews().await.unwrap().len(), 1);
        assert!(storage.progress.xp_events().await.unwrap().is_empty());
    }
}
