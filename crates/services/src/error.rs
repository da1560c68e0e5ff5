//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use study_core::model::QuestionKind;

/// Errors emitted by a `Grader`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error("grader is not configured")]
    Disabled,
    #[error("grader returned an empty response")]
    EmptyResponse,
    #[error("grader request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not parse grader reply: {0}")]
    Parse(String),
}

/// Errors emitted by flashcard and quiz sessions.
///
/// Progress recorder failures never show up here; they are logged and dropped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no cards or questions available for session")]
    Empty,
    #[error("deck is complete")]
    EmptyDeck,
    #[error("card {index} is not pending in this deck")]
    UnknownCard { index: usize },
    #[error("question {index} does not exist")]
    UnknownQuestion { index: usize },
    #[error("expected a {expected} question, found {found}")]
    InvalidState {
        expected: QuestionKind,
        found: QuestionKind,
    },
    #[error("answer is blank")]
    BlankAnswer,
    #[error("session already completed")]
    Completed,
    #[error("grading failed: {0}")]
    GradingFailed(#[source] GradingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<GradingError> for SessionError {
    fn from(err: GradingError) -> Self {
        SessionError::GradingFailed(err)
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
