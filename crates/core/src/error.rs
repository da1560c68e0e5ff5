use thiserror::Error;

use crate::model::{CardError, QuestionError};

/// Load-time validation failures for study content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}
