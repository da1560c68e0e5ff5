#![forbid(unsafe_code)]

pub mod error;
pub mod flashcards;
pub mod grading;
pub mod progress_service;
pub mod quiz;

pub use study_core::Clock;

pub use error::{GradingError, ProgressServiceError, SessionError};
pub use flashcards::{
    FlashJudgment, FlashcardAnswerResult, FlashcardLoopService, FlashcardProgress,
    FlashcardSession, FlashcardSummary,
};
pub use grading::{GradeReport, GradeRequest, Grader, GraderConfig, HttpGrader};
pub use progress_service::{ProgressReport, ProgressService};
pub use quiz::{GradedAnswer, QuizFinish, QuizLoopService, QuizScore, QuizSession};
