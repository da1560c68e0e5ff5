//! Free-response grading seam.
//!
//! Multiple-choice answers are graded in the quiz session by exact option
//! match; only free-text answers go through a [`Grader`].

mod http;

use async_trait::async_trait;
use study_core::model::FreeResponse;

use crate::error::GradingError;

pub use http::{GraderConfig, HttpGrader};

/// Everything a grader needs to mark one free-response answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRequest {
    pub prompt: String,
    pub model_answer: String,
    pub markscheme_points: Vec<String>,
    pub user_answer: String,
    pub subject_hint: Option<String>,
}

impl GradeRequest {
    #[must_use]
    pub fn new(question: &FreeResponse, user_answer: &str, subject_hint: Option<&str>) -> Self {
        Self {
            prompt: question.prompt().to_owned(),
            model_answer: question.model_answer().to_owned(),
            markscheme_points: question.markscheme_points().to_vec(),
            user_answer: user_answer.trim().to_owned(),
            subject_hint: subject_hint
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        }
    }
}

/// A grader's verdict on one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub score: u32,
    pub max_points: u32,
    pub feedback: String,
}

#[async_trait]
pub trait Grader: Send + Sync {
    /// Mark a free-response answer.
    ///
    /// # Errors
    ///
    /// Returns `GradingError` on transport or parse failures.
    async fn grade_free_response(
        &self,
        request: &GradeRequest,
    ) -> Result<GradeReport, GradingError>;
}
