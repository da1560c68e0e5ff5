use std::sync::Arc;

use storage::repository::{ContentSource, ProgressRecorder, StorageError};
use study_core::model::{ItemId, QuizAttemptRecord};

use super::session::{GradedAnswer, QuizScore, QuizSession};
use crate::Clock;
use crate::error::SessionError;
use crate::grading::Grader;

/// Result of finishing a quiz run.
///
/// `warning` is set when the attempt could not be recorded; the score is still valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizFinish {
    pub score: QuizScore,
    pub warning: Option<String>,
}

/// Orchestrates quiz loading, delegated grading and attempt recording.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    content: Arc<dyn ContentSource>,
    grader: Arc<dyn Grader>,
    recorder: Option<Arc<dyn ProgressRecorder>>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, content: Arc<dyn ContentSource>, grader: Arc<dyn Grader>) -> Self {
        Self {
            clock,
            content,
            grader,
            recorder: None,
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ProgressRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Load a quiz and start a fresh run over it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the quiz cannot be loaded, or
    /// `SessionError::Empty` if it has no questions.
    pub async fn start_session(&self, item_id: ItemId) -> Result<QuizSession, SessionError> {
        let questions = self.content.load_questions(item_id).await?;
        tracing::debug!(%item_id, questions = questions.len(), "starting quiz session");
        QuizSession::new(item_id, questions)
    }

    /// Grade the current free-response question through the grader.
    ///
    /// The session is untouched unless grading succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::GradingFailed` if the grader errors, or any
    /// error from [`QuizSession::free_response_request`].
    pub async fn submit_free_response(
        &self,
        session: &mut QuizSession,
        answer: &str,
        subject_hint: Option<&str>,
    ) -> Result<GradedAnswer, SessionError> {
        let (index, request) = session.free_response_request(answer, subject_hint)?;

        let report = match self.grader.grade_free_response(&request).await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    item_id = %session.item_id(),
                    question_index = index,
                    "free-response grading failed"
                );
                return Err(SessionError::GradingFailed(err));
            }
        };

        let graded = session.record_free_response_grade(index, report)?;
        tracing::debug!(
            item_id = %session.item_id(),
            question_index = index,
            score = graded.outcome.score,
            max_score = graded.outcome.max_score,
            "free response graded"
        );
        Ok(graded)
    }

    /// Close the run and record the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the run was already finished.
    /// Recording failures are returned as a warning, never as an error.
    pub async fn finish(&self, session: &mut QuizSession) -> Result<QuizFinish, SessionError> {
        let score = session.finish()?;
        tracing::debug!(
            item_id = %session.item_id(),
            correct = score.correct_count,
            considered = score.considered_count,
            "quiz finished"
        );

        let warning = self
            .record(session, score)
            .await
            .err()
            .map(|err| format!("quiz result was not saved: {err}"));

        Ok(QuizFinish { score, warning })
    }

    async fn record(&self, session: &QuizSession, score: QuizScore) -> Result<(), StorageError> {
        let Some(recorder) = &self.recorder else {
            return Ok(());
        };

        let attempt = QuizAttemptRecord {
            item_id: session.item_id(),
            correct: u32::try_from(score.correct_count).unwrap_or(u32::MAX),
            total: u32::try_from(score.considered_count).unwrap_or(u32::MAX),
            attempted_at: self.clock.now(),
            history: session.history().clone(),
        };
        let result = recorder.record_quiz_attempt(&attempt).await;
        if let Err(err) = &result {
            tracing::warn!(
                error = %err,
                item_id = %attempt.item_id,
                "failed to record quiz attempt"
            );
        }
        result
    }
}
