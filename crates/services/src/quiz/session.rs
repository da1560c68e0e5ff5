use std::collections::BTreeSet;
use std::fmt;

use study_core::model::{ItemId, Question, QuestionKind, QuestionOutcome, QuizHistory};
use study_core::progress::passes;

use crate::error::SessionError;
use crate::grading::{GradeReport, GradeRequest};

/// Points awarded for a correct multiple-choice answer (and the maximum).
pub const CHOICE_POINTS: u32 = 10;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Feedback for the most recent submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_index: usize,
    pub outcome: QuestionOutcome,
    pub feedback: Option<String>,
}

impl GradedAnswer {
    #[must_use]
    pub fn was_correct(&self) -> bool {
        self.outcome.is_correct()
    }
}

/// Score over the questions that were actually answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct_count: usize,
    pub considered_count: usize,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory quiz run.
///
/// Questions may be revisited freely; `history` keeps the last graded
/// outcome per question and the run ends only on [`QuizSession::finish`].
pub struct QuizSession {
    item_id: ItemId,
    questions: Vec<Question>,
    cursor: usize,
    answered: BTreeSet<usize>,
    correct: BTreeSet<usize>,
    history: QuizHistory,
    graded: Option<GradedAnswer>,
    finished: bool,
}

impl QuizSession {
    /// Start a run over `questions` in quiz order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn new(item_id: ItemId, questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            item_id,
            questions,
            cursor: 0,
            answered: BTreeSet::new(),
            correct: BTreeSet::new(),
            history: QuizHistory::new(),
            graded: None,
            finished: false,
        })
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current(&self) -> &Question {
        &self.questions[self.cursor]
    }

    #[must_use]
    pub fn answered(&self) -> &BTreeSet<usize> {
        &self.answered
    }

    #[must_use]
    pub fn correct(&self) -> &BTreeSet<usize> {
        &self.correct
    }

    #[must_use]
    pub fn history(&self) -> &QuizHistory {
        &self.history
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feedback for the current question, if it was graded since the cursor last moved.
    #[must_use]
    pub fn graded(&self) -> Option<&GradedAnswer> {
        self.graded.as_ref()
    }

    /// Last recorded outcome for the current question, whether or not it is on display.
    #[must_use]
    pub fn previous_answer(&self) -> Option<&QuestionOutcome> {
        self.history.get(&self.cursor)
    }

    pub fn next(&mut self) {
        if self.cursor + 1 < self.questions.len() {
            self.cursor += 1;
        }
        self.graded = None;
    }

    pub fn prev(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
        self.graded = None;
    }

    /// Grade the current multiple-choice question by exact option match.
    ///
    /// An option that is not in the list is graded incorrect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the current question is free
    /// response, or `SessionError::Completed` after `finish`.
    pub fn submit_choice(&mut self, selected_option: &str) -> Result<GradedAnswer, SessionError> {
        self.ensure_open()?;
        let Question::MultipleChoice(question) = &self.questions[self.cursor] else {
            return Err(self.wrong_kind(QuestionKind::MultipleChoice));
        };

        let was_correct = question.position_of(selected_option) == Some(question.correct_index());
        let score = if was_correct { CHOICE_POINTS } else { 0 };
        let feedback = question.explanation().map(str::to_owned);

        Ok(self.record(
            self.cursor,
            QuestionOutcome::new(score, CHOICE_POINTS, was_correct),
            feedback,
        ))
    }

    /// Build the grader request for the current free-response question.
    ///
    /// Nothing changes until the grade comes back through
    /// [`QuizSession::record_free_response_grade`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the current question is multiple
    /// choice, `SessionError::BlankAnswer` for an empty answer, or
    /// `SessionError::Completed` after `finish`.
    pub fn free_response_request(
        &self,
        answer: &str,
        subject_hint: Option<&str>,
    ) -> Result<(usize, GradeRequest), SessionError> {
        self.ensure_open()?;
        let Question::FreeResponse(question) = &self.questions[self.cursor] else {
            return Err(self.wrong_kind(QuestionKind::FreeResponse));
        };
        if answer.trim().is_empty() {
            return Err(SessionError::BlankAnswer);
        }

        Ok((
            self.cursor,
            GradeRequest::new(question, answer, subject_hint),
        ))
    }

    /// Apply a grader's verdict to a free-response question.
    ///
    /// The answer counts as correct when `max_points > 0` and
    /// `score >= 0.7 * max_points`. History is always updated; the transient
    /// graded state is only set when `question_index` is still on screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if `question_index` names a
    /// multiple-choice question, `SessionError::UnknownQuestion` if it is out
    /// of range, or `SessionError::Completed` after `finish`.
    pub fn record_free_response_grade(
        &mut self,
        question_index: usize,
        report: GradeReport,
    ) -> Result<GradedAnswer, SessionError> {
        self.ensure_open()?;
        match self.questions.get(question_index) {
            Some(Question::FreeResponse(_)) => {}
            Some(other) => {
                return Err(SessionError::InvalidState {
                    expected: QuestionKind::FreeResponse,
                    found: other.kind(),
                });
            }
            None => {
                return Err(SessionError::UnknownQuestion {
                    index: question_index,
                });
            }
        }

        let was_correct = passes(report.score, report.max_points);
        Ok(self.record(
            question_index,
            QuestionOutcome::new(report.score, report.max_points, was_correct),
            Some(report.feedback),
        ))
    }

    /// Close the run and score it over answered questions only.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the run was already finished.
    pub fn finish(&mut self) -> Result<QuizScore, SessionError> {
        self.ensure_open()?;
        self.finished = true;
        self.graded = None;
        Ok(self.score())
    }

    /// Current score without closing the run.
    #[must_use]
    pub fn score(&self) -> QuizScore {
        QuizScore {
            correct_count: self.history.values().filter(|o| o.is_correct()).count(),
            considered_count: self.history.len(),
        }
    }

    pub fn restart(&mut self) {
        self.cursor = 0;
        self.answered.clear();
        self.correct.clear();
        self.history.clear();
        self.graded = None;
        self.finished = false;
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.finished {
            Err(SessionError::Completed)
        } else {
            Ok(())
        }
    }

    fn wrong_kind(&self, expected: QuestionKind) -> SessionError {
        SessionError::InvalidState {
            expected,
            found: self.current().kind(),
        }
    }

    fn record(
        &mut self,
        index: usize,
        outcome: QuestionOutcome,
        feedback: Option<String>,
    ) -> GradedAnswer {
        self.history.insert(index, outcome);
        self.answered.insert(index);
        if outcome.is_correct() {
            self.correct.insert(index);
        } else {
            self.correct.remove(&index);
        }

        let graded = GradedAnswer {
            question_index: index,
            outcome,
            feedback,
        };
        if index == self.cursor {
            self.graded = Some(graded.clone());
        }
        graded
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("item_id", &self.item_id)
            .field("questions_len", &self.questions.len())
            .field("cursor", &self.cursor)
            .field("answered", &self.answered)
            .field("correct", &self.correct)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
