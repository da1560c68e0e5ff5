use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A quiz question. The variant is fixed when the question is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    MultipleChoice(MultipleChoice),
    FreeResponse(FreeResponse),
}

/// Discriminant of [`Question`], used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    MultipleChoice,
    FreeResponse,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::FreeResponse => "free_response",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Question {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::MultipleChoice(_) => QuestionKind::MultipleChoice,
            Question::FreeResponse(_) => QuestionKind::FreeResponse,
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => q.prompt(),
            Question::FreeResponse(q) => q.prompt(),
        }
    }
}

impl From<MultipleChoice> for Question {
    fn from(q: MultipleChoice) -> Self {
        Question::MultipleChoice(q)
    }
}

impl From<FreeResponse> for Question {
    fn from(q: FreeResponse) -> Self {
        Question::FreeResponse(q)
    }
}

//
// ─── MULTIPLE CHOICE ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MultipleChoiceParts")]
pub struct MultipleChoice {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl MultipleChoice {
    /// Build a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, there are no options,
    /// or `correct_index` does not point at an option.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = non_blank(prompt.into())?;
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }
        let explanation = explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Self {
            prompt,
            options,
            correct_index,
            explanation,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Position of the first option equal to `selected`, if any.
    #[must_use]
    pub fn position_of(&self, selected: &str) -> Option<usize> {
        self.options.iter().position(|o| o == selected)
    }
}

#[derive(Deserialize)]
struct MultipleChoiceParts {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: Option<String>,
}

impl TryFrom<MultipleChoiceParts> for MultipleChoice {
    type Error = QuestionError;

    fn try_from(p: MultipleChoiceParts) -> Result<Self, Self::Error> {
        MultipleChoice::new(p.prompt, p.options, p.correct_index, p.explanation)
    }
}

//
// ─── FREE RESPONSE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FreeResponseParts")]
pub struct FreeResponse {
    prompt: String,
    model_answer: String,
    markscheme_points: Vec<String>,
}

impl FreeResponse {
    /// Build a free-response question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` if the prompt is blank.
    pub fn new(
        prompt: impl Into<String>,
        model_answer: impl Into<String>,
        markscheme_points: Vec<String>,
    ) -> Result<Self, QuestionError> {
        Ok(Self {
            prompt: non_blank(prompt.into())?,
            model_answer: model_answer.into().trim().to_owned(),
            markscheme_points,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn model_answer(&self) -> &str {
        &self.model_answer
    }

    #[must_use]
    pub fn markscheme_points(&self) -> &[String] {
        &self.markscheme_points
    }
}

#[derive(Deserialize)]
struct FreeResponseParts {
    prompt: String,
    #[serde(default)]
    model_answer: String,
    #[serde(default)]
    markscheme_points: Vec<String>,
}

impl TryFrom<FreeResponseParts> for FreeResponse {
    type Error = QuestionError;

    fn try_from(p: FreeResponseParts) -> Result<Self, Self::Error> {
        FreeResponse::new(p.prompt, p.model_answer, p.markscheme_points)
    }
}

fn non_blank(prompt: String) -> Result<String, QuestionError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(QuestionError::EmptyPrompt);
    }
    Ok(trimmed.to_owned())
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt is empty")]
    EmptyPrompt,

    #[error("multiple-choice question has no options")]
    NoOptions,

    #[error("correct_index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
