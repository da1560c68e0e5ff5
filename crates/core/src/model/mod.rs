mod card;
mod ids;
mod question;
mod record;

pub use ids::{ItemId, ParseIdError};

pub use card::{Card, CardError};
pub use question::{FreeResponse, MultipleChoice, Question, QuestionError, QuestionKind};
pub use record::{FlashReviewRecord, QuestionOutcome, QuizAttemptRecord, QuizHistory, XpEvent};
