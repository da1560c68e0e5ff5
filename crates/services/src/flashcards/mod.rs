mod session;
mod workflow;

pub use session::{
    FlashJudgment, FlashcardProgress, FlashcardSession, FlashcardSummary, REQUEUE_OFFSET,
};
pub use workflow::{FlashcardAnswerResult, FlashcardLoopService};
