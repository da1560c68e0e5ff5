mod session;
mod workflow;

pub use session::{CHOICE_POINTS, GradedAnswer, QuizScore, QuizSession};
pub use workflow::{QuizFinish, QuizLoopService};
