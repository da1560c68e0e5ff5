//! Line-oriented study loops over any `BufRead` / `Write` pair.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use services::{
    FlashcardLoopService, FlashcardSession, GradedAnswer, ProgressReport, QuizLoopService,
    QuizSession, SessionError,
};
use study_core::model::{MultipleChoice, Question};

type RunResult = Result<(), Box<dyn std::error::Error>>;

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }

    /// Prompt and read one trimmed line; `None` on end of input.
    pub fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt} ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

//
// ─── FLASHCARDS ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlashCommand {
    Reveal,
    Known,
    Again,
    Next,
    Prev,
    Restart,
    Quit,
}

impl FlashCommand {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "" | "r" | "reveal" => Some(Self::Reveal),
            "k" | "known" => Some(Self::Known),
            "a" | "again" => Some(Self::Again),
            "n" | "next" => Some(Self::Next),
            "p" | "prev" => Some(Self::Prev),
            "restart" => Some(Self::Restart),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

const FLASH_HELP: &str = "[enter/r]eveal  [k]nown  [a]gain  [n]ext  [p]rev  restart  [q]uit >";

pub async fn run_flashcards<R: BufRead, W: Write>(
    term: &mut Terminal<R, W>,
    service: &FlashcardLoopService,
    session: &mut FlashcardSession,
) -> RunResult {
    loop {
        let Some(index) = session.current_index() else {
            let summary = session.summary();
            term.say(format!(
                "Deck complete: {} known, {} needed another pass, {} cards.",
                summary.known_count, summary.not_known_count, summary.total
            ))?;
            return Ok(());
        };

        let progress = session.progress();
        let card = session.current()?;
        term.say(format!(
            "\n[{} left, {} known] {}",
            progress.remaining,
            progress.known,
            card.front()
        ))?;
        if session.is_revealed() {
            term.say(format!("  = {}", card.back()))?;
        }

        let Some(line) = term.ask(FLASH_HELP)? else {
            return Ok(());
        };
        match FlashCommand::parse(&line) {
            Some(FlashCommand::Reveal) => session.reveal(),
            Some(FlashCommand::Known) => {
                service.judge_known(session, index).await?;
            }
            Some(FlashCommand::Again) => {
                service.judge_again(session, index).await?;
            }
            Some(FlashCommand::Next) => session.next(),
            Some(FlashCommand::Prev) => session.prev(),
            Some(FlashCommand::Restart) => session.restart(),
            Some(FlashCommand::Quit) => return Ok(()),
            None => term.say(format!("unknown command: {line}"))?,
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
enum QuizCommand {
    Next,
    Prev,
    Finish,
    Restart,
    Quit,
    Answer(String),
}

impl QuizCommand {
    fn parse(raw: &str) -> Self {
        match raw {
            ":n" | ":next" => Self::Next,
            ":p" | ":prev" => Self::Prev,
            ":f" | ":finish" => Self::Finish,
            ":restart" => Self::Restart,
            ":q" | ":quit" => Self::Quit,
            answer => Self::Answer(answer.to_string()),
        }
    }
}

const QUIZ_HELP: &str = "answer, or :n/:p to move, :f to finish, :restart, :q >";

/// Map a typed option number (1-based) to its text; anything else is taken verbatim.
fn resolve_choice(question: &MultipleChoice, raw: &str) -> String {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options().get(i))
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}

fn describe(graded: &GradedAnswer) -> String {
    let verdict = if graded.was_correct() {
        "Correct"
    } else {
        "Not quite"
    };
    let mut text = format!(
        "{verdict} ({}/{})",
        graded.outcome.score, graded.outcome.max_score
    );
    if let Some(feedback) = &graded.feedback {
        text.push_str(": ");
        text.push_str(feedback);
    }
    text
}

pub async fn run_quiz<R: BufRead, W: Write>(
    term: &mut Terminal<R, W>,
    service: &QuizLoopService,
    session: &mut QuizSession,
    subject_hint: Option<&str>,
) -> RunResult {
    loop {
        term.say(format!(
            "\nQuestion {}/{} ({} answered)",
            session.cursor() + 1,
            session.total(),
            session.answered().len()
        ))?;
        term.say(session.current().prompt())?;
        if let Question::MultipleChoice(question) = session.current() {
            for (i, option) in question.options().iter().enumerate() {
                term.say(format!("  {}. {option}", i + 1))?;
            }
        }
        if let Some(previous) = session.previous_answer() {
            term.say(format!(
                "  (last answer scored {}/{})",
                previous.score, previous.max_score
            ))?;
        }

        let Some(line) = term.ask(QUIZ_HELP)? else {
            return Ok(());
        };
        match QuizCommand::parse(&line) {
            QuizCommand::Next => session.next(),
            QuizCommand::Prev => session.prev(),
            QuizCommand::Restart => session.restart(),
            QuizCommand::Quit => return Ok(()),
            QuizCommand::Finish => {
                let finish = service.finish(session).await?;
                term.say(format!(
                    "Quiz finished: {}/{} correct.",
                    finish.score.correct_count, finish.score.considered_count
                ))?;
                if let Some(warning) = finish.warning {
                    term.say(format!("warning: {warning}"))?;
                }
                return Ok(());
            }
            QuizCommand::Answer(answer) => {
                let result = if let Question::MultipleChoice(question) = session.current() {
                    let selected = resolve_choice(question, &answer);
                    session.submit_choice(&selected)
                } else {
                    service
                        .submit_free_response(session, &answer, subject_hint)
                        .await
                };
                match result {
                    Ok(graded) => term.say(describe(&graded))?,
                    Err(err @ (SessionError::GradingFailed(_) | SessionError::BlankAnswer)) => {
                        term.say(format!("! {err}"))?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

pub fn print_report<R: BufRead, W: Write>(
    term: &mut Terminal<R, W>,
    report: &ProgressReport,
) -> io::Result<()> {
    term.say(format!("Quiz average:     {}", percent(report.quiz_average)))?;
    term.say(format!(
        "Flashcards known: {}",
        percent(report.flash_known_ratio)
    ))?;
    term.say(format!("Overall:          {}", percent(report.blended)))?;
    term.say(format!("XP this week:     {}", report.weekly_xp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use async_trait::async_trait;
    use services::{Clock, GradeReport, GradeRequest, Grader, GradingError};
    use storage::repository::{ContentWriter, InMemoryRepository, ProgressQueries};
    use study_core::model::{Card, ItemId};
    use study_core::time::fixed_now;

    struct NoGrader;

    #[async_trait]
    impl Grader for NoGrader {
        async fn grade_free_response(
            &self,
            _: &GradeRequest,
        ) -> Result<GradeReport, GradingError> {
            Err(GradingError::Disabled)
        }
    }

    fn choice() -> MultipleChoice {
        MultipleChoice::new("Pick", vec!["red".into(), "blue".into()], 1, None).unwrap()
    }

    #[test]
    fn numbered_choice_maps_to_option_text() {
        let q = choice();
        assert_eq!(resolve_choice(&q, "2"), "blue");
        assert_eq!(resolve_choice(&q, "red"), "red");
        assert_eq!(resolve_choice(&q, "0"), "0");
        assert_eq!(resolve_choice(&q, "9"), "9");
    }

    #[test]
    fn commands_parse() {
        assert_eq!(FlashCommand::parse(""), Some(FlashCommand::Reveal));
        assert_eq!(FlashCommand::parse("K"), Some(FlashCommand::Known));
        assert_eq!(FlashCommand::parse("zz"), None);
        assert_eq!(QuizCommand::parse(":f"), QuizCommand::Finish);
        assert_eq!(
            QuizCommand::parse("n"),
            QuizCommand::Answer("n".to_string())
        );
    }

    #[tokio::test]
    async fn flash_loop_runs_deck_to_completion() {
        let repo = InMemoryRepository::new();
        let cards = vec![
            Card::new("one", "1").unwrap(),
            Card::new("two", "2").unwrap(),
        ];
        repo.save_deck(ItemId::new(1), "Numbers", &cards)
            .await
            .unwrap();
        let service = FlashcardLoopService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()))
            .with_recorder(Arc::new(repo.clone()));
        let mut session = service.start_session(ItemId::new(1)).await.unwrap();

        let mut out = Vec::new();
        let mut term = Terminal::new(Cursor::new("r\na\nk\nk\n"), &mut out);
        run_flashcards(&mut term, &service, &mut session)
            .await
            .unwrap();

        assert!(session.is_complete());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("= 1"));
        assert!(text.contains("Deck complete: 2 known"));
        assert_eq!(repo.flash_reviews().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn quiz_loop_reports_grading_failure_and_finishes() {
        let repo = InMemoryRepository::new();
        let questions: Vec<Question> = vec![
            choice().into(),
            study_core::model::FreeResponse::new("Explain", "because", vec![])
                .unwrap()
                .into(),
        ];
        repo.save_quiz(ItemId::new(2), "Quiz", &questions)
            .await
            .unwrap();
        let service = QuizLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(NoGrader),
        );
        let mut session = service.start_session(ItemId::new(2)).await.unwrap();

        let mut out = Vec::new();
        let mut term = Terminal::new(Cursor::new("2\n:n\nsome text\n:f\n"), &mut out);
        run_quiz(&mut term, &service, &mut session, None)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Correct (10/10)"));
        assert!(text.contains("! grading failed"));
        assert!(text.contains("Quiz finished: 1/1 correct."));
    }
}
