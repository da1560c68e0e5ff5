use std::fmt;
use std::io;
use std::sync::Arc;

use services::{Clock, FlashcardLoopService, HttpGrader, ProgressService, QuizLoopService};
use storage::repository::Storage;
use study_core::model::ItemId;

mod logging;
mod terminal;

use terminal::Terminal;

const DB_ENV: &str = "STUDY_DB_URL";
const ITEM_ENV: &str = "STUDY_ITEM_ID";
const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidItemId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidItemId { raw } => write!(f, "invalid --item-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  study flash    [--db <sqlite_url>] [--item-id <id>]");
    eprintln!("  study quiz     [--db <sqlite_url>] [--item-id <id>] [--subject <hint>]");
    eprintln!("  study progress [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --item-id 1 for flash, 2 for quiz (matches the seed binary)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_ENV}, {ITEM_ENV}, STUDY_AI_API_KEY, STUDY_AI_BASE_URL, STUDY_AI_MODEL,");
    eprintln!("  STUDY_AI_TIMEOUT_SECS, {}", logging::LOG_ENV);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Flash,
    Quiz,
    Progress,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "flash" => Some(Self::Flash),
            "quiz" => Some(Self::Quiz),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }

    fn default_item_id(self) -> ItemId {
        match self {
            Command::Quiz => ItemId::new(2),
            Command::Flash | Command::Progress => ItemId::new(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    db_url: String,
    item_id: ItemId,
    subject: Option<String>,
}

impl Args {
    /// Parse `argv` (without the program name), reading defaults through `env`.
    fn parse(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let command = match args.next() {
            None => return Ok(None),
            Some(first) if first == "--help" || first == "-h" => return Ok(None),
            Some(first) => Command::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?,
        };

        let mut db_url = env(DB_ENV).map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut item_id = env(ITEM_ENV)
            .and_then(|value| value.parse::<ItemId>().ok())
            .unwrap_or_else(|| command.default_item_id());
        let mut subject = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--item-id" => {
                    let value = require_value(&mut args, "--item-id")?;
                    item_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidItemId { raw: value.clone() })?;
                }
                "--subject" => {
                    subject = Some(require_value(&mut args, "--subject")?);
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self {
            command,
            db_url,
            item_id,
            subject,
        }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;
    let Some(args) = parsed else {
        print_usage();
        return Ok(());
    };

    // Open + migrate SQLite at startup; the library crates stay path-agnostic.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    let clock = Clock::default_clock();
    tracing::info!(command = ?args.command, item_id = %args.item_id, "study session starting");

    let mut term = Terminal::new(io::stdin().lock(), io::stdout());

    match args.command {
        Command::Flash => {
            let service = FlashcardLoopService::new(clock, Arc::clone(&storage.content))
                .with_recorder(Arc::clone(&storage.recorder));
            let mut session = service.start_session(args.item_id).await?;
            terminal::run_flashcards(&mut term, &service, &mut session).await
        }
        Command::Quiz => {
            let grader = HttpGrader::from_env()?;
            if !grader.enabled() {
                tracing::warn!(
                    "STUDY_AI_API_KEY is not set; free-response answers cannot be graded"
                );
            }
            let service =
                QuizLoopService::new(clock, Arc::clone(&storage.content), Arc::new(grader))
                    .with_recorder(Arc::clone(&storage.recorder));
            let mut session = service.start_session(args.item_id).await?;
            terminal::run_quiz(&mut term, &service, &mut session, args.subject.as_deref()).await
        }
        Command::Progress => {
            let report = ProgressService::new(clock, Arc::clone(&storage.progress))
                .report()
                .await?;
            terminal::print_report(&mut term, &report)?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn quiz_defaults_to_seeded_quiz_id() {
        let args = Args::parse(argv(&["quiz"]), no_env).unwrap().unwrap();
        assert_eq!(args.command, Command::Quiz);
        assert_eq!(args.item_id, ItemId::new(2));
        assert_eq!(args.db_url, DEFAULT_DB_URL);
        assert_eq!(args.subject, None);
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            DB_ENV => Some("sqlite:///tmp/env.sqlite3".to_string()),
            ITEM_ENV => Some("5".to_string()),
            _ => None,
        };
        let from_env = Args::parse(argv(&["flash"]), env).unwrap().unwrap();
        assert_eq!(from_env.item_id, ItemId::new(5));
        assert_eq!(from_env.db_url, "sqlite:///tmp/env.sqlite3");

        let args = Args::parse(
            argv(&["flash", "--item-id", "9", "--db", "/tmp/other.sqlite3"]),
            env,
        )
        .unwrap()
        .unwrap();
        assert_eq!(args.item_id, ItemId::new(9));
        assert_eq!(args.db_url, "sqlite:///tmp/other.sqlite3");
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(matches!(
            Args::parse(argv(&["study"]), no_env),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["quiz", "--item-id", "x"]), no_env),
            Err(ArgsError::InvalidItemId { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["quiz", "--db"]), no_env),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(Args::parse(argv(&[]), no_env).unwrap().is_none());
    }

    #[test]
    fn memory_url_needs_no_file() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://x").is_err());
    }
}
