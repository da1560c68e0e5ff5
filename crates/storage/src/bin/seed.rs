use std::fmt;

use chrono::{DateTime, Duration, Utc};
use storage::repository::Storage;
use study_core::model::{Card, FreeResponse, ItemId, MultipleChoice, Question, XpEvent};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    deck_id: ItemId,
    quiz_id: ItemId,
    xp_days: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidItemId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    InvalidXpDays { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidItemId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidXpDays { raw } => {
                write!(f, "invalid --xp-days value (0..={MAX_XP_DAYS}): {raw}")
            }
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

fn parse_item_id(flag: &'static str, raw: String) -> Result<ItemId, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidItemId { flag, raw })
}

/// Upper bound for `--xp-days`; one sample event is written per day.
const MAX_XP_DAYS: u32 = 366;

fn parse_xp_days(raw: String) -> Result<u32, ArgsError> {
    match raw.parse::<u32>() {
        Ok(days) if days <= MAX_XP_DAYS => Ok(days),
        _ => Err(ArgsError::InvalidXpDays { raw }),
    }
}

/// XP for the sample event written `day` days back.
fn sample_xp(day: u32) -> u32 {
    day.saturating_mul(5).saturating_add(10)
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("STUDY_DB_URL")
            .unwrap_or_else(|_| "sqlite:study.sqlite3?mode=rwc".into());
        let mut deck_id = ItemId::new(1);
        let mut quiz_id = ItemId::new(2);
        let mut xp_days = 7;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--deck-id" => {
                    deck_id = parse_item_id("--deck-id", require_value(&mut args, "--deck-id")?)?;
                }
                "--quiz-id" => {
                    quiz_id = parse_item_id("--quiz-id", require_value(&mut args, "--quiz-id")?)?;
                }
                "--xp-days" => {
                    let value = require_value(&mut args, "--xp-days")?;
                    xp_days = parse_xp_days(value)?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            deck_id,
            quiz_id,
            xp_days,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:study.sqlite3?mode=rwc)");
    eprintln!("  --deck-id <id>            Flashcard deck id to write (default: 1)");
    eprintln!("  --quiz-id <id>            Quiz id to write (default: 2)");
    eprintln!("  --xp-days <n>             Days of sample XP events to append (default: 7, max: 366)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL");
}

fn sample_cards() -> Result<Vec<Card>, study_core::Error> {
    let samples = [
        ("Mitochondrion", "Organelle where cellular respiration produces ATP"),
        ("Osmosis", "Diffusion of water across a semi-permeable membrane"),
        ("Ribosome", "Site of protein synthesis"),
        ("Enzyme", "Biological catalyst that lowers activation energy"),
        ("Chlorophyll", "Pigment that absorbs light for photosynthesis"),
        ("Homeostasis", "Maintenance of a stable internal environment"),
    ];
    let mut cards = Vec::with_capacity(samples.len());
    for (front, back) in samples {
        cards.push(Card::new(front, back)?);
    }
    Ok(cards)
}

fn sample_questions() -> Result<Vec<Question>, study_core::Error> {
    Ok(vec![
        MultipleChoice::new(
            "Which organelle produces most of a cell's ATP?",
            vec![
                "Nucleus".into(),
                "Mitochondrion".into(),
                "Golgi apparatus".into(),
                "Lysosome".into(),
            ],
            1,
            Some("Aerobic respiration takes place in the mitochondria.".into()),
        )?
        .into(),
        MultipleChoice::new(
            "What does an enzyme lower?",
            vec![
                "Activation energy".into(),
                "Temperature".into(),
                "pH".into(),
            ],
            0,
            None,
        )?
        .into(),
        FreeResponse::new(
            "Explain how osmosis moves water into a plant root cell.",
            "Water moves from the dilute soil solution into the more concentrated cell sap \
             through the partially permeable membrane.",
            vec![
                "water moves from high to low water potential".into(),
                "through a partially permeable membrane".into(),
                "cell sap is more concentrated than soil water".into(),
            ],
        )?
        .into(),
    ])
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let cards = sample_cards()?;
    storage
        .writer
        .save_deck(args.deck_id, "Cell biology", &cards)
        .await?;

    let questions = sample_questions()?;
    storage
        .writer
        .save_quiz(args.quiz_id, "Cell biology quiz", &questions)
        .await?;

    for day in 0..args.xp_days {
        let occurred_at = now - Duration::days(i64::from(day)) - Duration::hours(1);
        let event = XpEvent::new(Some(args.deck_id), sample_xp(day), &occurred_at, "seed");
        storage.recorder.record_xp(&event).await?;
    }

    println!(
        "Seeded deck {} ({} cards), quiz {} ({} questions) and {} XP events into {}",
        args.deck_id,
        cards.len(),
        args.quiz_id,
        questions.len(),
        args.xp_days,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_days_are_bounded() {
        assert_eq!(parse_xp_days("7".into()).unwrap(), 7);
        assert_eq!(parse_xp_days(MAX_XP_DAYS.to_string()).unwrap(), MAX_XP_DAYS);
        assert!(matches!(
            parse_xp_days("4294967295".into()),
            Err(ArgsError::InvalidXpDays { .. })
        ));
        assert!(matches!(
            parse_xp_days("-1".into()),
            Err(ArgsError::InvalidXpDays { .. })
        ));
    }

    #[test]
    fn sample_xp_grows_without_overflow() {
        assert_eq!(sample_xp(0), 10);
        assert_eq!(sample_xp(6), 40);
        assert_eq!(sample_xp(u32::MAX), u32::MAX);
    }

    #[test]
    fn seed_content_is_valid() {
        assert_eq!(sample_cards().unwrap().len(), 6);
        assert_eq!(sample_questions().unwrap().len(), 3);
    }
}
