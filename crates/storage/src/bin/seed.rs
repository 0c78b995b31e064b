use std::fmt;

use chrono::{DateTime, Duration, Utc};
use pace_core::model::{
    DeadlineDraft, DeadlineId, Flexibility, Format, ProgressEntryDraft, UserId,
};
use storage::repository::{NewDeadlineRecord, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    days: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDays { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PACE_DB_URL").unwrap_or_else(|_| "sqlite:pace.sqlite3?mode=rwc".into());
        let mut user_id = std::env::var("PACE_USER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(1), UserId::new);
        let mut days = 21;
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
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .ok()
                        .filter(|d| *d > 0)
                        .ok_or_else(|| ArgsError::InvalidDays { raw: value.clone() })?;
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
            user_id,
            days,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:pace.sqlite3?mode=rwc)");
    eprintln!("  --user-id <id>            Owner of the seeded deadlines (default: 1)");
    eprintln!("  --days <n>                Days of reading history to generate (default: 21)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PACE_DB_URL, PACE_USER_ID");
}

struct SampleBook {
    title: &'static str,
    format: Format,
    total: i64,
    due_in_days: i64,
    flexibility: Flexibility,
    start_at: i64,
    per_session: i64,
}

const SAMPLES: [SampleBook; 2] = [
    SampleBook {
        title: "The Name of the Rose",
        format: Format::Pages,
        total: 536,
        due_in_days: 18,
        flexibility: Flexibility::Flexible,
        start_at: 40,
        per_session: 22,
    },
    SampleBook {
        title: "Project Hail Mary",
        format: Format::AudioMinutes,
        total: 971,
        due_in_days: 9,
        flexibility: Flexibility::Strict,
        start_at: 0,
        per_session: 35,
    },
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let created_at = now - Duration::days(i64::from(args.days));

    for sample in &SAMPLES {
        let deadline = DeadlineDraft {
            user_id: args.user_id,
            title: sample.title.to_owned(),
            format: sample.format,
            total_quantity: sample.total,
            deadline_date: now.date_naive() + Duration::days(sample.due_in_days),
            flexibility: sample.flexibility,
        }
        .validate(DeadlineId::new(0), created_at)?;
        let deadline_id = storage
            .deadlines
            .insert_new_deadline(NewDeadlineRecord::from_deadline(&deadline))
            .await?;

        if sample.start_at > 0 {
            let baseline = ProgressEntryDraft::baseline(sample.start_at).validate(deadline_id, created_at)?;
            storage.progress.append_entry(baseline).await?;
        }

        // read on roughly two of every three days
        let mut progress = sample.start_at;
        for day in 1..=i64::from(args.days) {
            if day % 3 == 0 {
                continue;
            }
            progress = (progress + sample.per_session).min(sample.total);
            let entry = ProgressEntryDraft::progress(progress)
                .with_time_spent(30)
                .validate(deadline_id, created_at + Duration::days(day) - Duration::hours(3))?;
            storage.progress.append_entry(entry).await?;
        }

        info!(deadline_id = %deadline_id, title = sample.title, progress, "seeded deadline");
    }

    println!(
        "Seeded {} deadlines with {} days of history for user {} into {}",
        SAMPLES.len(),
        args.days,
        args.user_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
