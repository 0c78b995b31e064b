mod args;
mod render;

use pace_core::model::{Deadline, DeadlineDraft, DeadlineId, ProgressEntryDraft};
use serde::Serialize;
use services::{AppServices, Clock};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, ArgsError, Command, EnvDefaults, normalize_sqlite_url, print_usage};

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn require_deadline(
    services: &AppServices,
    id: DeadlineId,
) -> Result<Deadline, Box<dyn std::error::Error>> {
    services
        .deadlines()
        .get_deadline(id)
        .await?
        .ok_or_else(|| format!("deadline {id} does not exist").into())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse_from(std::env::args().skip(1), EnvDefaults::from_env()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let db_url = normalize_sqlite_url(args.db_url.clone());
    prepare_sqlite_file(&db_url)?;
    let clock = args.now.map_or_else(Clock::default_clock, Clock::fixed);
    debug!(db_url = %db_url, user_id = %args.user_id, fixed_clock = clock.is_fixed(), "starting");
    let services = AppServices::new_sqlite(&db_url, clock).await?;

    match args.command {
        Command::Status { deadline: None } => {
            let rows = services.overview().overview(args.user_id).await?;
            if args.json {
                print_json(&rows)?;
            } else {
                print!("{}", render::overview_table(&rows));
            }
        }
        Command::Status {
            deadline: Some(id),
        } => {
            let row = services
                .overview()
                .deadline_overview(id)
                .await?
                .ok_or_else(|| format!("deadline {id} does not exist"))?;
            if args.json {
                print_json(&row)?;
            } else {
                print!("{}", render::overview_table(std::slice::from_ref(&row)));
            }
        }
        Command::Today => {
            let targets = services.daily_targets().today(args.user_id).await?;
            if args.json {
                print_json(&targets)?;
            } else {
                print!("{}", render::daily_targets(&targets));
            }
        }
        Command::Add {
            title,
            format,
            total,
            due,
            flexibility,
        } => {
            let deadline = services
                .deadlines()
                .create_deadline(DeadlineDraft {
                    user_id: args.user_id,
                    title,
                    format,
                    total_quantity: total.to_base(format)?,
                    deadline_date: due,
                    flexibility,
                })
                .await?;
            if args.json {
                print_json(&deadline)?;
            } else {
                println!(
                    "Added #{} {} ({}), due {}",
                    deadline.id(),
                    deadline.title(),
                    render::quantity(format, deadline.total_quantity()),
                    deadline.deadline_date()
                );
            }
        }
        Command::Log {
            deadline,
            value,
            spent_minutes,
        } => {
            let format = require_deadline(&services, deadline).await?.format();
            let mut draft = ProgressEntryDraft::progress(value.to_base(format)?);
            if let Some(minutes) = spent_minutes {
                draft = draft.with_time_spent(minutes);
            }
            let entry = services.progress().log_progress(deadline, draft).await?;
            if args.json {
                print_json(&entry)?;
            } else {
                println!(
                    "Logged #{deadline} at {}",
                    render::quantity(format, entry.current_progress)
                );
            }
        }
        Command::Baseline { deadline, value } => {
            let format = require_deadline(&services, deadline).await?.format();
            let entry = services
                .progress()
                .log_baseline(deadline, value.to_base(format)?)
                .await?;
            if args.json {
                print_json(&entry)?;
            } else {
                println!(
                    "Baseline for #{deadline} set at {}",
                    render::quantity(format, entry.current_progress)
                );
            }
        }
        Command::Correct { deadline, value } => {
            let format = require_deadline(&services, deadline).await?.format();
            let outcome = services
                .progress()
                .correct_progress(deadline, value.to_base(format)?)
                .await?;
            if args.json {
                print_json(&outcome)?;
            } else {
                println!(
                    "Corrected #{deadline} to {} ({} entries removed)",
                    render::quantity(format, outcome.inserted_entry.current_progress),
                    outcome.deleted_entry_ids.len()
                );
            }
        }
        Command::SetStatus { deadline, status } => {
            let updated = services.deadlines().change_status(deadline, status).await?;
            if args.json {
                print_json(&updated)?;
            } else {
                println!("#{deadline} is now {}", updated.status().as_str());
            }
        }
    }

    Ok(())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") || db_url.contains("mode=memory") {
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

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
