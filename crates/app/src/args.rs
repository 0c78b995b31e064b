use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use pace_core::model::{DeadlineId, DeadlineStatus, Flexibility, Format, UserId};
use pace_core::time::start_of_day;
use pace_core::units::{UnitConverter, UnitError};

pub const DEFAULT_DB_URL: &str = "sqlite:pace.sqlite3?mode=rwc";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidUserId { raw: String },
    InvalidDeadlineId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    InvalidToday { raw: String },
    InvalidDate { raw: String },
    InvalidFormat { raw: String },
    InvalidStatus { raw: String },
    InvalidQuantity { raw: String },
    InvalidMinutes { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDeadlineId { raw } => write!(f, "invalid --deadline value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidToday { raw } => {
                write!(f, "invalid --today value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid --due value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidFormat { raw } => write!(
                f,
                "invalid --format value: {raw} (expected pages, ebook-pages or audio-minutes)"
            ),
            ArgsError::InvalidStatus { raw } => write!(f, "invalid status: {raw}"),
            ArgsError::InvalidQuantity { raw } => {
                write!(f, "invalid quantity: {raw} (pages as N, audio as H:MM)")
            }
            ArgsError::InvalidMinutes { raw } => write!(f, "invalid --spent value: {raw}"),
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

/// A quantity as typed: pages as `N`, audio as `H:MM` or plain hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityInput {
    primary: i64,
    secondary: i64,
}

impl QuantityInput {
    pub fn parse(raw: &str) -> Result<Self, ArgsError> {
        let invalid = || ArgsError::InvalidQuantity { raw: raw.to_owned() };
        let (primary, secondary) = match raw.split_once(':') {
            Some((hours, minutes)) => (
                hours.trim().parse().map_err(|_| invalid())?,
                minutes.trim().parse().map_err(|_| invalid())?,
            ),
            None => (raw.trim().parse().map_err(|_| invalid())?, 0),
        };
        Ok(Self { primary, secondary })
    }

    /// Base units for `format`. Negative hours, minutes or pages are rejected by name.
    pub fn to_base(self, format: Format) -> Result<i64, UnitError> {
        UnitConverter::to_base_unit(format, self.primary, self.secondary).map(i64::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status {
        deadline: Option<DeadlineId>,
    },
    Today,
    Add {
        title: String,
        format: Format,
        total: QuantityInput,
        due: NaiveDate,
        flexibility: Flexibility,
    },
    Log {
        deadline: DeadlineId,
        value: QuantityInput,
        spent_minutes: Option<i64>,
    },
    Baseline {
        deadline: DeadlineId,
        value: QuantityInput,
    },
    Correct {
        deadline: DeadlineId,
        value: QuantityInput,
    },
    SetStatus {
        deadline: DeadlineId,
        status: DeadlineStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub user_id: UserId,
    pub now: Option<DateTime<Utc>>,
    pub json: bool,
    pub command: Command,
}

/// Values taken from the environment before flags override them.
#[derive(Debug, Clone, Default)]
pub struct EnvDefaults {
    pub db_url: Option<String>,
    pub user_id: Option<String>,
}

impl EnvDefaults {
    pub fn from_env() -> Self {
        Self {
            db_url: std::env::var("PACE_DB_URL").ok(),
            user_id: std::env::var("PACE_USER_ID").ok(),
        }
    }
}

#[derive(Default)]
struct CommandFlags {
    deadline: Option<DeadlineId>,
    title: Option<String>,
    format: Option<Format>,
    total: Option<QuantityInput>,
    due: Option<NaiveDate>,
    strict: bool,
    spent_minutes: Option<i64>,
    positional: Vec<String>,
}

impl Args {
    /// Parse `argv` (without the program name).
    ///
    /// Global flags may appear before or after the subcommand. `status` is the default.
    pub fn parse_from(
        argv: impl IntoIterator<Item = String>,
        env: EnvDefaults,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env.db_url.unwrap_or_else(|| DEFAULT_DB_URL.into());
        let mut user_id = env
            .user_id
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UserId::new(1), UserId::new);
        let mut now: Option<DateTime<Utc>> = None;
        let mut json = false;
        let mut command_name: Option<String> = None;
        let mut flags = CommandFlags::default();

        let mut args = argv.into_iter();
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
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--today" => {
                    let value = require_value(&mut args, "--today")?;
                    let day = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                        .map_err(|_| ArgsError::InvalidToday { raw: value.clone() })?;
                    // midday keeps the date stable for any reading of "today"
                    now = Some(start_of_day(day) + Duration::hours(12));
                }
                "--json" => json = true,
                "--deadline" => {
                    let value = require_value(&mut args, "--deadline")?;
                    flags.deadline = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidDeadlineId { raw: value.clone() })?,
                    );
                }
                "--title" => flags.title = Some(require_value(&mut args, "--title")?),
                "--format" => {
                    let value = require_value(&mut args, "--format")?;
                    flags.format = Some(
                        Format::from_name(&value)
                            .ok_or_else(|| ArgsError::InvalidFormat { raw: value.clone() })?,
                    );
                }
                "--total" => {
                    let value = require_value(&mut args, "--total")?;
                    flags.total = Some(QuantityInput::parse(&value)?);
                }
                "--due" => {
                    let value = require_value(&mut args, "--due")?;
                    flags.due = Some(
                        NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                            .map_err(|_| ArgsError::InvalidDate { raw: value.clone() })?,
                    );
                }
                "--strict" => flags.strict = true,
                "--spent" => {
                    let value = require_value(&mut args, "--spent")?;
                    flags.spent_minutes = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidMinutes { raw: value.clone() })?,
                    );
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if command_name.is_none() => command_name = Some(arg),
                _ => flags.positional.push(arg),
            }
        }

        let command = build_command(command_name.as_deref().unwrap_or("status"), flags)?;
        Ok(Self {
            db_url,
            user_id,
            now,
            json,
            command,
        })
    }
}

fn build_command(name: &str, mut flags: CommandFlags) -> Result<Command, ArgsError> {
    let command = match name {
        "status" => Command::Status {
            deadline: flags.deadline,
        },
        "today" => Command::Today,
        "add" => Command::Add {
            title: flags.title.take().ok_or(ArgsError::MissingFlag { flag: "--title" })?,
            format: flags.format.ok_or(ArgsError::MissingFlag { flag: "--format" })?,
            total: flags.total.ok_or(ArgsError::MissingFlag { flag: "--total" })?,
            due: flags.due.ok_or(ArgsError::MissingFlag { flag: "--due" })?,
            flexibility: if flags.strict {
                Flexibility::Strict
            } else {
                Flexibility::Flexible
            },
        },
        "log" => Command::Log {
            deadline: require_deadline(&flags)?,
            value: single_quantity(&mut flags)?,
            spent_minutes: flags.spent_minutes,
        },
        "baseline" => Command::Baseline {
            deadline: require_deadline(&flags)?,
            value: single_quantity(&mut flags)?,
        },
        "correct" => Command::Correct {
            deadline: require_deadline(&flags)?,
            value: single_quantity(&mut flags)?,
        },
        "set-status" => {
            let deadline = require_deadline(&flags)?;
            let raw = single_positional(&mut flags, "<status>")?;
            Command::SetStatus {
                deadline,
                status: DeadlineStatus::from_name(&raw.replace('-', "_"))
                    .ok_or(ArgsError::InvalidStatus { raw })?,
            }
        }
        other => return Err(ArgsError::UnknownCommand(other.to_owned())),
    };

    if let Some(extra) = flags.positional.into_iter().next() {
        return Err(ArgsError::UnknownArg(extra));
    }
    Ok(command)
}

fn require_deadline(flags: &CommandFlags) -> Result<DeadlineId, ArgsError> {
    flags
        .deadline
        .ok_or(ArgsError::MissingFlag { flag: "--deadline" })
}

fn single_positional(flags: &mut CommandFlags, name: &'static str) -> Result<String, ArgsError> {
    if flags.positional.is_empty() {
        return Err(ArgsError::MissingValue { flag: name });
    }
    Ok(flags.positional.remove(0))
}

fn single_quantity(flags: &mut CommandFlags) -> Result<QuantityInput, ArgsError> {
    QuantityInput::parse(&single_positional(flags, "<quantity>")?)
}

/// `sqlite:relative.db` becomes an absolute `sqlite://` URL; memory and absolute URLs pass through.
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw.starts_with("sqlite://") || raw.starts_with("sqlite::memory:") || raw.contains("mode=memory")
    {
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

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [command] [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status [--deadline <id>]                      Remaining work, urgency and pace (default)");
    eprintln!("  today                                         Today's reading target per format");
    eprintln!("  add --title <t> --format <f> --total <q> --due <YYYY-MM-DD> [--strict]");
    eprintln!("  log --deadline <id> <q> [--spent <minutes>]   Record forward progress");
    eprintln!("  baseline --deadline <id> <q>                  Record a starting point");
    eprintln!("  correct --deadline <id> <q>                   Move progress back to <q>");
    eprintln!("  set-status --deadline <id> <status>           pending, reading, paused, complete,");
    eprintln!("                                                did_not_finish, to_review");
    eprintln!();
    eprintln!("Quantities: pages as N, audio as H:MM (or whole hours).");
    eprintln!("Formats: pages, ebook-pages, audio-minutes.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --user-id <id>            Acting user (default: 1)");
    eprintln!("  --now <rfc3339>           Evaluate at a fixed instant");
    eprintln!("  --today <YYYY-MM-DD>      Evaluate at noon UTC of a day");
    eprintln!("  --json                    Print JSON instead of text");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PACE_DB_URL, PACE_USER_ID, RUST_LOG");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, ArgsError> {
        Args::parse_from(
            argv.iter().map(|arg| (*arg).to_owned()),
            EnvDefaults::default(),
        )
    }

    #[test]
    fn defaults_to_status() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, Command::Status { deadline: None });
        assert_eq!(args.db_url, DEFAULT_DB_URL);
        assert_eq!(args.user_id, UserId::new(1));
        assert!(!args.json);
    }

    #[test]
    fn env_values_are_overridden_by_flags() {
        let env = EnvDefaults {
            db_url: Some("sqlite:env.db".into()),
            user_id: Some("7".into()),
        };
        let args = Args::parse_from(
            ["today", "--user-id", "9"].map(String::from),
            env.clone(),
        )
        .unwrap();
        assert_eq!(args.user_id, UserId::new(9));
        assert_eq!(args.db_url, "sqlite:env.db");

        let args = Args::parse_from(["today"].map(String::from), env).unwrap();
        assert_eq!(args.user_id, UserId::new(7));
    }

    #[test]
    fn parses_add_with_audio_total() {
        let args = parse(&[
            "add", "--title", "Dune", "--format", "audio-minutes", "--total", "21:02", "--due",
            "2024-01-31", "--strict",
        ])
        .unwrap();
        let Command::Add {
            format,
            total,
            flexibility,
            ..
        } = args.command
        else {
            panic!("expected add");
        };
        assert_eq!(format, Format::AudioMinutes);
        assert_eq!(flexibility, Flexibility::Strict);
        assert_eq!(total.to_base(format).unwrap(), 21 * 60 + 2);
    }

    #[test]
    fn parses_correct_and_log_positionals() {
        let args = parse(&["correct", "--deadline", "3", "120", "--json"]).unwrap();
        assert!(args.json);
        assert_eq!(
            args.command,
            Command::Correct {
                deadline: DeadlineId::new(3),
                value: QuantityInput::parse("120").unwrap(),
            }
        );

        let args = parse(&["log", "--deadline", "3", "150", "--spent", "25"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Log {
                spent_minutes: Some(25),
                ..
            }
        ));
    }

    #[test]
    fn today_flag_pins_noon() {
        let args = parse(&["--today", "2023-11-15", "status"]).unwrap();
        let now = args.now.unwrap();
        assert_eq!(now.date_naive(), NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse(&["fly"]), Err(ArgsError::UnknownCommand(_))));
        assert!(matches!(
            parse(&["log", "150"]),
            Err(ArgsError::MissingFlag { flag: "--deadline" })
        ));
        assert!(matches!(
            parse(&["correct", "--deadline", "1", "abc"]),
            Err(ArgsError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            parse(&["set-status", "--deadline", "1", "shelved"]),
            Err(ArgsError::InvalidStatus { .. })
        ));
        assert!(matches!(
            parse(&["set-status", "--deadline", "1", "did-not-finish"]).map(|args| args.command),
            Ok(Command::SetStatus {
                status: DeadlineStatus::DidNotFinish,
                ..
            })
        ));
        assert!(matches!(
            parse(&["status", "--wat"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(&["baseline", "--deadline", "1", "10", "20"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn negative_quantities_name_the_offending_field() {
        let pages = QuantityInput::parse("-5").unwrap();
        assert!(matches!(
            pages.to_base(Format::Pages),
            Err(UnitError::Negative { field: "pages", value: -5 })
        ));
        assert!(matches!(
            QuantityInput::parse("-1:30").unwrap().to_base(Format::AudioMinutes),
            Err(UnitError::Negative { field: "hours", value: -1 })
        ));
        assert!(matches!(
            QuantityInput::parse("1:-30").unwrap().to_base(Format::AudioMinutes),
            Err(UnitError::Negative { field: "minutes", value: -30 })
        ));
        assert!(QuantityInput::parse("3:15")
            .unwrap()
            .to_base(Format::Pages)
            .is_err());
    }
}
