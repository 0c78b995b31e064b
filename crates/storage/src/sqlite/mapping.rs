use chrono::{DateTime, Utc, Weekday};
use pace_core::daily_target::DeadlineTarget;
use pace_core::model::{
    Deadline, DeadlineId, DeadlineStatus, Flexibility, Format, PaceSettings, ProgressEntry,
    ProgressEntryId, StatusChange, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn deadline_id_from_i64(v: i64) -> Result<DeadlineId, StorageError> {
    Ok(DeadlineId::new(i64_to_u64("deadline_id", v)?))
}

pub(crate) fn entry_id_from_i64(v: i64) -> Result<ProgressEntryId, StorageError> {
    Ok(ProgressEntryId::new(i64_to_u64("progress_entry_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn parse_format(s: &str) -> Result<Format, StorageError> {
    Format::from_name(s).ok_or_else(|| StorageError::Serialization(format!("invalid format: {s}")))
}

pub(crate) fn parse_flexibility(s: &str) -> Result<Flexibility, StorageError> {
    Flexibility::from_name(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid flexibility: {s}")))
}

pub(crate) fn parse_status(s: &str) -> Result<DeadlineStatus, StorageError> {
    DeadlineStatus::from_name(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid status: {s}")))
}

pub(crate) fn parse_weekday(s: &str) -> Result<Weekday, StorageError> {
    s.parse::<Weekday>()
        .map_err(|_| StorageError::Serialization(format!("invalid week_start: {s}")))
}

pub(crate) fn map_status_row(row: &SqliteRow) -> Result<StatusChange, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    Ok(StatusChange::new(parse_status(&status)?, created_at))
}

/// Build a `Deadline` from a `deadlines` row plus its already-loaded history.
pub(crate) fn map_deadline_row(
    row: &SqliteRow,
    status_history: Vec<StatusChange>,
) -> Result<Deadline, StorageError> {
    let format: String = row.try_get("format").map_err(ser)?;
    let flexibility: String = row.try_get("flexibility").map_err(ser)?;

    Deadline::from_persisted(
        deadline_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        parse_format(&format)?,
        row.try_get::<i64, _>("total_quantity").map_err(ser)?,
        row.try_get("deadline_date").map_err(ser)?,
        parse_flexibility(&flexibility)?,
        row.try_get("created_at").map_err(ser)?,
        status_history,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressEntry, StorageError> {
    let time_spent = row
        .try_get::<Option<i64>, _>("time_spent_reading")
        .map_err(ser)?
        .map(|minutes| i64_to_u32("time_spent_reading", minutes))
        .transpose()?;

    Ok(ProgressEntry {
        id: entry_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        deadline_id: deadline_id_from_i64(row.try_get::<i64, _>("deadline_id").map_err(ser)?)?,
        current_progress: i64_to_u32(
            "current_progress",
            row.try_get::<i64, _>("current_progress").map_err(ser)?,
        )?,
        created_at: row.try_get("created_at").map_err(ser)?,
        time_spent_reading: time_spent,
        ignore_in_calcs: row.try_get::<i64, _>("ignore_in_calcs").map_err(ser)? != 0,
    })
}

pub(crate) fn map_target_row(row: &SqliteRow) -> Result<DeadlineTarget, StorageError> {
    let format: String = row.try_get("format").map_err(ser)?;
    Ok(DeadlineTarget {
        deadline_id: deadline_id_from_i64(row.try_get::<i64, _>("deadline_id").map_err(ser)?)?,
        format: parse_format(&format)?,
        required: i64_to_u32("required", row.try_get::<i64, _>("required").map_err(ser)?)?,
    })
}

pub(crate) fn map_settings_row(row: &SqliteRow) -> Result<PaceSettings, StorageError> {
    let week_start: String = row.try_get("week_start").map_err(ser)?;
    PaceSettings::new(
        row.try_get::<f64, _>("impossible_factor").map_err(ser)?,
        i64_to_u32(
            "urgent_within_days",
            row.try_get::<i64, _>("urgent_within_days").map_err(ser)?,
        )?,
        i64_to_u32(
            "pace_window_days",
            row.try_get::<i64, _>("pace_window_days").map_err(ser)?,
        )?,
        i64_to_u32(
            "reliable_min_active_days",
            row.try_get::<i64, _>("reliable_min_active_days")
                .map_err(ser)?,
        )?,
        parse_weekday(&week_start)?,
    )
    .map_err(ser)
}
