//! Shared error types for the services crate.

use thiserror::Error;

use pace_core::correction::CorrectionError;
use pace_core::model::{DeadlineError, DeadlineId, ProgressEntryError, SettingsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `DeadlineService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeadlineServiceError {
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("deadline {0} does not exist")]
    UnknownDeadline(DeadlineId),
    #[error("progress {requested} is below current progress {current}; use a correction instead")]
    NotForward { requested: u32, current: u32 },
    #[error("progress {requested} exceeds the total of {total}")]
    ExceedsTotal { requested: u32, total: u32 },
    #[error(transparent)]
    Entry(#[from] ProgressEntryError),
    #[error(transparent)]
    Correction(#[from] CorrectionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `OverviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OverviewServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DailyTargetService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DailyTargetServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PaceSettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
