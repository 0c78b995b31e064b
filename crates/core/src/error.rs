use thiserror::Error;

use crate::correction::CorrectionError;
use crate::model::{DeadlineError, ProgressEntryError, SettingsError};
use crate::units::UnitError;

/// Validation failures raised before any calculation runs.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
    #[error(transparent)]
    ProgressEntry(#[from] ProgressEntryError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error(transparent)]
    Correction(#[from] CorrectionError),
}
