use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{DeadlineId, ProgressEntryId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressEntryError {
    #[error("progress must be >= 0, got {0}")]
    NegativeProgress(i64),

    #[error("progress {0} does not fit the supported range")]
    ProgressOverflow(i64),

    #[error("time spent reading must be >= 0 minutes, got {0}")]
    NegativeTimeSpent(i64),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Raw progress input for one deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEntryDraft {
    pub current_progress: i64,
    pub time_spent_reading: Option<i64>,
    pub ignore_in_calcs: bool,
}

impl ProgressEntryDraft {
    #[must_use]
    pub fn progress(current_progress: i64) -> Self {
        Self {
            current_progress,
            time_spent_reading: None,
            ignore_in_calcs: false,
        }
    }

    /// A starting point ("started at page 40"); counts toward remaining work but not pace.
    #[must_use]
    pub fn baseline(current_progress: i64) -> Self {
        Self {
            current_progress,
            time_spent_reading: None,
            ignore_in_calcs: true,
        }
    }

    #[must_use]
    pub fn with_time_spent(mut self, minutes: i64) -> Self {
        self.time_spent_reading = Some(minutes);
        self
    }

    /// Validate into an entry ready for insertion.
    ///
    /// # Errors
    ///
    /// Returns `ProgressEntryError` for negative or out-of-range values.
    pub fn validate(
        self,
        deadline_id: DeadlineId,
        created_at: DateTime<Utc>,
    ) -> Result<NewProgressEntry, ProgressEntryError> {
        let current_progress = non_negative_u32(self.current_progress)?;
        let time_spent_reading = self
            .time_spent_reading
            .map(|minutes| {
                if minutes < 0 {
                    return Err(ProgressEntryError::NegativeTimeSpent(minutes));
                }
                u32::try_from(minutes).map_err(|_| ProgressEntryError::ProgressOverflow(minutes))
            })
            .transpose()?;

        Ok(NewProgressEntry {
            deadline_id,
            current_progress,
            created_at,
            time_spent_reading,
            ignore_in_calcs: self.ignore_in_calcs,
        })
    }
}

pub(crate) fn non_negative_u32(value: i64) -> Result<u32, ProgressEntryError> {
    if value < 0 {
        return Err(ProgressEntryError::NegativeProgress(value));
    }
    u32::try_from(value).map_err(|_| ProgressEntryError::ProgressOverflow(value))
}

//
// ─── ENTRIES ───────────────────────────────────────────────────────────────────
//

/// A validated progress entry that has not been assigned an id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProgressEntry {
    pub deadline_id: DeadlineId,
    pub current_progress: u32,
    pub created_at: DateTime<Utc>,
    pub time_spent_reading: Option<u32>,
    pub ignore_in_calcs: bool,
}

impl NewProgressEntry {
    #[must_use]
    pub fn assign_id(self, id: ProgressEntryId) -> ProgressEntry {
        ProgressEntry {
            id,
            deadline_id: self.deadline_id,
            current_progress: self.current_progress,
            created_at: self.created_at,
            time_spent_reading: self.time_spent_reading,
            ignore_in_calcs: self.ignore_in_calcs,
        }
    }
}

/// One row of a deadline's progress ledger.
///
/// `current_progress` is cumulative in the deadline's base unit (pages or minutes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: ProgressEntryId,
    pub deadline_id: DeadlineId,
    pub current_progress: u32,
    pub created_at: DateTime<Utc>,
    pub time_spent_reading: Option<u32>,
    pub ignore_in_calcs: bool,
}

impl ProgressEntry {
    /// Baseline entries seed the starting point and never count as activity.
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.ignore_in_calcs
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn draft_validates_progress_and_time() {
        let entry = ProgressEntryDraft::progress(120)
            .with_time_spent(45)
            .validate(DeadlineId::new(2), fixed_now())
            .unwrap();

        assert_eq!(entry.current_progress, 120);
        assert_eq!(entry.time_spent_reading, Some(45));
        assert!(!entry.ignore_in_calcs);

        let stored = entry.assign_id(ProgressEntryId::new(9));
        assert_eq!(stored.id, ProgressEntryId::new(9));
        assert_eq!(stored.deadline_id, DeadlineId::new(2));
    }

    #[test]
    fn baseline_draft_is_ignored_in_calcs() {
        let entry = ProgressEntryDraft::baseline(40)
            .validate(DeadlineId::new(1), fixed_now())
            .unwrap()
            .assign_id(ProgressEntryId::new(1));
        assert!(entry.is_baseline());
    }

    #[test]
    fn draft_rejects_negative_values() {
        let err = ProgressEntryDraft::progress(-1)
            .validate(DeadlineId::new(1), fixed_now())
            .unwrap_err();
        assert_eq!(err, ProgressEntryError::NegativeProgress(-1));

        let err = ProgressEntryDraft::progress(10)
            .with_time_spent(-3)
            .validate(DeadlineId::new(1), fixed_now())
            .unwrap_err();
        assert_eq!(err, ProgressEntryError::NegativeTimeSpent(-3));
    }

    #[test]
    fn draft_rejects_overflowing_progress() {
        let err = ProgressEntryDraft::progress(i64::from(u32::MAX) + 1)
            .validate(DeadlineId::new(1), fixed_now())
            .unwrap_err();
        assert!(matches!(err, ProgressEntryError::ProgressOverflow(_)));
    }
}
