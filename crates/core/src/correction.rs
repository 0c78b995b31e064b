//! Planning for downward progress edits.
//!
//! A correction deletes every entry above the corrected value and appends one entry at `now`.
//! The plan is pure; the persistence layer applies it as a single atomic replace.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::ProgressLedger;
use crate::model::{
    DeadlineId, NewProgressEntry, ProgressEntry, ProgressEntryError, ProgressEntryId,
    non_negative_u32,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CorrectionError {
    #[error(transparent)]
    InvalidValue(#[from] ProgressEntryError),

    #[error("corrected progress {requested} is not below current progress {current}")]
    NotBackward { requested: u32, current: u32 },
}

/// Deletes and insert that together move a ledger back to a lower value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionPlan {
    pub deadline_id: DeadlineId,
    /// Entries above the corrected value, newest first.
    pub delete_ids: Vec<ProgressEntryId>,
    pub insert: NewProgressEntry,
}

impl CorrectionPlan {
    /// The ledger as it looks once the plan is applied with `assigned` as the new entry's id.
    #[must_use]
    pub fn preview(&self, ledger: &ProgressLedger, assigned: ProgressEntryId) -> ProgressLedger {
        let kept = ledger
            .entries()
            .iter()
            .filter(|entry| !self.delete_ids.contains(&entry.id))
            .copied()
            .chain(std::iter::once(self.insert.assign_id(assigned)));
        ProgressLedger::new(self.deadline_id, kept)
    }
}

/// What a persisted correction changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionOutcome {
    pub deleted_entry_ids: Vec<ProgressEntryId>,
    pub inserted_entry: ProgressEntry,
}

pub struct BackwardProgressCorrector;

impl BackwardProgressCorrector {
    /// Plan a correction of `ledger` down to `new_value` at `now`.
    ///
    /// # Errors
    ///
    /// Returns `CorrectionError::InvalidValue` for negative or out-of-range values and
    /// `CorrectionError::NotBackward` when `new_value` is not below the progress as of `now`.
    pub fn plan(
        ledger: &ProgressLedger,
        new_value: i64,
        now: DateTime<Utc>,
    ) -> Result<CorrectionPlan, CorrectionError> {
        let requested = non_negative_u32(new_value)?;
        let current = ledger.progress_as_of(now);
        if requested >= current {
            return Err(CorrectionError::NotBackward { requested, current });
        }

        let mut doomed: Vec<&ProgressEntry> = ledger
            .entries()
            .iter()
            .filter(|entry| entry.current_progress > requested)
            .collect();
        doomed.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(CorrectionPlan {
            deadline_id: ledger.deadline_id(),
            delete_ids: doomed.into_iter().map(|entry| entry.id).collect(),
            insert: NewProgressEntry {
                deadline_id: ledger.deadline_id(),
                current_progress: requested,
                created_at: now,
                time_spent_reading: None,
                ignore_in_calcs: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn ledger(progress: &[(u32, bool)]) -> ProgressLedger {
        let t0 = fixed_now() - Duration::days(10);
        ProgressLedger::new(
            DeadlineId::new(7),
            progress
                .iter()
                .enumerate()
                .map(|(i, (value, baseline))| ProgressEntry {
                    id: ProgressEntryId::new(i as u64 + 1),
                    deadline_id: DeadlineId::new(7),
                    current_progress: *value,
                    created_at: t0 + Duration::days(i as i64),
                    time_spent_reading: None,
                    ignore_in_calcs: *baseline,
                }),
        )
    }

    #[test]
    fn correction_from_200_to_120_drops_three_entries() {
        let before = ledger(&[(50, false), (100, false), (130, false), (160, false), (200, false)]);
        let now = fixed_now();

        let plan = BackwardProgressCorrector::plan(&before, 120, now).unwrap();
        assert_eq!(
            plan.delete_ids,
            vec![
                ProgressEntryId::new(5),
                ProgressEntryId::new(4),
                ProgressEntryId::new(3)
            ]
        );
        assert_eq!(plan.insert.current_progress, 120);
        assert_eq!(plan.insert.created_at, now);

        let after = plan.preview(&before, ProgressEntryId::new(6));
        assert_eq!(after.progress_as_of(now), 120);
        assert!(after.entries().iter().all(|e| e.current_progress <= 120));
        assert!(after.is_monotonic());
        assert_eq!(after.entries().len(), 3);
    }

    #[test]
    fn forward_or_equal_values_are_rejected() {
        let before = ledger(&[(40, true), (90, false)]);
        for value in [90, 91, 500] {
            assert!(matches!(
                BackwardProgressCorrector::plan(&before, value, fixed_now()),
                Err(CorrectionError::NotBackward { current: 90, .. })
            ));
        }
    }

    #[test]
    fn negative_value_is_rejected() {
        let before = ledger(&[(90, false)]);
        assert_eq!(
            BackwardProgressCorrector::plan(&before, -1, fixed_now()),
            Err(CorrectionError::InvalidValue(
                ProgressEntryError::NegativeProgress(-1)
            ))
        );
    }

    #[test]
    fn empty_ledger_has_nothing_to_correct() {
        let empty = ProgressLedger::empty(DeadlineId::new(7));
        assert!(BackwardProgressCorrector::plan(&empty, 0, fixed_now()).is_err());
    }

    #[test]
    fn baseline_above_the_new_value_is_deleted_too() {
        let before = ledger(&[(40, true), (60, false)]);
        let plan = BackwardProgressCorrector::plan(&before, 10, fixed_now()).unwrap();
        assert_eq!(plan.delete_ids.len(), 2);
    }

    #[test]
    fn correcting_to_any_lower_value_leaves_nothing_above_it() {
        let before = ledger(&[(5, true), (20, false), (20, false), (35, false), (70, false)]);
        let now = fixed_now();
        for value in 0..70 {
            let plan = BackwardProgressCorrector::plan(&before, i64::from(value), now).unwrap();
            let after = plan.preview(&before, ProgressEntryId::new(99));
            assert_eq!(after.progress_as_of(now), value, "value {value}");
            assert!(after.entries().iter().all(|e| e.current_progress <= value));
            assert!(after.is_monotonic(), "value {value}");
        }
    }
}
