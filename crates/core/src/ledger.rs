//! Read-only view over one deadline's progress history.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{DeadlineId, ProgressEntry};

/// Ordered progress entries for a single deadline.
///
/// Entries are kept sorted by `(created_at, id)`, so ties on the timestamp resolve to the
/// entry with the higher id. Every query is a pure function of that ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLedger {
    deadline_id: DeadlineId,
    entries: Vec<ProgressEntry>,
}

impl ProgressLedger {
    /// Build a ledger from any collection of entries; entries of other deadlines are dropped.
    #[must_use]
    pub fn new(deadline_id: DeadlineId, entries: impl IntoIterator<Item = ProgressEntry>) -> Self {
        let mut entries: Vec<ProgressEntry> = entries
            .into_iter()
            .filter(|entry| entry.deadline_id == deadline_id)
            .collect();
        entries.sort_by_key(|entry| (entry.created_at, entry.id));
        Self {
            deadline_id,
            entries,
        }
    }

    #[must_use]
    pub fn empty(deadline_id: DeadlineId) -> Self {
        Self {
            deadline_id,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn deadline_id(&self) -> DeadlineId {
        self.deadline_id
    }

    #[must_use]
    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry overall.
    #[must_use]
    pub fn latest(&self) -> Option<&ProgressEntry> {
        self.entries.last()
    }

    /// Most recent entry with `created_at <= cutoff`.
    #[must_use]
    pub fn latest_as_of(&self, cutoff: DateTime<Utc>) -> Option<&ProgressEntry> {
        let idx = self
            .entries
            .partition_point(|entry| entry.created_at <= cutoff);
        idx.checked_sub(1).map(|i| &self.entries[i])
    }

    /// Cumulative progress as of `cutoff` (inclusive); `0` when nothing was logged yet.
    ///
    /// Baseline entries count here: they are real starting progress.
    #[must_use]
    pub fn progress_as_of(&self, cutoff: DateTime<Utc>) -> u32 {
        self.latest_as_of(cutoff)
            .map_or(0, |entry| entry.current_progress)
    }

    /// Cumulative progress at the end of calendar day `day`.
    #[must_use]
    pub fn progress_on(&self, day: NaiveDate) -> u32 {
        self.entries
            .iter()
            .take_while(|entry| entry.created_at.date_naive() <= day)
            .last()
            .map_or(0, |entry| entry.current_progress)
    }

    /// Latest logged progress regardless of time.
    #[must_use]
    pub fn current_progress(&self) -> u32 {
        self.latest().map_or(0, |entry| entry.current_progress)
    }

    /// Calendar days in `[start, end]` with at least one non-baseline entry.
    #[must_use]
    pub fn activity_days(&self, start: NaiveDate, end: NaiveDate) -> BTreeSet<NaiveDate> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_baseline())
            .map(|entry| entry.created_at.date_naive())
            .filter(|day| (start..=end).contains(day))
            .collect()
    }

    /// Most recent activity day on or before `day`.
    #[must_use]
    pub fn last_activity_on_or_before(&self, day: NaiveDate) -> Option<NaiveDate> {
        self.entries
            .iter()
            .rev()
            .filter(|entry| !entry.is_baseline())
            .map(|entry| entry.created_at.date_naive())
            .find(|entry_day| *entry_day <= day)
    }

    /// Units gained per activity day in `[start, end]`.
    ///
    /// Each non-baseline entry is credited with the increase over the entry before it.
    /// Baseline entries move the reference point without being credited.
    #[must_use]
    pub fn daily_units(&self, start: NaiveDate, end: NaiveDate) -> BTreeMap<NaiveDate, u32> {
        let mut per_day = BTreeMap::new();
        let mut previous = 0_u32;

        for entry in &self.entries {
            let gained = entry.current_progress.saturating_sub(previous);
            previous = entry.current_progress;
            if entry.is_baseline() {
                continue;
            }
            let day = entry.created_at.date_naive();
            if (start..=end).contains(&day) {
                let slot = per_day.entry(day).or_insert(0_u32);
                *slot = slot.saturating_add(gained);
            }
        }

        per_day
    }

    /// True when `current_progress` never decreases along the ledger order.
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].current_progress <= pair[1].current_progress)
    }
}
