//! "Today's goal" per format, summed over a user's active deadlines.
//!
//! The required side is captured once per calendar day from the deadlines that were active
//! when the day began. The achieved side is recomputed on demand over every deadline the user
//! touched, archived ones included, so finishing a book mid-day keeps its credit.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{Deadline, DeadlineId, Format};
use crate::time::{end_of_previous_day, start_of_day};
use crate::urgency::days_left;

/// Required units for one deadline on the captured day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeadlineTarget {
    pub deadline_id: DeadlineId,
    pub format: Format,
    pub required: u32,
}

/// Frozen required-pace contributions for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTargetBaseline {
    day: NaiveDate,
    targets: Vec<DeadlineTarget>,
}

impl DailyTargetBaseline {
    /// Rebuild a baseline that was captured earlier and read back from storage.
    #[must_use]
    pub fn from_parts(day: NaiveDate, targets: Vec<DeadlineTarget>) -> Self {
        Self { day, targets }
    }

    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    #[must_use]
    pub fn targets(&self) -> &[DeadlineTarget] {
        &self.targets
    }

    /// Sum of required units for `format`.
    #[must_use]
    pub fn total_required(&self, format: Format) -> u32 {
        self.targets
            .iter()
            .filter(|target| target.format == format)
            .fold(0_u32, |acc, target| acc.saturating_add(target.required))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyTargetSnapshot {
    pub format: Format,
    pub total_required: u32,
    pub current_achieved: u32,
}

impl DailyTargetSnapshot {
    #[must_use]
    pub fn remaining_today(&self) -> u32 {
        self.total_required.saturating_sub(self.current_achieved)
    }

    #[must_use]
    pub fn is_met(&self) -> bool {
        self.current_achieved >= self.total_required
    }
}

/// One snapshot per format that has a target or recorded progress today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTargets {
    pub day: NaiveDate,
    pub by_format: BTreeMap<Format, DailyTargetSnapshot>,
}

impl DailyTargets {
    #[must_use]
    pub fn get(&self, format: Format) -> Option<&DailyTargetSnapshot> {
        self.by_format.get(&format)
    }

    /// Total required for `format`, zero when the format has no snapshot.
    #[must_use]
    pub fn total_required(&self, format: Format) -> u32 {
        self.get(format).map_or(0, |snapshot| snapshot.total_required)
    }

    #[must_use]
    pub fn current_achieved(&self, format: Format) -> u32 {
        self.get(format).map_or(0, |snapshot| snapshot.current_achieved)
    }
}

pub struct DailyTargetAggregator;

impl DailyTargetAggregator {
    /// Deadlines whose status was active at the first instant of `day`.
    #[must_use]
    pub fn active_at_start_of_day<'a>(
        deadlines: impl IntoIterator<Item = &'a Deadline>,
        day: NaiveDate,
    ) -> Vec<&'a Deadline> {
        let start = start_of_day(day);
        deadlines
            .into_iter()
            .filter(|deadline| deadline.is_active_at(start))
            .collect()
    }

    /// Freeze the required pace of every deadline active when `day` began.
    ///
    /// Progress is read as of the end of the previous day, so reading done today does not
    /// lower today's own target.
    pub fn capture<'a, F>(
        day: NaiveDate,
        active_at_start: impl IntoIterator<Item = &'a Deadline>,
        progress_as_of: F,
    ) -> DailyTargetBaseline
    where
        F: Fn(DeadlineId, DateTime<Utc>) -> u32,
    {
        let cutoff = end_of_previous_day(day);
        let mut seen = BTreeSet::new();
        let mut targets = Vec::new();

        for deadline in active_at_start {
            if !seen.insert(deadline.id()) {
                continue;
            }
            let progress = progress_as_of(deadline.id(), cutoff);
            let remaining = deadline.total_quantity().saturating_sub(progress);
            targets.push(DeadlineTarget {
                deadline_id: deadline.id(),
                format: deadline.format(),
                required: required_per_day(remaining, days_left(deadline.deadline_date(), day)),
            });
        }

        DailyTargetBaseline { day, targets }
    }

    /// Combine a frozen baseline with the progress made so far on its day.
    pub fn snapshot_with_baseline<'a, F>(
        baseline: &DailyTargetBaseline,
        all_including_archived: impl IntoIterator<Item = &'a Deadline>,
        progress_as_of: F,
        now: DateTime<Utc>,
    ) -> DailyTargets
    where
        F: Fn(DeadlineId, DateTime<Utc>) -> u32,
    {
        let cutoff = end_of_previous_day(baseline.day);
        let mut by_format: BTreeMap<Format, DailyTargetSnapshot> = BTreeMap::new();

        for target in &baseline.targets {
            let slot = by_format.entry(target.format).or_insert(DailyTargetSnapshot {
                format: target.format,
                total_required: 0,
                current_achieved: 0,
            });
            slot.total_required = slot.total_required.saturating_add(target.required);
        }

        let mut seen = BTreeSet::new();
        for deadline in all_including_archived {
            if !seen.insert(deadline.id()) {
                continue;
            }
            let gained = progress_as_of(deadline.id(), now)
                .saturating_sub(progress_as_of(deadline.id(), cutoff));
            if gained == 0 {
                continue;
            }
            let slot = by_format
                .entry(deadline.format())
                .or_insert(DailyTargetSnapshot {
                    format: deadline.format(),
                    total_required: 0,
                    current_achieved: 0,
                });
            slot.current_achieved = slot.current_achieved.saturating_add(gained);
        }

        DailyTargets {
            day: baseline.day,
            by_format,
        }
    }

    /// Capture and combine in one step, for callers that do not cache baselines.
    pub fn snapshot_for_today<'a, F>(
        active_at_start: impl IntoIterator<Item = &'a Deadline>,
        all_including_archived: impl IntoIterator<Item = &'a Deadline>,
        progress_as_of: F,
        now: DateTime<Utc>,
    ) -> DailyTargets
    where
        F: Fn(DeadlineId, DateTime<Utc>) -> u32,
    {
        let baseline = Self::capture(now.date_naive(), active_at_start, &progress_as_of);
        Self::snapshot_with_baseline(&baseline, all_including_archived, &progress_as_of, now)
    }
}

/// `ceil(remaining / max(1, days_left))`, so meeting every daily target finishes on time.
fn required_per_day(remaining: u32, days_left: i64) -> u32 {
    let days = u32::try_from(days_left.max(1)).unwrap_or(u32::MAX);
    remaining.div_ceil(days)
}
