//! Historical pace from ledger activity.
//!
//! The window is `pace_window_days` calendar days ending at the most recent activity day
//! strictly before the current calendar week. The partial current week is left out so a
//! slow Monday does not drag the average down.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::ledger::ProgressLedger;
use crate::model::{Deadline, Format, PaceSettings};
use crate::time::week_start_of;

/// Observed reading pace over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaceProfile {
    /// Units per active day; `0.0` means "no data", never "zero pace".
    pub average_per_day: f64,
    pub active_day_count: u32,
    pub is_reliable: bool,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Largest single-day total in the window.
    pub best_day: u32,
    pub total_units: u32,
}

impl PaceProfile {
    fn insufficient(window_start: NaiveDate, window_end: NaiveDate) -> Self {
        Self {
            average_per_day: 0.0,
            active_day_count: 0,
            is_reliable: false,
            window_start,
            window_end,
            best_day: 0,
            total_units: 0,
        }
    }

    /// True when at least one activity day fell inside the window.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.active_day_count > 0
    }
}

/// Computes `PaceProfile`s from one or more ledgers.
#[derive(Debug, Clone, Copy)]
pub struct PaceEstimator {
    window_days: u32,
    reliable_min_active_days: u32,
    week_start: Weekday,
}

impl PaceEstimator {
    #[must_use]
    pub fn new(settings: &PaceSettings) -> Self {
        Self {
            window_days: settings.pace_window_days(),
            reliable_min_active_days: settings.reliable_min_active_days(),
            week_start: settings.week_start(),
        }
    }

    /// Pace for a single deadline.
    #[must_use]
    pub fn estimate(&self, ledger: &ProgressLedger, today: NaiveDate) -> PaceProfile {
        self.estimate_across([ledger], today)
    }

    /// Pace for one format, pooled across every deadline of that format.
    ///
    /// Archived deadlines still contribute: what was read last month is still history.
    #[must_use]
    pub fn estimate_for_format<'a, I>(&self, format: Format, sources: I, today: NaiveDate) -> PaceProfile
    where
        I: IntoIterator<Item = (&'a Deadline, &'a ProgressLedger)>,
    {
        self.estimate_across(
            sources
                .into_iter()
                .filter(|(deadline, _)| deadline.format() == format)
                .map(|(_, ledger)| ledger),
            today,
        )
    }

    /// Pool activity of several ledgers into one profile.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn estimate_across<'a, I>(&self, ledgers: I, today: NaiveDate) -> PaceProfile
    where
        I: IntoIterator<Item = &'a ProgressLedger>,
    {
        let ledgers: Vec<&ProgressLedger> = ledgers.into_iter().collect();
        let last_complete_day = week_start_of(today, self.week_start) - Duration::days(1);
        let span = Duration::days(i64::from(self.window_days) - 1);

        let anchor = ledgers
            .iter()
            .filter_map(|ledger| ledger.last_activity_on_or_before(last_complete_day))
            .max();
        let Some(window_end) = anchor else {
            return PaceProfile::insufficient(last_complete_day - span, last_complete_day);
        };
        let window_start = window_end - span;

        let mut active_days = BTreeSet::new();
        let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for ledger in &ledgers {
            active_days.extend(ledger.activity_days(window_start, window_end));
            for (day, units) in ledger.daily_units(window_start, window_end) {
                let slot = per_day.entry(day).or_insert(0);
                *slot = slot.saturating_add(units);
            }
        }

        let active_day_count = active_days.len() as u32;
        if active_day_count == 0 {
            return PaceProfile::insufficient(window_start, window_end);
        }

        let total_units = per_day
            .values()
            .fold(0_u32, |acc, units| acc.saturating_add(*units));
        let best_day = per_day.values().copied().max().unwrap_or(0);

        PaceProfile {
            average_per_day: f64::from(total_units) / f64::from(active_day_count.max(1)),
            active_day_count,
            is_reliable: active_day_count >= self.reliable_min_active_days,
            window_start,
            window_end,
            best_day,
            total_units,
        }
    }
}

impl Default for PaceEstimator {
    fn default() -> Self {
        Self::new(&PaceSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DeadlineDraft, DeadlineId, Flexibility, ProgressEntry, ProgressEntryId, UserId,
    };
    use crate::time::start_of_day;
    use chrono::{DateTime, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, hour: i64) -> DateTime<Utc> {
        start_of_day(day) + Duration::hours(hour)
    }

    fn entry(id: u64, deadline: u64, progress: u32, when: DateTime<Utc>, baseline: bool) -> ProgressEntry {
        ProgressEntry {
            id: ProgressEntryId::new(id),
            deadline_id: DeadlineId::new(deadline),
            current_progress: progress,
            created_at: when,
            time_spent_reading: None,
            ignore_in_calcs: baseline,
        }
    }

    // Wednesday 2023-11-15; the current week starts Monday 2023-11-13.
    fn today() -> NaiveDate {
        date(2023, 11, 15)
    }

    #[test]
    fn audiobook_average_over_four_active_days() {
        let id = 1;
        let ledger = ProgressLedger::new(
            DeadlineId::new(id),
            vec![
                entry(1, id, 30, at(date(2023, 10, 30), 8), true),
                entry(2, id, 90, at(date(2023, 11, 1), 20), false),
                entry(3, id, 150, at(date(2023, 11, 4), 21), false),
                entry(4, id, 240, at(date(2023, 11, 8), 7), false),
                entry(5, id, 310, at(date(2023, 11, 11), 22), false),
            ],
        );

        let pace = PaceEstimator::default().estimate(&ledger, today());

        assert_eq!(pace.total_units, 280);
        assert_eq!(pace.active_day_count, 4);
        assert!((pace.average_per_day - 70.0).abs() < f64::EPSILON);
        assert!(pace.is_reliable);
        assert_eq!(pace.window_end, date(2023, 11, 11));
        assert_eq!(pace.window_start, date(2023, 10, 29));
        assert_eq!(pace.best_day, 90);
    }

    #[test]
    fn current_week_is_excluded() {
        let id = 1;
        let ledger = ProgressLedger::new(
            DeadlineId::new(id),
            vec![
                entry(1, id, 20, at(date(2023, 11, 10), 9), false),
                entry(2, id, 500, at(date(2023, 11, 14), 9), false),
            ],
        );

        let pace = PaceEstimator::default().estimate(&ledger, today());
        assert_eq!(pace.total_units, 20);
        assert_eq!(pace.active_day_count, 1);
        assert!(!pace.is_reliable);
    }

    #[test]
    fn window_anchors_at_last_activity_even_if_old() {
        let id = 1;
        let ledger = ProgressLedger::new(
            DeadlineId::new(id),
            vec![
                entry(1, id, 10, at(date(2023, 9, 1), 9), false),
                entry(2, id, 25, at(date(2023, 9, 2), 9), false),
            ],
        );

        let pace = PaceEstimator::default().estimate(&ledger, today());
        assert_eq!(pace.window_end, date(2023, 9, 2));
        assert_eq!(pace.active_day_count, 2);
        assert!((pace.average_per_day - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn no_activity_is_insufficient_not_zero_pace() {
        let id = 1;
        let ledger = ProgressLedger::new(
            DeadlineId::new(id),
            vec![entry(1, id, 40, at(date(2023, 11, 1), 9), true)],
        );

        let pace = PaceEstimator::default().estimate(&ledger, today());
        assert!(!pace.has_data());
        assert!(!pace.is_reliable);
        assert_eq!(pace.average_per_day, 0.0);
        assert_eq!(pace.window_end, date(2023, 11, 12));
    }

    #[test]
    fn format_pace_pools_matching_deadlines_only() {
        let now = at(date(2023, 10, 1), 0);
        let make = |id: u64, format: Format| {
            DeadlineDraft {
                user_id: UserId::new(1),
                title: format!("Book {id}"),
                format,
                total_quantity: 1000,
                deadline_date: date(2023, 12, 31),
                flexibility: Flexibility::Flexible,
            }
            .validate(DeadlineId::new(id), now)
            .unwrap()
        };
        let novel = make(1, Format::Pages);
        let memoir = make(2, Format::Pages);
        let audio = make(3, Format::AudioMinutes);

        let novel_ledger = ProgressLedger::new(
            novel.id(),
            vec![
                entry(1, 1, 30, at(date(2023, 11, 6), 9), false),
                entry(2, 1, 60, at(date(2023, 11, 7), 9), false),
            ],
        );
        let memoir_ledger = ProgressLedger::new(
            memoir.id(),
            vec![
                entry(3, 2, 40, at(date(2023, 11, 7), 21), false),
                entry(4, 2, 90, at(date(2023, 11, 9), 21), false),
            ],
        );
        let audio_ledger = ProgressLedger::new(
            audio.id(),
            vec![entry(5, 3, 600, at(date(2023, 11, 8), 9), false)],
        );

        let sources = [
            (&novel, &novel_ledger),
            (&memoir, &memoir_ledger),
            (&audio, &audio_ledger),
        ];
        let pace = PaceEstimator::default().estimate_for_format(Format::Pages, sources, today());

        assert_eq!(pace.total_units, 150);
        assert_eq!(pace.active_day_count, 3);
        assert_eq!(pace.best_day, 70);
        assert!((pace.average_per_day - 50.0).abs() < f64::EPSILON);
    }
}
