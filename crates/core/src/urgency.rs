//! Discrete urgency level for a deadline, re-evaluated on every call.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Deadline, Flexibility, PaceSettings};
use crate::pace::PaceProfile;
use crate::remaining::RemainingWork;
use crate::time::days_between;

/// Ordered from calm to critical; `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Good,
    Approaching,
    Urgent,
    Impossible,
    Overdue,
}

impl UrgencyLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyLevel::Good => "good",
            UrgencyLevel::Approaching => "approaching",
            UrgencyLevel::Urgent => "urgent",
            UrgencyLevel::Impossible => "impossible",
            UrgencyLevel::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UrgencySnapshot {
    pub level: UrgencyLevel,
    /// `deadline_date - today` in whole days; negative once the date has passed.
    pub days_left: i64,
    /// Units per day needed from today on.
    pub required_pace_today: f64,
}

/// Days from `today` to the deadline date.
#[must_use]
pub fn days_left(deadline_date: NaiveDate, today: NaiveDate) -> i64 {
    days_between(today, deadline_date)
}

/// `remaining / max(1, days_left)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn required_pace(remaining: u32, days_left: i64) -> f64 {
    f64::from(remaining) / days_left.max(1) as f64
}

/// Maps time left, required pace and observed pace to an `UrgencyLevel`.
#[derive(Debug, Clone, Copy)]
pub struct UrgencyClassifier {
    impossible_factor: f64,
    urgent_within_days: u32,
}

impl UrgencyClassifier {
    #[must_use]
    pub fn new(settings: &PaceSettings) -> Self {
        Self {
            impossible_factor: settings.impossible_factor(),
            urgent_within_days: settings.urgent_within_days(),
        }
    }

    #[must_use]
    pub fn classify(
        &self,
        deadline: &Deadline,
        remaining: &RemainingWork,
        pace: &PaceProfile,
        today: NaiveDate,
    ) -> UrgencySnapshot {
        let days_left = days_left(deadline.deadline_date(), today);
        UrgencySnapshot {
            level: self.level(days_left, remaining.remaining, deadline.flexibility(), pace),
            days_left,
            required_pace_today: required_pace(remaining.remaining, days_left),
        }
    }

    /// Rules, first match wins:
    ///
    /// 1. past the deadline date: `Overdue`
    /// 2. strict deadline whose required pace exceeds `impossible_factor` times the best
    ///    observed day: `Impossible`
    /// 3. due today with work left: `Urgent`
    /// 4. required pace above the observed average: `Urgent` within `urgent_within_days`,
    ///    `Approaching` before that
    /// 5. `Good`
    ///
    /// Rules 2 and 4 need a reliable pace; without one the result falls through to `Good`.
    /// Rule 2 runs before rule 3 so a deadline that was impossible yesterday stays impossible
    /// on its last day.
    #[must_use]
    pub fn level(
        &self,
        days_left: i64,
        remaining: u32,
        flexibility: Flexibility,
        pace: &PaceProfile,
    ) -> UrgencyLevel {
        if days_left < 0 {
            return UrgencyLevel::Overdue;
        }

        let required = required_pace(remaining, days_left);

        if flexibility == Flexibility::Strict
            && pace.is_reliable
            && pace.best_day > 0
            && required > self.impossible_factor * f64::from(pace.best_day)
        {
            return UrgencyLevel::Impossible;
        }

        if days_left == 0 && remaining > 0 {
            return UrgencyLevel::Urgent;
        }

        if pace.is_reliable && pace.average_per_day > 0.0 && required > pace.average_per_day {
            return if days_left <= i64::from(self.urgent_within_days) {
                UrgencyLevel::Urgent
            } else {
                UrgencyLevel::Approaching
            };
        }

        UrgencyLevel::Good
    }
}

impl Default for UrgencyClassifier {
    fn default() -> Self {
        Self::new(&PaceSettings::default())
    }
}
