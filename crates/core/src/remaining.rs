use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::ProgressLedger;
use crate::model::Deadline;

/// How much of a deadline is left as of a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemainingWork {
    /// Units still to read, never below zero.
    pub remaining: u32,
    /// Whole percent complete in `0..=100`.
    pub percentage: u8,
    /// Cumulative progress the figures were derived from.
    pub progress: u32,
}

impl RemainingWork {
    /// Derive remaining work from a total and a cumulative progress value.
    ///
    /// `total_quantity` is positive for every validated `Deadline`; a zero total is treated
    /// as already complete.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_progress(total_quantity: u32, progress: u32) -> Self {
        let remaining = total_quantity.saturating_sub(progress);
        let percentage = if total_quantity == 0 {
            100
        } else {
            (u64::from(progress) * 100 / u64::from(total_quantity)).min(100) as u8
        };

        Self {
            remaining,
            percentage,
            progress,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

/// Turns a deadline plus its ledger into `RemainingWork`.
pub struct RemainingWorkCalculator;

impl RemainingWorkCalculator {
    #[must_use]
    pub fn compute(
        deadline: &Deadline,
        ledger: &ProgressLedger,
        as_of: DateTime<Utc>,
    ) -> RemainingWork {
        RemainingWork::from_progress(deadline.total_quantity(), ledger.progress_as_of(as_of))
    }
}
