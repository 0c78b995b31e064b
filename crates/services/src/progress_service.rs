use std::sync::Arc;

use pace_core::correction::{BackwardProgressCorrector, CorrectionOutcome};
use pace_core::ledger::ProgressLedger;
use pace_core::model::{Deadline, DeadlineId, ProgressEntry, ProgressEntryDraft};
use storage::repository::{DeadlineRepository, ProgressRepository};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Records progress and applies backward corrections.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    deadlines: Arc<dyn DeadlineRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        deadlines: Arc<dyn DeadlineRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            deadlines,
            progress,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Load a consistent snapshot of a deadline's ledger.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn ledger(&self, deadline_id: DeadlineId) -> Result<ProgressLedger, ProgressServiceError> {
        let entries = self.progress.load_progress_entries(deadline_id).await?;
        Ok(ProgressLedger::new(deadline_id, entries))
    }

    /// Append a forward progress update at the current clock time.
    ///
    /// Logging the same value again is allowed (e.g. to record reading time).
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotForward` when the value is below current progress,
    /// `ProgressServiceError::ExceedsTotal` when it is above the deadline total, plus
    /// validation and storage errors.
    pub async fn log_progress(
        &self,
        deadline_id: DeadlineId,
        draft: ProgressEntryDraft,
    ) -> Result<ProgressEntry, ProgressServiceError> {
        let now = self.clock.now();
        let deadline = self.require_deadline(deadline_id).await?;
        let entry = draft.validate(deadline_id, now)?;

        let total = deadline.total_quantity();
        if entry.current_progress > total {
            warn!(deadline_id = %deadline_id, requested = entry.current_progress, total, "progress above total rejected");
            return Err(ProgressServiceError::ExceedsTotal {
                requested: entry.current_progress,
                total,
            });
        }

        let current = self.ledger(deadline_id).await?.progress_as_of(now);
        if entry.current_progress < current {
            warn!(deadline_id = %deadline_id, requested = entry.current_progress, current, "backward progress rejected");
            return Err(ProgressServiceError::NotForward {
                requested: entry.current_progress,
                current,
            });
        }

        let stored = self.progress.append_entry(entry).await?;
        info!(
            deadline_id = %deadline_id,
            entry_id = %stored.id,
            progress = stored.current_progress,
            baseline = stored.ignore_in_calcs,
            "logged progress"
        );
        Ok(stored)
    }

    /// Record a starting point that counts toward remaining work but not toward pace.
    ///
    /// # Errors
    ///
    /// Same as `log_progress`.
    pub async fn log_baseline(
        &self,
        deadline_id: DeadlineId,
        current_progress: i64,
    ) -> Result<ProgressEntry, ProgressServiceError> {
        self.log_progress(deadline_id, ProgressEntryDraft::baseline(current_progress))
            .await
    }

    /// Move a deadline's progress back to `new_value`.
    ///
    /// Every entry above `new_value` is deleted and one entry at `new_value` is inserted,
    /// in a single atomic repository call. On failure the ledger is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Correction` if `new_value` is negative or not below the
    /// current progress, and `ProgressServiceError::Storage` if the replace fails.
    pub async fn correct_progress(
        &self,
        deadline_id: DeadlineId,
        new_value: i64,
    ) -> Result<CorrectionOutcome, ProgressServiceError> {
        let now = self.clock.now();
        self.require_deadline(deadline_id).await?;
        let ledger = self.ledger(deadline_id).await?;

        let plan = BackwardProgressCorrector::plan(&ledger, new_value, now)?;
        debug!(
            deadline_id = %deadline_id,
            deletes = plan.delete_ids.len(),
            target = plan.insert.current_progress,
            "planned progress correction"
        );

        let inserted_entry = self
            .progress
            .replace_entries(deadline_id, &plan.delete_ids, plan.insert)
            .await
            .inspect_err(|err| {
                warn!(deadline_id = %deadline_id, error = %err, "progress correction failed");
            })?;

        info!(
            deadline_id = %deadline_id,
            from = ledger.progress_as_of(now),
            to = inserted_entry.current_progress,
            deleted = plan.delete_ids.len(),
            "corrected progress"
        );
        Ok(CorrectionOutcome {
            deleted_entry_ids: plan.delete_ids,
            inserted_entry,
        })
    }

    async fn require_deadline(&self, deadline_id: DeadlineId) -> Result<Deadline, ProgressServiceError> {
        self.deadlines
            .load_deadline(deadline_id)
            .await?
            .ok_or(ProgressServiceError::UnknownDeadline(deadline_id))
    }
}
