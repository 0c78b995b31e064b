use std::sync::Arc;

use pace_core::model::{Deadline, DeadlineDraft, DeadlineId, DeadlineStatus, UserId};
use storage::repository::{DeadlineRepository, NewDeadlineRecord, StorageError};
use tracing::info;

use crate::Clock;
use crate::error::DeadlineServiceError;

/// Orchestrates deadline creation and status changes.
#[derive(Clone)]
pub struct DeadlineService {
    clock: Clock,
    deadlines: Arc<dyn DeadlineRepository>,
}

impl DeadlineService {
    #[must_use]
    pub fn new(clock: Clock, deadlines: Arc<dyn DeadlineRepository>) -> Self {
        Self { clock, deadlines }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Validate a draft and persist it as a new deadline in `Reading` status.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineServiceError::Deadline` for validation failures.
    /// Returns `DeadlineServiceError::Storage` if persistence fails.
    pub async fn create_deadline(
        &self,
        draft: DeadlineDraft,
    ) -> Result<Deadline, DeadlineServiceError> {
        let deadline = draft.validate(DeadlineId::new(0), self.clock.now())?;
        let id = self
            .deadlines
            .insert_new_deadline(NewDeadlineRecord::from_deadline(&deadline))
            .await?;
        info!(deadline_id = %id, title = deadline.title(), format = deadline.format().as_str(), "created deadline");
        Ok(deadline.with_id(id))
    }

    /// Fetch a deadline by id.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineServiceError::Storage` if repository access fails.
    pub async fn get_deadline(
        &self,
        id: DeadlineId,
    ) -> Result<Option<Deadline>, DeadlineServiceError> {
        Ok(self.deadlines.load_deadline(id).await?)
    }

    /// Every deadline of a user, archived ones included.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineServiceError::Storage` if repository access fails.
    pub async fn list_deadlines(&self, user_id: UserId) -> Result<Vec<Deadline>, DeadlineServiceError> {
        Ok(self.deadlines.list_deadlines(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `DeadlineServiceError::Storage` if repository access fails.
    pub async fn list_active(&self, user_id: UserId) -> Result<Vec<Deadline>, DeadlineServiceError> {
        Ok(self.deadlines.load_active_deadlines(user_id).await?)
    }

    /// Record a status change at the current clock time.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineServiceError::Storage` with `StorageError::NotFound` for unknown ids,
    /// or `DeadlineServiceError::Deadline` if the clock is behind the latest recorded change.
    pub async fn change_status(
        &self,
        id: DeadlineId,
        status: DeadlineStatus,
    ) -> Result<Deadline, DeadlineServiceError> {
        let mut deadline = self
            .deadlines
            .load_deadline(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let previous = deadline.status();
        deadline.record_status(status, self.clock.now())?;
        self.deadlines.upsert_deadline(&deadline).await?;
        info!(
            deadline_id = %id,
            from = previous.as_str(),
            to = status.as_str(),
            "changed deadline status"
        );
        Ok(deadline)
    }
}
