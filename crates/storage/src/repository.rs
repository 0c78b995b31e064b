use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pace_core::daily_target::DailyTargetBaseline;
use pace_core::model::{
    Deadline, DeadlineError, DeadlineId, Flexibility, Format, NewProgressEntry, PaceSettings,
    ProgressEntry, ProgressEntryId, StatusChange, UserId,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for a deadline that has no id yet.
#[derive(Debug, Clone)]
pub struct NewDeadlineRecord {
    pub user_id: UserId,
    pub title: String,
    pub format: Format,
    pub total_quantity: u32,
    pub deadline_date: NaiveDate,
    pub flexibility: Flexibility,
    pub created_at: DateTime<Utc>,
    pub status_history: Vec<StatusChange>,
}

impl NewDeadlineRecord {
    /// Copy every field except the id.
    #[must_use]
    pub fn from_deadline(deadline: &Deadline) -> Self {
        Self {
            user_id: deadline.user_id(),
            title: deadline.title().to_owned(),
            format: deadline.format(),
            total_quantity: deadline.total_quantity(),
            deadline_date: deadline.deadline_date(),
            flexibility: deadline.flexibility(),
            created_at: deadline.created_at(),
            status_history: deadline.status_history().to_vec(),
        }
    }

    /// Rebuild the domain deadline under a storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DeadlineError` if the record no longer validates.
    pub fn into_deadline(self, id: DeadlineId) -> Result<Deadline, DeadlineError> {
        Deadline::from_persisted(
            id,
            self.user_id,
            self.title,
            self.format,
            i64::from(self.total_quantity),
            self.deadline_date,
            self.flexibility,
            self.created_at,
            self.status_history,
        )
    }
}

/// Repository contract for deadlines and their status history.
#[async_trait]
pub trait DeadlineRepository: Send + Sync {
    /// Insert a new deadline and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deadline cannot be stored.
    async fn insert_new_deadline(&self, record: NewDeadlineRecord)
    -> Result<DeadlineId, StorageError>;

    /// Persist or update a deadline, replacing its status history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deadline cannot be stored.
    async fn upsert_deadline(&self, deadline: &Deadline) -> Result<(), StorageError>;

    /// Fetch a deadline by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_deadline(&self, id: DeadlineId) -> Result<Option<Deadline>, StorageError>;

    /// Every deadline of a user, archived ones included, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_deadlines(&self, user_id: UserId) -> Result<Vec<Deadline>, StorageError>;

    /// Deadlines whose latest status is active.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_active_deadlines(&self, user_id: UserId) -> Result<Vec<Deadline>, StorageError> {
        let mut deadlines = self.list_deadlines(user_id).await?;
        deadlines.retain(Deadline::is_active);
        Ok(deadlines)
    }
}

/// Repository contract for the append-only progress ledger.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Entries of a deadline ordered by `(created_at, id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_progress_entries(
        &self,
        deadline_id: DeadlineId,
    ) -> Result<Vec<ProgressEntry>, StorageError>;

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deadline does not exist.
    async fn append_entry(&self, entry: NewProgressEntry) -> Result<ProgressEntry, StorageError>;

    /// Delete `delete_ids` and insert `insert` as one atomic step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if any id is missing or belongs to another deadline,
    /// or if `insert` targets another deadline. Nothing is changed in that case.
    async fn replace_entries(
        &self,
        deadline_id: DeadlineId,
        delete_ids: &[ProgressEntryId],
        insert: NewProgressEntry,
    ) -> Result<ProgressEntry, StorageError>;
}

/// Repository contract for per-user pace settings.
#[async_trait]
pub trait PaceSettingsRepository: Send + Sync {
    /// Fetch stored settings for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_settings(&self, user_id: UserId) -> Result<Option<PaceSettings>, StorageError>;

    /// Persist settings for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(
        &self,
        user_id: UserId,
        settings: &PaceSettings,
    ) -> Result<(), StorageError>;
}

/// Repository contract for the once-per-day daily target baselines.
#[async_trait]
pub trait DailyTargetBaselineRepository: Send + Sync {
    /// The baseline captured for `user_id` on `day`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_baseline(
        &self,
        user_id: UserId,
        day: NaiveDate,
    ) -> Result<Option<DailyTargetBaseline>, StorageError>;

    /// Store `baseline` unless one already exists for its user and day.
    ///
    /// Returns whichever baseline is stored afterwards, so concurrent first calls of a day
    /// agree on the same one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the baseline cannot be stored or read back.
    async fn save_baseline_if_absent(
        &self,
        user_id: UserId,
        baseline: &DailyTargetBaseline,
    ) -> Result<DailyTargetBaseline, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    deadlines: Arc<Mutex<HashMap<DeadlineId, Deadline>>>,
    entries: Arc<Mutex<HashMap<ProgressEntryId, ProgressEntry>>>,
    last_entry_id: Arc<AtomicU64>,
    settings: Arc<Mutex<HashMap<UserId, PaceSettings>>>,
    baselines: Arc<Mutex<HashMap<(UserId, NaiveDate), DailyTargetBaseline>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Monotonic so a deleted entry's id is never handed out again.
    fn next_entry_id(&self) -> ProgressEntryId {
        ProgressEntryId::new(self.last_entry_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl DeadlineRepository for InMemoryRepository {
    async fn insert_new_deadline(
        &self,
        record: NewDeadlineRecord,
    ) -> Result<DeadlineId, StorageError> {
        let mut guard = self.deadlines.lock().map_err(poisoned)?;
        let next = guard.keys().map(DeadlineId::value).max().unwrap_or(0) + 1;
        let id = DeadlineId::new(next);
        let deadline = record
            .into_deadline(id)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.insert(id, deadline);
        Ok(id)
    }

    async fn upsert_deadline(&self, deadline: &Deadline) -> Result<(), StorageError> {
        let mut guard = self.deadlines.lock().map_err(poisoned)?;
        guard.insert(deadline.id(), deadline.clone());
        Ok(())
    }

    async fn load_deadline(&self, id: DeadlineId) -> Result<Option<Deadline>, StorageError> {
        let guard = self.deadlines.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_deadlines(&self, user_id: UserId) -> Result<Vec<Deadline>, StorageError> {
        let guard = self.deadlines.lock().map_err(poisoned)?;
        let mut found: Vec<Deadline> = guard
            .values()
            .filter(|deadline| deadline.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by_key(Deadline::id);
        Ok(found)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress_entries(
        &self,
        deadline_id: DeadlineId,
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let guard = self.entries.lock().map_err(poisoned)?;
        let mut found: Vec<ProgressEntry> = guard
            .values()
            .filter(|entry| entry.deadline_id == deadline_id)
            .copied()
            .collect();
        found.sort_by_key(|entry| (entry.created_at, entry.id));
        Ok(found)
    }

    async fn append_entry(&self, entry: NewProgressEntry) -> Result<ProgressEntry, StorageError> {
        {
            let deadlines = self.deadlines.lock().map_err(poisoned)?;
            if !deadlines.contains_key(&entry.deadline_id) {
                return Err(StorageError::NotFound);
            }
        }
        let mut guard = self.entries.lock().map_err(poisoned)?;
        let stored = entry.assign_id(self.next_entry_id());
        guard.insert(stored.id, stored);
        Ok(stored)
    }

    async fn replace_entries(
        &self,
        deadline_id: DeadlineId,
        delete_ids: &[ProgressEntryId],
        insert: NewProgressEntry,
    ) -> Result<ProgressEntry, StorageError> {
        let mut guard = self.entries.lock().map_err(poisoned)?;

        let foreign = delete_ids.iter().any(|id| {
            guard
                .get(id)
                .is_none_or(|entry| entry.deadline_id != deadline_id)
        });
        if insert.deadline_id != deadline_id || foreign {
            warn!(deadline_id = %deadline_id, "rejected replace with foreign or missing entries");
            return Err(StorageError::Conflict);
        }

        for id in delete_ids {
            guard.remove(id);
        }
        let stored = insert.assign_id(self.next_entry_id());
        guard.insert(stored.id, stored);
        debug!(
            deadline_id = %deadline_id,
            deleted = delete_ids.len(),
            inserted = %stored.id,
            "replaced progress entries"
        );
        Ok(stored)
    }
}

#[async_trait]
impl PaceSettingsRepository for InMemoryRepository {
    async fn get_settings(&self, user_id: UserId) -> Result<Option<PaceSettings>, StorageError> {
        let guard = self.settings.lock().map_err(poisoned)?;
        Ok(guard.get(&user_id).copied())
    }

    async fn save_settings(
        &self,
        user_id: UserId,
        settings: &PaceSettings,
    ) -> Result<(), StorageError> {
        let mut guard = self.settings.lock().map_err(poisoned)?;
        guard.insert(user_id, *settings);
        Ok(())
    }
}

#[async_trait]
impl DailyTargetBaselineRepository for InMemoryRepository {
    async fn load_baseline(
        &self,
        user_id: UserId,
        day: NaiveDate,
    ) -> Result<Option<DailyTargetBaseline>, StorageError> {
        let guard = self.baselines.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id, day)).cloned())
    }

    async fn save_baseline_if_absent(
        &self,
        user_id: UserId,
        baseline: &DailyTargetBaseline,
    ) -> Result<DailyTargetBaseline, StorageError> {
        let mut guard = self.baselines.lock().map_err(poisoned)?;
        Ok(guard
            .entry((user_id, baseline.day()))
            .or_insert_with(|| baseline.clone())
            .clone())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub deadlines: Arc<dyn DeadlineRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub settings: Arc<dyn PaceSettingsRepository>,
    pub baselines: Arc<dyn DailyTargetBaselineRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let deadlines: Arc<dyn DeadlineRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let settings: Arc<dyn PaceSettingsRepository> = Arc::new(repo.clone());
        let baselines: Arc<dyn DailyTargetBaselineRepository> = Arc::new(repo);
        Self {
            deadlines,
            progress,
            settings,
            baselines,
        }
    }
}
