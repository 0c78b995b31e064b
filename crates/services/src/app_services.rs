use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::daily_target_service::DailyTargetService;
use crate::deadline_service::DeadlineService;
use crate::error::AppServicesError;
use crate::overview_service::OverviewService;
use crate::progress_service::ProgressService;
use crate::settings_service::PaceSettingsService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    deadlines: Arc<DeadlineService>,
    progress: Arc<ProgressService>,
    overview: Arc<OverviewService>,
    daily_targets: Arc<DailyTargetService>,
    settings: Arc<PaceSettingsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        Self {
            deadlines: Arc::new(DeadlineService::new(clock, Arc::clone(&storage.deadlines))),
            progress: Arc::new(ProgressService::new(
                clock,
                Arc::clone(&storage.deadlines),
                Arc::clone(&storage.progress),
            )),
            overview: Arc::new(OverviewService::new(
                clock,
                Arc::clone(&storage.deadlines),
                Arc::clone(&storage.progress),
                Arc::clone(&storage.settings),
            )),
            daily_targets: Arc::new(DailyTargetService::new(
                clock,
                Arc::clone(&storage.deadlines),
                Arc::clone(&storage.progress),
                Arc::clone(&storage.baselines),
            )),
            settings: Arc::new(PaceSettingsService::new(Arc::clone(&storage.settings))),
        }
    }

    #[must_use]
    pub fn deadlines(&self) -> Arc<DeadlineService> {
        Arc::clone(&self.deadlines)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn overview(&self) -> Arc<OverviewService> {
        Arc::clone(&self.overview)
    }

    #[must_use]
    pub fn daily_targets(&self) -> Arc<DailyTargetService> {
        Arc::clone(&self.daily_targets)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<PaceSettingsService> {
        Arc::clone(&self.settings)
    }
}
