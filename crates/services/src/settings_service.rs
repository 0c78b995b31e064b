use std::sync::Arc;

use chrono::Weekday;
use pace_core::model::{PaceSettings, UserId};
use storage::repository::PaceSettingsRepository;
use tracing::info;

use crate::error::SettingsServiceError;

/// Loads and saves a user's pace tunables.
#[derive(Clone)]
pub struct PaceSettingsService {
    repo: Arc<dyn PaceSettingsRepository>,
}

impl PaceSettingsService {
    #[must_use]
    pub fn new(repo: Arc<dyn PaceSettingsRepository>) -> Self {
        Self { repo }
    }

    /// Stored settings, or the defaults when the user never saved any.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError::Storage` if repository access fails.
    pub async fn load(&self, user_id: UserId) -> Result<PaceSettings, SettingsServiceError> {
        Ok(self.repo.get_settings(user_id).await?.unwrap_or_default())
    }

    /// Validate and persist new values.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError::Settings` for out-of-range values and
    /// `SettingsServiceError::Storage` if persistence fails.
    pub async fn save(
        &self,
        user_id: UserId,
        impossible_factor: f64,
        urgent_within_days: u32,
        pace_window_days: u32,
        reliable_min_active_days: u32,
        week_start: Weekday,
    ) -> Result<PaceSettings, SettingsServiceError> {
        let settings = PaceSettings::new(
            impossible_factor,
            urgent_within_days,
            pace_window_days,
            reliable_min_active_days,
            week_start,
        )?;
        self.repo.save_settings(user_id, &settings).await?;
        info!(
            user_id = %user_id,
            impossible_factor,
            urgent_within_days,
            pace_window_days,
            reliable_min_active_days,
            week_start = %week_start,
            "saved pace settings"
        );
        Ok(settings)
    }
}
