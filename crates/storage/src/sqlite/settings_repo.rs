use async_trait::async_trait;
use pace_core::model::{PaceSettings, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_settings_row};
use crate::repository::{PaceSettingsRepository, StorageError};

#[async_trait]
impl PaceSettingsRepository for SqliteRepository {
    async fn get_settings(&self, user_id: UserId) -> Result<Option<PaceSettings>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                impossible_factor,
                urgent_within_days,
                pace_window_days,
                reliable_min_active_days,
                week_start
            FROM pace_settings
            WHERE user_id = ?1
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        map_settings_row(&row).map(Some)
    }

    async fn save_settings(
        &self,
        user_id: UserId,
        settings: &PaceSettings,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO pace_settings (
                user_id,
                impossible_factor,
                urgent_within_days,
                pace_window_days,
                reliable_min_active_days,
                week_start
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                impossible_factor = excluded.impossible_factor,
                urgent_within_days = excluded.urgent_within_days,
                pace_window_days = excluded.pace_window_days,
                reliable_min_active_days = excluded.reliable_min_active_days,
                week_start = excluded.week_start
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(settings.impossible_factor())
        .bind(i64::from(settings.urgent_within_days()))
        .bind(i64::from(settings.pace_window_days()))
        .bind(i64::from(settings.reliable_min_active_days()))
        .bind(settings.week_start().to_string())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
