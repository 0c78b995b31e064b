use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use pace_core::daily_target::DailyTargetBaseline;
use pace_core::model::UserId;
use tracing::debug;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_target_row};
use crate::repository::{DailyTargetBaselineRepository, StorageError};

#[async_trait]
impl DailyTargetBaselineRepository for SqliteRepository {
    async fn load_baseline(
        &self,
        user_id: UserId,
        day: NaiveDate,
    ) -> Result<Option<DailyTargetBaseline>, StorageError> {
        let user = id_to_i64("user_id", user_id.value())?;

        let captured = sqlx::query("SELECT 1 FROM daily_target_days WHERE user_id = ?1 AND day = ?2")
            .bind(user)
            .bind(day)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if captured.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            r"
            SELECT deadline_id, format, required
            FROM daily_target_rows
            WHERE user_id = ?1 AND day = ?2
            ORDER BY position ASC
            ",
        )
        .bind(user)
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut targets = Vec::with_capacity(rows.len());
        for row in &rows {
            targets.push(map_target_row(row)?);
        }
        Ok(Some(DailyTargetBaseline::from_parts(day, targets)))
    }

    async fn save_baseline_if_absent(
        &self,
        user_id: UserId,
        baseline: &DailyTargetBaseline,
    ) -> Result<DailyTargetBaseline, StorageError> {
        let user = id_to_i64("user_id", user_id.value())?;
        let day = baseline.day();

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let claimed = sqlx::query(
            r"
            INSERT INTO daily_target_days (user_id, day, captured_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, day) DO NOTHING
            ",
        )
        .bind(user)
        .bind(day)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(conn)?;
            debug!(user_id = %user_id, day = %day, "daily target baseline already stored");
            return self
                .load_baseline(user_id, day)
                .await?
                .ok_or(StorageError::NotFound);
        }

        for (position, target) in baseline.targets().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO daily_target_rows (user_id, day, position, deadline_id, format, required)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(user)
            .bind(day)
            .bind(i64::try_from(position).map_err(|_| {
                StorageError::Serialization(format!("position overflow: {position}"))
            })?)
            .bind(id_to_i64("deadline_id", target.deadline_id.value())?)
            .bind(target.format.as_str())
            .bind(i64::from(target.required))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(baseline.clone())
    }
}
