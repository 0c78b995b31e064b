use std::collections::HashMap;

use pace_core::model::{Deadline, DeadlineId, StatusChange, UserId};
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use super::SqliteRepository;
use super::mapping::{
    conn, deadline_id_from_i64, id_to_i64, map_deadline_row, map_status_row, ser,
};
use crate::repository::{DeadlineRepository, NewDeadlineRecord, StorageError};

async fn insert_history(
    tx: &mut Transaction<'_, Sqlite>,
    deadline_id: i64,
    history: &[StatusChange],
) -> Result<(), StorageError> {
    for change in history {
        sqlx::query(
            r"
            INSERT INTO deadline_status_history (deadline_id, status, created_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(deadline_id)
        .bind(change.status.as_str())
        .bind(change.created_at)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl DeadlineRepository for SqliteRepository {
    async fn insert_new_deadline(
        &self,
        record: NewDeadlineRecord,
    ) -> Result<DeadlineId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO deadlines (user_id, title, format, total_quantity, deadline_date, flexibility, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_to_i64("user_id", record.user_id.value())?)
        .bind(record.title.trim().to_owned())
        .bind(record.format.as_str())
        .bind(i64::from(record.total_quantity))
        .bind(record.deadline_date)
        .bind(record.flexibility.as_str())
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let id = res.last_insert_rowid();
        insert_history(&mut tx, id, &record.status_history).await?;
        tx.commit().await.map_err(conn)?;

        debug!(deadline_id = id, user_id = %record.user_id, "inserted deadline");
        deadline_id_from_i64(id)
    }

    async fn upsert_deadline(&self, deadline: &Deadline) -> Result<(), StorageError> {
        let id = id_to_i64("deadline_id", deadline.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO deadlines (id, user_id, title, format, total_quantity, deadline_date, flexibility, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                format = excluded.format,
                total_quantity = excluded.total_quantity,
                deadline_date = excluded.deadline_date,
                flexibility = excluded.flexibility
            ",
        )
        .bind(id)
        .bind(id_to_i64("user_id", deadline.user_id().value())?)
        .bind(deadline.title().to_owned())
        .bind(deadline.format().as_str())
        .bind(i64::from(deadline.total_quantity()))
        .bind(deadline.deadline_date())
        .bind(deadline.flexibility().as_str())
        .bind(deadline.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM deadline_status_history WHERE deadline_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        insert_history(&mut tx, id, deadline.status_history()).await?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn load_deadline(&self, id: DeadlineId) -> Result<Option<Deadline>, StorageError> {
        let id = id_to_i64("deadline_id", id.value())?;
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, format, total_quantity, deadline_date, flexibility, created_at
            FROM deadlines WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let history_rows = sqlx::query(
            r"
            SELECT status, created_at
            FROM deadline_status_history
            WHERE deadline_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut history = Vec::with_capacity(history_rows.len());
        for history_row in &history_rows {
            history.push(map_status_row(history_row)?);
        }
        map_deadline_row(&row, history).map(Some)
    }

    async fn list_deadlines(&self, user_id: UserId) -> Result<Vec<Deadline>, StorageError> {
        let user = id_to_i64("user_id", user_id.value())?;

        let history_rows = sqlx::query(
            r"
            SELECT h.deadline_id, h.status, h.created_at
            FROM deadline_status_history h
            JOIN deadlines d ON d.id = h.deadline_id
            WHERE d.user_id = ?1
            ORDER BY h.deadline_id ASC, h.created_at ASC, h.id ASC
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut histories: HashMap<i64, Vec<StatusChange>> = HashMap::new();
        for row in &history_rows {
            let deadline_id: i64 = row.try_get("deadline_id").map_err(ser)?;
            histories
                .entry(deadline_id)
                .or_default()
                .push(map_status_row(row)?);
        }

        let rows = sqlx::query(
            r"
            SELECT id, user_id, title, format, total_quantity, deadline_date, flexibility, created_at
            FROM deadlines
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut deadlines = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            let history = histories.remove(&id).unwrap_or_default();
            deadlines.push(map_deadline_row(row, history)?);
        }
        Ok(deadlines)
    }
}
