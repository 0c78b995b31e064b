use pace_core::model::{DeadlineId, NewProgressEntry, ProgressEntry, ProgressEntryId};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

use super::SqliteRepository;
use super::mapping::{conn, entry_id_from_i64, id_to_i64, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

async fn insert_entry(
    tx: &mut Transaction<'_, Sqlite>,
    entry: NewProgressEntry,
) -> Result<ProgressEntry, StorageError> {
    let res = sqlx::query(
        r"
        INSERT INTO progress_entries (deadline_id, current_progress, created_at, time_spent_reading, ignore_in_calcs)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
    )
    .bind(id_to_i64("deadline_id", entry.deadline_id.value())?)
    .bind(i64::from(entry.current_progress))
    .bind(entry.created_at)
    .bind(entry.time_spent_reading.map(i64::from))
    .bind(i64::from(entry.ignore_in_calcs))
    .execute(&mut **tx)
    .await
    .map_err(conn)?;

    Ok(entry.assign_id(entry_id_from_i64(res.last_insert_rowid())?))
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress_entries(
        &self,
        deadline_id: DeadlineId,
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, deadline_id, current_progress, created_at, time_spent_reading, ignore_in_calcs
            FROM progress_entries
            WHERE deadline_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("deadline_id", deadline_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_progress_row(row)?);
        }
        Ok(out)
    }

    async fn append_entry(&self, entry: NewProgressEntry) -> Result<ProgressEntry, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM deadlines WHERE id = ?1")
            .bind(id_to_i64("deadline_id", entry.deadline_id.value())?)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let stored = insert_entry(&mut tx, entry).await?;
        tx.commit().await.map_err(conn)?;
        Ok(stored)
    }

    async fn replace_entries(
        &self,
        deadline_id: DeadlineId,
        delete_ids: &[ProgressEntryId],
        insert: NewProgressEntry,
    ) -> Result<ProgressEntry, StorageError> {
        if insert.deadline_id != deadline_id {
            warn!(deadline_id = %deadline_id, target = %insert.deadline_id, "replacement entry targets another deadline");
            return Err(StorageError::Conflict);
        }
        let deadline = id_to_i64("deadline_id", deadline_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        for id in delete_ids {
            let res = sqlx::query("DELETE FROM progress_entries WHERE id = ?1 AND deadline_id = ?2")
                .bind(id_to_i64("progress_entry_id", id.value())?)
                .bind(deadline)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            if res.rows_affected() != 1 {
                tx.rollback().await.map_err(conn)?;
                warn!(deadline_id = %deadline_id, entry_id = %id, "replace rolled back: entry missing or foreign");
                return Err(StorageError::Conflict);
            }
        }

        let stored = insert_entry(&mut tx, insert).await?;
        tx.commit().await.map_err(conn)?;

        debug!(
            deadline_id = %deadline_id,
            deleted = delete_ids.len(),
            inserted = %stored.id,
            "replaced progress entries"
        );
        Ok(stored)
    }
}
