use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates deadlines with their status history, the progress ledger,
/// per-user pace settings, and the indexes the ledger queries rely on. Ledger ids use
/// `AUTOINCREMENT` so a corrected-away entry's id is never assigned again.
///
/// Version 2 stores the daily target baseline captured on the first request of each day.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS deadlines (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    format TEXT NOT NULL
                        CHECK (format IN ('pages', 'ebook-pages', 'audio-minutes')),
                    total_quantity INTEGER NOT NULL CHECK (total_quantity > 0),
                    deadline_date TEXT NOT NULL,
                    flexibility TEXT NOT NULL CHECK (flexibility IN ('flexible', 'strict')),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS deadline_status_history (
                    id INTEGER PRIMARY KEY,
                    deadline_id INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (deadline_id) REFERENCES deadlines(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    deadline_id INTEGER NOT NULL,
                    current_progress INTEGER NOT NULL CHECK (current_progress >= 0),
                    created_at TEXT NOT NULL,
                    time_spent_reading INTEGER
                        CHECK (time_spent_reading IS NULL OR time_spent_reading >= 0),
                    ignore_in_calcs INTEGER NOT NULL DEFAULT 0 CHECK (ignore_in_calcs IN (0, 1)),
                    FOREIGN KEY (deadline_id) REFERENCES deadlines(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS pace_settings (
                    user_id INTEGER PRIMARY KEY,
                    impossible_factor REAL NOT NULL CHECK (impossible_factor > 1.0),
                    urgent_within_days INTEGER NOT NULL CHECK (urgent_within_days >= 1),
                    pace_window_days INTEGER NOT NULL CHECK (pace_window_days BETWEEN 1 AND 90),
                    reliable_min_active_days INTEGER NOT NULL CHECK (reliable_min_active_days >= 1),
                    week_start TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_deadlines_user
                    ON deadlines(user_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_status_history_deadline_created
                    ON deadline_status_history(deadline_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_entries_deadline_created
                    ON progress_entries(deadline_id, created_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 1, "applied schema migration");
    }

    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS daily_target_days (
                    user_id INTEGER NOT NULL,
                    day TEXT NOT NULL,
                    captured_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, day)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // no foreign key to deadlines: a day's baseline outlives the deadlines it counted
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS daily_target_rows (
                    user_id INTEGER NOT NULL,
                    day TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    deadline_id INTEGER NOT NULL,
                    format TEXT NOT NULL
                        CHECK (format IN ('pages', 'ebook-pages', 'audio-minutes')),
                    required INTEGER NOT NULL CHECK (required >= 0),
                    PRIMARY KEY (user_id, day, position),
                    FOREIGN KEY (user_id, day)
                        REFERENCES daily_target_days(user_id, day) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(2_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 2, "applied schema migration");
    }

    Ok(())
}
