//! Run lock: mutual exclusion between concurrent runner invocations.

use std::future::Future;

use sqlx::{PgPool, Row};
use tracing::warn;

use crate::error::{MigrationError, MigrationResult};

/// Fixed identifier of the single lock row.
const LOCK_ROW_ID: i32 = 1;

/// Manages the single-row lock table that serializes runner invocations
/// across processes.
///
/// There is no timeout: if a process dies while holding the lock, the row
/// must be cleared manually (`UPDATE ... SET is_locked = FALSE`) before the
/// next run.
#[derive(Debug, Clone)]
pub struct LockManager {
    pool: PgPool,
    table: String,
}

impl LockManager {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Create the lock table and seed the lock row if missing.
    pub async fn ensure_table(&self) -> MigrationResult<()> {
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id INTEGER PRIMARY KEY,\n    \
                is_locked BOOLEAN NOT NULL DEFAULT FALSE\n\
            );",
            self.table
        );
        sqlx::query(&create).execute(&self.pool).await?;

        let seed = format!(
            "INSERT INTO {} (id, is_locked) VALUES ($1, FALSE) ON CONFLICT (id) DO NOTHING",
            self.table
        );
        sqlx::query(&seed)
            .bind(LOCK_ROW_ID)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Acquire the lock, failing fast with [`MigrationError::AlreadyLocked`]
    /// if another runner holds it.
    ///
    /// The read-check-write runs in one transaction with the row held under
    /// `FOR UPDATE`, so two concurrent acquires cannot both observe the lock
    /// as free. When already locked the transaction is dropped unmodified.
    pub async fn acquire(&self) -> MigrationResult<()> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT is_locked FROM {} WHERE id = $1 FOR UPDATE",
            self.table
        );
        let row = sqlx::query(&select)
            .bind(LOCK_ROW_ID)
            .fetch_one(&mut *tx)
            .await?;
        let is_locked: bool = row.try_get("is_locked")?;
        if is_locked {
            return Err(MigrationError::AlreadyLocked);
        }

        let update = format!("UPDATE {} SET is_locked = TRUE WHERE id = $1", self.table);
        sqlx::query(&update)
            .bind(LOCK_ROW_ID)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Release the lock unconditionally.
    pub async fn release(&self) -> MigrationResult<()> {
        let update = format!("UPDATE {} SET is_locked = FALSE WHERE id = $1", self.table);
        sqlx::query(&update)
            .bind(LOCK_ROW_ID)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Run `task` while holding the lock, releasing it on every exit path.
    ///
    /// A failed release is logged and never masks the task's own result.
    pub async fn with_lock<T, Fut>(&self, task: Fut) -> MigrationResult<T>
    where
        Fut: Future<Output = MigrationResult<T>>,
    {
        self.acquire().await?;
        let result = task.await;
        if let Err(err) = self.release().await {
            warn!("failed to release migration lock: {}", err);
        }
        result
    }
}
