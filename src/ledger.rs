//! Ledger store: persistence for completed-migration records.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::definitions::LedgerEntry;
use crate::error::MigrationResult;

/// Persistence layer for the migration ledger table.
///
/// One row per completed migration; a row is inserted when a forward action
/// succeeds and deleted when the matching reverse action succeeds, so a name
/// appears at most once at any time.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: PgPool,
    table: String,
}

impl LedgerStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Create the ledger table if it does not exist.
    pub async fn ensure_table(&self) -> MigrationResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id SERIAL PRIMARY KEY,\n    \
                name VARCHAR(255) UNIQUE NOT NULL,\n    \
                batch INTEGER NOT NULL,\n    \
                completed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\n\
            );",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// All completed migrations, in insertion order.
    pub async fn completed(&self) -> MigrationResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT name, batch, completed_at FROM {} ORDER BY id",
            self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let batch: i32 = row.try_get("batch")?;
            let completed_at: DateTime<Utc> = row.try_get("completed_at")?;
            entries.push(LedgerEntry {
                name,
                batch,
                completed_at,
            });
        }
        Ok(entries)
    }

    /// Record a completed migration.
    pub async fn insert(&self, entry: &LedgerEntry) -> Result<(), sqlx::Error> {
        let sql = format!(
            "INSERT INTO {} (name, batch, completed_at) VALUES ($1, $2, $3)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&entry.name)
            .bind(entry.batch)
            .bind(entry.completed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a completed migration's record by name.
    pub async fn delete(&self, name: &str) -> Result<(), sqlx::Error> {
        let sql = format!("DELETE FROM {} WHERE name = $1", self.table);
        sqlx::query(&sql).bind(name).execute(&self.pool).await?;
        Ok(())
    }

    /// Highest batch number in the ledger, or 0 when the ledger is empty.
    pub async fn last_batch_number(&self) -> MigrationResult<i32> {
        let sql = format!("SELECT COALESCE(MAX(batch), 0) FROM {}", self.table);
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        let batch: i32 = row.try_get(0)?;
        Ok(batch)
    }
}
