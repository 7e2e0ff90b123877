//! Core types for the migration system: actions, definitions, ledger
//! records, configuration and run reports.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, PgConnection};

use crate::error::MigrationResult;

/// A forward or reverse migration step.
///
/// Actions receive a plain connection handle: the runner passes either a
/// transaction-scoped connection or a pooled one depending on the
/// migration's [`TransactionPolicy`], and both dereference to
/// [`PgConnection`], so one capability serves both cases.
#[async_trait]
pub trait MigrationAction: Send + Sync {
    async fn execute(&self, conn: &mut PgConnection) -> MigrationResult<()>;
}

/// Migration action that executes a raw SQL string.
///
/// The SQL is sent over the simple query protocol, so it may contain
/// multiple statements separated by semicolons.
#[derive(Debug, Clone)]
pub struct SqlAction {
    sql: String,
}

impl SqlAction {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

#[async_trait]
impl MigrationAction for SqlAction {
    async fn execute(&self, conn: &mut PgConnection) -> MigrationResult<()> {
        conn.execute(self.sql.as_str()).await?;
        Ok(())
    }
}

/// Whether a migration's actions run inside their own database transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPolicy {
    /// The action runs inside a transaction scoped to this single migration;
    /// a failure rolls back only this migration's effects.
    Transactional,
    /// The action runs directly against a pooled connection; effects persist
    /// even when the action fails. Required for statements that refuse to
    /// run inside a transaction block (e.g. `CREATE INDEX CONCURRENTLY`).
    NonTransactional,
}

/// Registration-time options for a migration.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Run this migration's actions outside a transaction.
    pub disable_transaction: bool,
}

/// A registered migration: a unique name plus forward and reverse actions.
#[derive(Clone)]
pub struct MigrationDefinition {
    /// Unique name, expected to carry a sortable timestamp prefix so that
    /// lexicographic order matches chronological order.
    pub name: String,
    pub up: Arc<dyn MigrationAction>,
    pub down: Arc<dyn MigrationAction>,
    pub transaction_policy: TransactionPolicy,
}

impl fmt::Debug for MigrationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDefinition")
            .field("name", &self.name)
            .field("transaction_policy", &self.transaction_policy)
            .finish()
    }
}

/// One row of the migration ledger: a completed migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub name: String,
    /// Batch number grouping migrations applied in the same run.
    pub batch: i32,
    pub completed_at: DateTime<Utc>,
}

/// Configuration for the migration runner.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Table holding the migration ledger.
    pub ledger_table: String,
    /// Single-row table holding the run lock.
    pub lock_table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            ledger_table: "migrations".to_string(),
            lock_table: "migrations_lock".to_string(),
        }
    }
}

/// Result of applying pending migrations.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Batch number the applied migrations were recorded under, or `None`
    /// when everything was already up to date.
    pub batch: Option<i32>,
    /// Names of the migrations applied by this run, in execution order.
    pub applied: Vec<String>,
    /// Number of registered migrations that were already completed.
    pub skipped: usize,
    pub execution_time_ms: u128,
}

/// Result of a rollback operation.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    /// Batch that was rolled back, or `None` for a named rollback.
    pub batch: Option<i32>,
    /// Names of the migrations reversed, in execution order.
    pub rolled_back: Vec<String>,
    pub execution_time_ms: u128,
}

/// Status of a registered migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    Pending,
    Applied {
        batch: i32,
        completed_at: DateTime<Utc>,
    },
}
