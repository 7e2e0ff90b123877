//! Migration runner: applies pending migrations in ordered, ledger-tracked
//! batches.

use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::definitions::{
    LedgerEntry, MigrationConfig, MigrationDefinition, MigrationStatus, RunReport,
    TransactionPolicy,
};
use crate::diff;
use crate::error::{MigrationError, MigrationResult};
use crate::ledger::LedgerStore;
use crate::lock::LockManager;
use crate::registry::MigrationRegistry;

/// Direction a migration action is executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
}

/// Executes registered migrations against a PostgreSQL database.
///
/// Migrations run strictly sequentially within one invocation; the lock
/// table keeps other invocations out. The runner itself holds no mutable
/// state, so one runner can serve multiple sequential runs.
pub struct MigrationRunner {
    pool: PgPool,
    ledger: LedgerStore,
    lock: LockManager,
}

impl MigrationRunner {
    /// Create a runner with the default table names.
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, MigrationConfig::default())
    }

    pub fn with_config(pool: PgPool, config: MigrationConfig) -> Self {
        let ledger = LedgerStore::new(pool.clone(), config.ledger_table);
        let lock = LockManager::new(pool.clone(), config.lock_table);
        Self { pool, ledger, lock }
    }

    /// Create a runner connected to the given database URL.
    pub async fn from_url(database_url: &str) -> MigrationResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn lock(&self) -> &LockManager {
        &self.lock
    }

    /// Create the ledger and lock tables if they do not exist.
    pub async fn ensure_tables(&self) -> MigrationResult<()> {
        self.ledger.ensure_table().await?;
        self.lock.ensure_table().await?;
        Ok(())
    }

    /// Apply all pending migrations as one batch.
    ///
    /// Pending migrations run in ascending name order, each recorded in the
    /// ledger immediately after its forward action succeeds. The first
    /// failure aborts the run; migrations recorded before it stay recorded,
    /// so a partially-applied batch is a possible terminal state.
    ///
    /// When nothing is pending the runner returns without touching the lock.
    pub async fn run(&self, registry: &MigrationRegistry) -> MigrationResult<RunReport> {
        let started = Instant::now();

        self.ensure_tables().await?;

        let ordered = registry.sorted_by_name();
        let completed = self.ledger.completed().await?;
        let pending = diff::pending(&ordered, &completed);

        if pending.is_empty() {
            info!("migrations already up to date");
            return Ok(RunReport {
                batch: None,
                applied: Vec::new(),
                skipped: completed.len(),
                execution_time_ms: started.elapsed().as_millis(),
            });
        }

        self.lock
            .with_lock(async {
                // one batch number for every migration applied by this run
                let batch = self.ledger.last_batch_number().await? + 1;
                info!(
                    "running batch {} with {} migration(s)",
                    batch,
                    pending.len()
                );

                let mut applied = Vec::with_capacity(pending.len());
                for migration in &pending {
                    self.execute(migration, Direction::Up).await?;

                    let entry = LedgerEntry {
                        name: migration.name.clone(),
                        batch,
                        completed_at: Utc::now(),
                    };
                    self.ledger.insert(&entry).await.map_err(|source| {
                        MigrationError::LedgerWriteFailed {
                            name: migration.name.clone(),
                            source,
                        }
                    })?;

                    info!("finished running {:?}", migration.name);
                    applied.push(migration.name.clone());
                }

                Ok(RunReport {
                    batch: Some(batch),
                    applied,
                    skipped: completed.len(),
                    execution_time_ms: started.elapsed().as_millis(),
                })
            })
            .await
    }

    /// Status of every registered migration, in ascending name order.
    pub async fn status(
        &self,
        registry: &MigrationRegistry,
    ) -> MigrationResult<Vec<(String, MigrationStatus)>> {
        self.ensure_tables().await?;
        let completed = self.ledger.completed().await?;

        let mut statuses = Vec::with_capacity(registry.len());
        for migration in registry.sorted_by_name() {
            let status = completed
                .iter()
                .find(|e| e.name == migration.name)
                .map(|e| MigrationStatus::Applied {
                    batch: e.batch,
                    completed_at: e.completed_at,
                })
                .unwrap_or(MigrationStatus::Pending);
            statuses.push((migration.name.clone(), status));
        }
        Ok(statuses)
    }

    /// Run one migration's action under its transaction policy, wrapping any
    /// failure with the migration's name.
    pub(crate) async fn execute(
        &self,
        migration: &MigrationDefinition,
        direction: Direction,
    ) -> MigrationResult<()> {
        self.execute_action(migration, direction)
            .await
            .map_err(|source| MigrationError::MigrationFailed {
                name: migration.name.clone(),
                source: Box::new(source),
            })
    }

    async fn execute_action(
        &self,
        migration: &MigrationDefinition,
        direction: Direction,
    ) -> MigrationResult<()> {
        let action = match direction {
            Direction::Up => &migration.up,
            Direction::Down => &migration.down,
        };

        match migration.transaction_policy {
            TransactionPolicy::Transactional => {
                let mut tx = self.pool.begin().await?;
                match action.execute(&mut *tx).await {
                    Ok(()) => {
                        tx.commit().await?;
                        Ok(())
                    }
                    // dropping the transaction rolls back the action's effects
                    Err(err) => Err(err),
                }
            }
            TransactionPolicy::NonTransactional => {
                let mut conn = self.pool.acquire().await?;
                action.execute(&mut conn).await
            }
        }
    }
}
