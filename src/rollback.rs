//! Rollback: reversing completed migrations by batch or by name.
//!
//! Batch rollback reverses everything in the most recent batch; named
//! rollback reverses an explicit list of completed migrations regardless of
//! batch boundaries. Both run reverse actions in descending name order and
//! delete each ledger entry as its action succeeds.

use std::time::Instant;

use tracing::{info, warn};

use crate::definitions::{LedgerEntry, MigrationDefinition, RollbackReport};
use crate::diff;
use crate::error::{MigrationError, MigrationResult};
use crate::registry::MigrationRegistry;
use crate::runner::{Direction, MigrationRunner};

/// Extension trait adding rollback operations to [`MigrationRunner`].
pub trait MigrationRollback {
    /// Roll back every migration in the most recent batch.
    ///
    /// Ledger entries with no registered definition are skipped: without a
    /// reverse action they cannot be rolled back. When the ledger is empty
    /// the call is a no-op and the lock is never taken.
    async fn rollback_last_batch(
        &self,
        registry: &MigrationRegistry,
    ) -> MigrationResult<RollbackReport>;

    /// Roll back specific completed migrations by name, ignoring batch
    /// boundaries.
    ///
    /// `names` is a comma- or whitespace-separated list. Names that are not
    /// both completed and registered are ignored; if nothing remains the
    /// call returns an empty report without taking the lock.
    async fn rollback_named(
        &self,
        registry: &MigrationRegistry,
        names: &str,
    ) -> MigrationResult<RollbackReport>;

    /// Roll back every applied migration, batch by batch, until a rollback
    /// makes no progress.
    async fn rollback_all(
        &self,
        registry: &MigrationRegistry,
    ) -> MigrationResult<RollbackReport>;
}

impl MigrationRollback for MigrationRunner {
    async fn rollback_last_batch(
        &self,
        registry: &MigrationRegistry,
    ) -> MigrationResult<RollbackReport> {
        let started = Instant::now();

        self.ensure_tables().await?;

        let ordered = registry.sorted_by_name_desc();
        let completed = self.ledger().completed().await?;
        let batch = self.ledger().last_batch_number().await?;

        if batch == 0 {
            info!("no migrations have been run yet");
            return Ok(RollbackReport {
                batch: None,
                rolled_back: Vec::new(),
                execution_time_ms: started.elapsed().as_millis(),
            });
        }

        let members = diff::batch_members(&completed, batch);
        let selected = diff::registered(&ordered, &members);

        info!(
            "rolling back batch {} with {} migration(s)",
            batch,
            selected.len()
        );

        let rolled_back = self.lock().with_lock(self.reverse_all(&selected)).await?;

        Ok(RollbackReport {
            batch: Some(batch),
            rolled_back,
            execution_time_ms: started.elapsed().as_millis(),
        })
    }

    async fn rollback_named(
        &self,
        registry: &MigrationRegistry,
        names: &str,
    ) -> MigrationResult<RollbackReport> {
        let started = Instant::now();

        self.ensure_tables().await?;

        let requested = diff::parse_name_list(names);
        let ordered = registry.sorted_by_name_desc();
        let completed = self.ledger().completed().await?;

        let matched: Vec<LedgerEntry> = completed
            .iter()
            .filter(|e| requested.iter().any(|name| *name == e.name))
            .cloned()
            .collect();
        let selected = diff::registered(&ordered, &matched);

        if selected.is_empty() {
            warn!("no completed migrations match the requested names");
            return Ok(RollbackReport {
                batch: None,
                rolled_back: Vec::new(),
                execution_time_ms: started.elapsed().as_millis(),
            });
        }

        info!("rolling back {} selected migration(s)", selected.len());

        let rolled_back = self.lock().with_lock(self.reverse_all(&selected)).await?;

        Ok(RollbackReport {
            batch: None,
            rolled_back,
            execution_time_ms: started.elapsed().as_millis(),
        })
    }

    async fn rollback_all(
        &self,
        registry: &MigrationRegistry,
    ) -> MigrationResult<RollbackReport> {
        let started = Instant::now();
        let mut rolled_back = Vec::new();

        loop {
            let report = self.rollback_last_batch(registry).await?;
            // stop on an empty report: either the ledger is drained or the
            // remaining entries have no registered definitions
            if report.rolled_back.is_empty() {
                break;
            }
            rolled_back.extend(report.rolled_back);
        }

        Ok(RollbackReport {
            batch: None,
            rolled_back,
            execution_time_ms: started.elapsed().as_millis(),
        })
    }
}

// Extension methods for MigrationRunner
impl MigrationRunner {
    /// Reverse each selected migration in order, deleting its ledger entry
    /// after the reverse action succeeds. Fails fast: entries reversed
    /// before a failure stay deleted.
    async fn reverse_all(
        &self,
        selected: &[&MigrationDefinition],
    ) -> MigrationResult<Vec<String>> {
        let mut rolled_back = Vec::with_capacity(selected.len());
        for migration in selected {
            self.execute(migration, Direction::Down).await?;

            self.ledger().delete(&migration.name).await.map_err(|source| {
                MigrationError::LedgerWriteFailed {
                    name: migration.name.clone(),
                    source,
                }
            })?;

            info!("finished rolling back {:?}", migration.name);
            rolled_back.push(migration.name.clone());
        }
        Ok(rolled_back)
    }
}
