//! Migration registry: the caller-owned collection of migration definitions.
//!
//! The registry is an explicit value passed into the runner rather than
//! process-global state, so running against a second database only requires
//! a second registry. Ordered views are pure: sorting never reorders the
//! registrations themselves.

use std::sync::Arc;

use crate::definitions::{
    MigrationAction, MigrationDefinition, MigrationOptions, TransactionPolicy,
};
use crate::error::{MigrationError, MigrationResult};

/// Ordered collection of registered migrations.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: Vec<MigrationDefinition>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration under a unique name.
    ///
    /// Names are expected to embed a sortable timestamp prefix
    /// (e.g. `20240101_120000_create_users`) so lexicographic order matches
    /// chronological order. Registering a name twice is rejected with
    /// [`MigrationError::DuplicateName`].
    pub fn register(
        &mut self,
        name: impl Into<String>,
        up: impl MigrationAction + 'static,
        down: impl MigrationAction + 'static,
        options: MigrationOptions,
    ) -> MigrationResult<()> {
        let name = name.into();
        if self.migrations.iter().any(|m| m.name == name) {
            return Err(MigrationError::DuplicateName(name));
        }

        let transaction_policy = if options.disable_transaction {
            TransactionPolicy::NonTransactional
        } else {
            TransactionPolicy::Transactional
        };

        self.migrations.push(MigrationDefinition {
            name,
            up: Arc::new(up),
            down: Arc::new(down),
            transaction_policy,
        });
        Ok(())
    }

    /// Remove every registered migration.
    pub fn reset_all(&mut self) {
        self.migrations.clear();
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Definitions sorted by name ascending (apply order).
    pub fn sorted_by_name(&self) -> Vec<&MigrationDefinition> {
        let mut sorted: Vec<_> = self.migrations.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted
    }

    /// Definitions sorted by name descending (rollback order).
    pub fn sorted_by_name_desc(&self) -> Vec<&MigrationDefinition> {
        let mut sorted: Vec<_> = self.migrations.iter().collect();
        sorted.sort_by(|a, b| b.name.cmp(&a.name));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::SqlAction;

    fn noop() -> SqlAction {
        SqlAction::new("SELECT 1")
    }

    fn register_noop(registry: &mut MigrationRegistry, name: &str) {
        registry
            .register(name, noop(), noop(), MigrationOptions::default())
            .unwrap();
    }

    #[test]
    fn register_appends_definitions() {
        let mut registry = MigrationRegistry::new();
        assert!(registry.is_empty());

        register_noop(&mut registry, "20240101_one");
        register_noop(&mut registry, "20240102_two");

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = MigrationRegistry::new();
        register_noop(&mut registry, "20240101_one");

        let err = registry
            .register("20240101_one", noop(), noop(), MigrationOptions::default())
            .unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateName(name) if name == "20240101_one"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn disable_transaction_maps_to_policy() {
        let mut registry = MigrationRegistry::new();
        register_noop(&mut registry, "20240101_default");
        registry
            .register(
                "20240102_raw",
                noop(),
                noop(),
                MigrationOptions {
                    disable_transaction: true,
                },
            )
            .unwrap();

        let sorted = registry.sorted_by_name();
        assert_eq!(
            sorted[0].transaction_policy,
            TransactionPolicy::Transactional
        );
        assert_eq!(
            sorted[1].transaction_policy,
            TransactionPolicy::NonTransactional
        );
    }

    #[test]
    fn sorted_views_do_not_mutate_registration_order() {
        let mut registry = MigrationRegistry::new();
        register_noop(&mut registry, "20240103_three");
        register_noop(&mut registry, "20240101_one");
        register_noop(&mut registry, "20240102_two");

        let ascending: Vec<_> = registry
            .sorted_by_name()
            .iter()
            .map(|m| m.name.clone())
            .collect();
        let descending: Vec<_> = registry
            .sorted_by_name_desc()
            .iter()
            .map(|m| m.name.clone())
            .collect();

        assert_eq!(
            ascending,
            vec!["20240101_one", "20240102_two", "20240103_three"]
        );
        assert_eq!(
            descending,
            vec!["20240103_three", "20240102_two", "20240101_one"]
        );

        // a sort in one direction must not leak into the other
        let ascending_again: Vec<_> = registry
            .sorted_by_name()
            .iter()
            .map(|m| m.name.clone())
            .collect();
        assert_eq!(ascending, ascending_again);
    }

    #[test]
    fn reset_all_clears_registrations() {
        let mut registry = MigrationRegistry::new();
        register_noop(&mut registry, "20240101_one");
        register_noop(&mut registry, "20240102_two");

        registry.reset_all();
        assert!(registry.is_empty());

        // the name is free again after a reset
        register_noop(&mut registry, "20240101_one");
        assert_eq!(registry.len(), 1);
    }
}
