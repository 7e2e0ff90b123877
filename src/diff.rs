//! Pending-set computation and selection helpers.
//!
//! Pure functions over the registry's ordered views and the ledger: nothing
//! here touches the database or mutates its inputs.

use std::collections::HashSet;

use crate::definitions::{LedgerEntry, MigrationDefinition};

/// Definitions in `all` that have no ledger entry, preserving `all`'s order.
pub fn pending<'a>(
    all: &[&'a MigrationDefinition],
    completed: &[LedgerEntry],
) -> Vec<&'a MigrationDefinition> {
    let done: HashSet<&str> = completed.iter().map(|e| e.name.as_str()).collect();
    all.iter()
        .filter(|m| !done.contains(m.name.as_str()))
        .copied()
        .collect()
}

/// Ledger entries belonging to the given batch.
pub fn batch_members(completed: &[LedgerEntry], batch: i32) -> Vec<LedgerEntry> {
    completed
        .iter()
        .filter(|e| e.batch == batch)
        .cloned()
        .collect()
}

/// Definitions in `ordered` that match a ledger entry in `records`,
/// preserving `ordered`'s order.
///
/// Ledger entries with no registered definition are dropped: without a
/// reverse action they cannot be rolled back.
pub fn registered<'a>(
    ordered: &[&'a MigrationDefinition],
    records: &[LedgerEntry],
) -> Vec<&'a MigrationDefinition> {
    let recorded: HashSet<&str> = records.iter().map(|e| e.name.as_str()).collect();
    ordered
        .iter()
        .filter(|m| recorded.contains(m.name.as_str()))
        .copied()
        .collect()
}

/// Parse a comma- or whitespace-separated list of migration names.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{MigrationOptions, SqlAction};
    use crate::registry::MigrationRegistry;
    use chrono::Utc;

    fn registry_of(names: &[&str]) -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        for name in names {
            registry
                .register(
                    *name,
                    SqlAction::new("SELECT 1"),
                    SqlAction::new("SELECT 1"),
                    MigrationOptions::default(),
                )
                .unwrap();
        }
        registry
    }

    fn entry(name: &str, batch: i32) -> LedgerEntry {
        LedgerEntry {
            name: name.to_string(),
            batch,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn pending_diffs_against_completed_preserving_order() {
        let registry = registry_of(&["003", "001", "002", "004"]);
        let ordered = registry.sorted_by_name();
        let completed = vec![entry("002", 1), entry("004", 2)];

        let names: Vec<_> = pending(&ordered, &completed)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["001", "003"]);
    }

    #[test]
    fn pending_is_everything_when_ledger_is_empty() {
        let registry = registry_of(&["001", "002"]);
        let ordered = registry.sorted_by_name();

        assert_eq!(pending(&ordered, &[]).len(), 2);
    }

    #[test]
    fn batch_members_filters_by_batch() {
        let completed = vec![entry("001", 4), entry("002", 5), entry("003", 5)];

        let members = batch_members(&completed, 5);
        let names: Vec<_> = members.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["002", "003"]);
        assert!(batch_members(&completed, 6).is_empty());
    }

    #[test]
    fn registered_drops_unknown_ledger_entries() {
        let registry = registry_of(&["001", "003"]);
        let ordered = registry.sorted_by_name_desc();
        let records = vec![entry("001", 1), entry("002", 1), entry("003", 1)];

        let names: Vec<_> = registered(&ordered, &records)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["003", "001"]);
    }

    #[test]
    fn parse_name_list_handles_commas_and_spaces() {
        assert_eq!(parse_name_list("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_name_list("a, b , c"), vec!["a", "b", "c"]);
        assert_eq!(parse_name_list("a b\tc"), vec!["a", "b", "c"]);
        assert_eq!(parse_name_list(" a ,, b "), vec!["a", "b"]);
        assert!(parse_name_list("").is_empty());
        assert!(parse_name_list(" , ").is_empty());
    }
}
