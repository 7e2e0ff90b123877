//! Error types for the migration runner.
//!
//! Every failure is fail-fast: nothing is retried internally and each error
//! is surfaced once to the caller, prefixed with the failing migration's
//! name where one is involved.

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The run lock is held by another runner invocation. Terminal for this
    /// invocation; callers wanting blocking semantics must retry themselves.
    #[error("migration lock is already held by another runner")]
    AlreadyLocked,

    /// A migration action failed. Remaining migrations in the batch were not
    /// run; migrations recorded earlier in the run stay recorded.
    #[error("{name}: {source}")]
    MigrationFailed {
        name: String,
        #[source]
        source: Box<MigrationError>,
    },

    /// The ledger could not be updated after an action succeeded. The
    /// action's effects are applied but not recorded (or still recorded, on
    /// rollback); the ledger must be reconciled manually.
    #[error("{name}: failed to update migration ledger: {source}")]
    LedgerWriteFailed {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    /// A migration with the same name is already registered.
    #[error("duplicate migration name: {0}")]
    DuplicateName(String),

    /// A migration action reported a failure that is not a database error.
    #[error("{0}")]
    Action(String),

    /// Database connectivity or query error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
