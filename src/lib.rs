//! # pgshift: Batch-oriented schema migrations for PostgreSQL
//!
//! Callers register named migrations (a forward and a reverse action each)
//! into a [`MigrationRegistry`], then apply or roll them back through a
//! [`MigrationRunner`] connected to a `sqlx::PgPool`.
//!
//! Migrations are ordered lexicographically by name, so names should carry a
//! sortable timestamp prefix (e.g. `20240101_120000_create_users`). Every run
//! applies all pending migrations as one batch; a batch is rolled back as a
//! unit unless specific names are requested. A single-row lock table keeps
//! concurrent runner invocations from interleaving.
//!
//! ```rust,ignore
//! use pgshift::{MigrationOptions, MigrationRegistry, MigrationRunner, SqlAction};
//!
//! let mut registry = MigrationRegistry::new();
//! registry.register(
//!     "20240101_120000_create_users",
//!     SqlAction::new("CREATE TABLE users (id SERIAL PRIMARY KEY, email TEXT NOT NULL)"),
//!     SqlAction::new("DROP TABLE users"),
//!     MigrationOptions::default(),
//! )?;
//!
//! let runner = MigrationRunner::from_url("postgres://...").await?;
//! let report = runner.run(&registry).await?;
//! println!("applied {} migration(s)", report.applied.len());
//! ```

pub mod definitions;
pub mod diff;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod registry;
pub mod rollback;
pub mod runner;

pub use definitions::*;
pub use error::*;
pub use ledger::*;
pub use lock::*;
pub use registry::*;
pub use rollback::*;
pub use runner::*;
