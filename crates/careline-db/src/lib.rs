//! Database layer for Careline.
//!
//! Provides the SQLite connection pool (via `r2d2`), WAL-mode setup, and the
//! embedded schema migrations backing the transcript store.
//!
//! Migrations are SQL files compiled into the binary with `include_str!`, so
//! the schema always ships with the code that queries it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
