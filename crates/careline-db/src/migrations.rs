//! Embedded SQL migration runner.
//!
//! Applied migrations are recorded by name in `_careline_migrations`; each
//! runs at most once, inside its own transaction together with its
//! tracking row.

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_calls",
    sql: include_str!("migrations/001_calls.sql"),
}];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Runs all pending migrations and returns how many were applied.
///
/// # Errors
///
/// Returns `MigrationError` if a migration fails or the tracking table
/// cannot be read. A failed migration leaves no partial schema behind.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    let failed = |name: &str| {
        let name = name.to_string();
        move |source: rusqlite::Error| MigrationError::ExecutionFailed { name, source }
    };

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _careline_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(failed("_careline_migrations_bootstrap"))?;

    let mut applied = 0;

    for migration in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _careline_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;

        if already_applied {
            tracing::debug!(migration = migration.name, "migration already applied");
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        let tx = conn
            .unchecked_transaction()
            .map_err(failed(migration.name))?;
        tx.execute_batch(migration.sql)
            .map_err(failed(migration.name))?;
        tx.execute(
            "INSERT INTO _careline_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(failed(migration.name))?;
        tx.commit().map_err(failed(migration.name))?;

        applied += 1;
    }

    Ok(applied)
}
