//! Connection pool creation and configuration.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Path that opens a private in-memory database.
const IN_MEMORY_PATH: &str = ":memory:";

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    ///
    /// This bounds the duration of a single store call under contention.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 2_000,
            pool_max_size: 4,
        }
    }
}

/// SQLite connection pool shared by the transcript store.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool of SQLite connections in WAL mode.
///
/// `db_path` may be `:memory:`, in which case the pool holds exactly one
/// connection: every in-memory connection is a separate database, so a
/// larger pool would hand out connections that never saw the migrations.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the first connection cannot be opened or
/// initialized.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            // In-memory databases report "memory" instead of "wal".
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!("journal_mode stayed at {journal_mode}, wanted wal")),
                ));
            }
            conn.execute_batch(&format!(
                "PRAGMA busy_timeout = {};",
                settings.busy_timeout_ms
            ))
        });

    let max_size = if db_path == IN_MEMORY_PATH {
        1
    } else {
        settings.pool_max_size
    };

    let pool = Pool::builder().max_size(max_size).build(manager)?;

    tracing::debug!(path = db_path, max_size, "opened sqlite pool");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_pool_uses_wal_and_settings() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 1_500,
            pool_max_size: 3,
        };

        let pool = create_pool(file.path().to_str().unwrap(), settings)
            .expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");

        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .expect("should query journal_mode");
        assert_eq!(mode, "wal");

        let busy_timeout: i64 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("should query busy_timeout");
        assert_eq!(busy_timeout, 1_500);

        assert_eq!(pool.max_size(), 3);
    }

    #[test]
    fn in_memory_pool_is_single_connection() {
        let pool = create_pool(":memory:", DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        assert_eq!(pool.max_size(), 1);

        {
            let conn = pool.get().unwrap();
            conn.execute_batch("CREATE TABLE probe (id INTEGER);").unwrap();
        }

        // The next checkout must see the same database.
        let conn = pool.get().unwrap();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = 'probe')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(exists);
    }
}
