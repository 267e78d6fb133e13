//! SQLite-backed transcript store.
//!
//! Appends run in an `IMMEDIATE` transaction and compute the next `seq`
//! inside the `INSERT` itself, so concurrent appends for one call serialize
//! on the write lock instead of racing on a read-modify-write.

use careline_db::DbPool;
use careline_types::{CallRecord, TranscriptEntry};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::error::TranscriptError;
use crate::{now_timestamp, TranscriptStore};

/// Transcript store over the `calls` and `transcript_entries` tables.
///
/// The pool must already have had `careline_db::run_migrations` applied.
#[derive(Clone)]
pub struct SqliteTranscriptStore {
    pool: DbPool,
}

impl SqliteTranscriptStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl TranscriptStore for SqliteTranscriptStore {
    fn create_call(&self, call_sid: &str, from_number: &str) -> Result<(), TranscriptError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO calls (call_sid, from_number, created_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(call_sid) DO UPDATE SET
                from_number = excluded.from_number,
                created_at = excluded.created_at",
            params![call_sid, from_number],
        )?;
        // The record is replaced as a whole, transcript included.
        let cleared = tx.execute(
            "DELETE FROM transcript_entries WHERE call_sid = ?1",
            params![call_sid],
        )?;
        tx.commit()?;

        if cleared > 0 {
            tracing::debug!(call_sid, cleared, "call record overwritten");
        }
        Ok(())
    }

    fn append_entry(&self, call_sid: &str, text: &str) -> Result<TranscriptEntry, TranscriptError> {
        let timestamp = now_timestamp();

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO calls (call_sid) VALUES (?1) ON CONFLICT(call_sid) DO NOTHING",
            params![call_sid],
        )?;
        let seq: i64 = tx.query_row(
            "INSERT INTO transcript_entries (call_sid, seq, timestamp, text)
             VALUES (
                ?1,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM transcript_entries WHERE call_sid = ?1),
                ?2,
                ?3
             )
             RETURNING seq",
            params![call_sid, timestamp, text],
            |row| row.get(0),
        )?;
        tx.commit()?;

        tracing::debug!(call_sid, seq, "appended transcript entry");

        Ok(TranscriptEntry {
            timestamp,
            text: text.to_string(),
        })
    }

    fn load_call(&self, call_sid: &str) -> Result<Option<CallRecord>, TranscriptError> {
        let conn = self.pool.get()?;

        let from: Option<String> = conn
            .query_row(
                "SELECT from_number FROM calls WHERE call_sid = ?1",
                params![call_sid],
                |row| row.get(0),
            )
            .optional()?;
        let Some(from) = from else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT timestamp, text FROM transcript_entries
             WHERE call_sid = ?1
             ORDER BY seq ASC",
        )?;
        let transcript = stmt
            .query_map(params![call_sid], |row| {
                Ok(TranscriptEntry {
                    timestamp: row.get(0)?,
                    text: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CallRecord {
            call_sid: call_sid.to_string(),
            from,
            transcript,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_db::{create_pool, run_migrations, DbRuntimeSettings};

    fn store() -> SqliteTranscriptStore {
        let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        SqliteTranscriptStore::new(pool)
    }

    #[test]
    fn create_then_append_keeps_order() {
        let store = store();
        store.create_call("CA1", "+15550001111").unwrap();
        store.append_entry("CA1", "Concern: broken router").unwrap();
        store.append_entry("CA1", "Email: a@example.com").unwrap();

        let record = store.load_call("CA1").unwrap().expect("call exists");
        assert_eq!(record.from, "+15550001111");
        let texts: Vec<_> = record.transcript.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["Concern: broken router", "Email: a@example.com"]);
    }

    #[test]
    fn append_creates_missing_call() {
        let store = store();
        let entry = store.append_entry("CA-new", "Concern: hello").unwrap();
        assert_eq!(entry.text, "Concern: hello");

        let record = store.load_call("CA-new").unwrap().expect("call was created");
        assert_eq!(record.from, "");
        assert_eq!(record.transcript, vec![entry]);
    }

    #[test]
    fn create_call_overwrites_record() {
        let store = store();
        store.create_call("CA1", "+1000").unwrap();
        store.append_entry("CA1", "Concern: first").unwrap();

        store.create_call("CA1", "+2000").unwrap();

        let record = store.load_call("CA1").unwrap().unwrap();
        assert_eq!(record.from, "+2000");
        assert!(record.transcript.is_empty());
    }

    #[test]
    fn create_call_is_idempotent() {
        let store = store();
        store.create_call("CA1", "+1000").unwrap();
        store.create_call("CA1", "+1000").unwrap();

        let record = store.load_call("CA1").unwrap().unwrap();
        assert_eq!(record.from, "+1000");
        assert!(record.transcript.is_empty());
    }

    #[test]
    fn unknown_call_loads_as_none() {
        assert!(store().load_call("nope").unwrap().is_none());
    }

    #[test]
    fn calls_do_not_share_transcripts() {
        let store = store();
        store.append_entry("CA1", "Concern: one").unwrap();
        store.append_entry("CA2", "Concern: two").unwrap();

        let one = store.load_call("CA1").unwrap().unwrap();
        assert_eq!(one.transcript.len(), 1);
        assert_eq!(one.transcript[0].text, "Concern: one");
    }
}
