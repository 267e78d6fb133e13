//! Append-only call transcripts for Careline.
//!
//! The router talks to persistence only through the [`TranscriptStore`]
//! trait. Two implementations ship here:
//!
//! | Store | Backing | Used for |
//! |-------|---------|----------|
//! | [`SqliteTranscriptStore`] | `careline-db` pool | production |
//! | [`MemoryTranscriptStore`] | mutex-guarded map | tests, ephemeral runs |
//!
//! Every append assigns the next position for its call atomically, so two
//! webhook deliveries racing on the same call can never overwrite each
//! other's entry.

mod error;
mod memory;
mod store;

pub use error::TranscriptError;
pub use memory::MemoryTranscriptStore;
pub use store::SqliteTranscriptStore;

use careline_types::{CallRecord, TranscriptEntry};

/// Persistence contract for calls and their transcripts.
///
/// Methods are synchronous; async callers run them on the blocking pool.
pub trait TranscriptStore: Send + Sync {
    /// Inserts a call record, replacing any existing record (and its
    /// transcript) with the same identifier.
    fn create_call(&self, call_sid: &str, from_number: &str) -> Result<(), TranscriptError>;

    /// Appends one timestamped line to the call's transcript, creating the
    /// call if it does not exist yet. Returns the stored entry.
    fn append_entry(&self, call_sid: &str, text: &str) -> Result<TranscriptEntry, TranscriptError>;

    /// Loads a call and its transcript in append order.
    fn load_call(&self, call_sid: &str) -> Result<Option<CallRecord>, TranscriptError>;
}

/// Current time as an ISO-8601 UTC timestamp, e.g. `2024-05-01T12:00:00.123456+00:00`.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_utc_iso8601() {
        let ts = now_timestamp();
        assert!(ts.ends_with("+00:00"), "unexpected timestamp: {ts}");
        chrono::DateTime::parse_from_rfc3339(&ts).expect("timestamp should parse");
    }
}
