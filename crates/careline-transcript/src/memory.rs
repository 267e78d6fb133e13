//! In-memory transcript store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use careline_types::{CallRecord, TranscriptEntry};

use crate::error::TranscriptError;
use crate::{now_timestamp, TranscriptStore};

/// Transcript store held entirely in process memory.
///
/// Appends take the map lock for the whole read-modify-write, which gives
/// the same single-append atomicity as the SQLite store. Contents are lost
/// when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    calls: Mutex<HashMap<String, CallRecord>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CallRecord>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Each mutation is a single insert or push, so a panicking
                // holder cannot leave a half-written record behind.
                tracing::error!("memory transcript store lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl TranscriptStore for MemoryTranscriptStore {
    fn create_call(&self, call_sid: &str, from_number: &str) -> Result<(), TranscriptError> {
        self.lock().insert(
            call_sid.to_string(),
            CallRecord {
                call_sid: call_sid.to_string(),
                from: from_number.to_string(),
                transcript: Vec::new(),
            },
        );
        Ok(())
    }

    fn append_entry(&self, call_sid: &str, text: &str) -> Result<TranscriptEntry, TranscriptError> {
        let entry = TranscriptEntry {
            timestamp: now_timestamp(),
            text: text.to_string(),
        };
        self.lock()
            .entry(call_sid.to_string())
            .or_insert_with(|| CallRecord {
                call_sid: call_sid.to_string(),
                from: String::new(),
                transcript: Vec::new(),
            })
            .transcript
            .push(entry.clone());
        Ok(entry)
    }

    fn load_call(&self, call_sid: &str) -> Result<Option<CallRecord>, TranscriptError> {
        Ok(self.lock().get(call_sid).cloned())
    }
}
