//! Error types for transcript persistence.

/// Errors returned by [`TranscriptStore`](crate::TranscriptStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    /// No pooled connection became available.
    #[error("transcript store connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    /// A SQL statement failed, including lock timeouts and constraint
    /// conflicts.
    #[error("transcript database error: {0}")]
    Database(#[from] rusqlite::Error),
}
