//! Dedup engine error types.

use thiserror::Error;

/// Errors raised by the dedup detection/merge pipeline.
#[derive(Debug, Error)]
pub enum DedupError {
    /// A referenced chunk does not exist for the tenant.
    #[error("chunk not found: {chunk_id}")]
    ChunkNotFound {
        /// Missing chunk id.
        chunk_id: String,
    },

    /// A referenced conflict case does not exist.
    #[error("conflict case not found: {case_id}")]
    CaseNotFound {
        /// Missing case id.
        case_id: String,
    },

    /// The merge transaction failed; no partial merge was persisted.
    #[error("merge transaction failed: {reason}")]
    TransactionFailed {
        /// Failure reason.
        reason: String,
    },

    /// Dedup was invoked while disabled by policy, without a force override.
    #[error("dedup is disabled by policy for this tenant")]
    Disabled,

    /// The underlying chunk/vector store reported a failure.
    #[error("storage error: {0}")]
    Storage(String),
}
