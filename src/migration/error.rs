//! Migration engine error types.

use thiserror::Error;

/// Errors raised by the migration engine's public surface. Failures *during* a
/// migration are recorded on its [`super::types::MigrationProgress`] instead of
/// propagated.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The tenant already has a non-terminal migration.
    #[error("tenant '{tenant}' already has an active migration ({migration_id})")]
    AlreadyActive {
        /// Tenant id.
        tenant: String,
        /// The existing migration's id.
        migration_id: String,
    },

    /// The global concurrent-migration cap has been reached.
    #[error("global migration concurrency cap ({cap}) reached")]
    ConcurrencyCapReached {
        /// The configured cap.
        cap: usize,
    },

    /// No migration exists with this id.
    #[error("migration not found: {migration_id}")]
    NotFound {
        /// Migration id.
        migration_id: String,
    },

    /// The target provider/model is not supported.
    #[error("validation failed: {reason}")]
    ValidationFailed {
        /// Failure reason.
        reason: String,
    },

    /// The chunk or collection store reported a failure.
    #[error("storage error: {0}")]
    Storage(String),
}
