//! Collection metadata store error types.

use thiserror::Error;

/// Errors raised by the collection metadata store.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No metadata row exists for the tenant.
    #[error("no collection metadata for tenant '{tenant}'")]
    NotFound {
        /// Tenant id.
        tenant: String,
    },

    /// The referenced history entry/migration id does not exist.
    #[error("no history entry for migration '{migration_id}' on tenant '{tenant}'")]
    HistoryEntryNotFound {
        /// Tenant id.
        tenant: String,
        /// Migration id.
        migration_id: String,
    },

    /// The underlying store failed.
    #[error("metadata storage error: {0}")]
    Storage(String),
}
