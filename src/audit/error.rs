//! Audit store error types.

use thiserror::Error;

/// Errors raised by the audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The underlying store failed.
    #[error("audit storage error: {0}")]
    Storage(String),

    /// Cleanup was requested without an explicit retention window.
    #[error("cleanup requires an explicit retention_days value")]
    MissingRetention,

    /// An unsupported export format was requested.
    #[error("unsupported export format")]
    UnsupportedFormat,
}
