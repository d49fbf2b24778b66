//! Top-level error taxonomy.
//!
//! Subsystems raise their own `thiserror` enums (`cache::CacheError`,
//! `migration::MigrationError`, ...); this is the shape callers of the public surface
//! (`get_embeddings`, the migration surface, the admin cache surface) actually see.
//! Conversions from subsystem errors classify into these buckets without losing the
//! original message.

use thiserror::Error;

/// Crate-wide result alias.
pub type EccmsResult<T> = Result<T, EccmsError>;

/// Error taxonomy shared across every public ECCMS surface.
#[derive(Debug, Error)]
pub enum EccmsError {
    /// Bad input or out-of-range configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Tenant, task, conflict case, or migration id not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An active migration exists, maintenance is already running, or maintenance was
    /// requested too soon.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Credential absent or rejected.
    #[error("authentication failure: {0}")]
    AuthFailure(String),

    /// Provider reported rate limiting.
    #[error("provider rate limited: {0}")]
    ProviderRateLimited(String),

    /// Provider is unavailable (model removed, endpoint down).
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider failure that is safe to retry.
    #[error("provider transient error: {0}")]
    ProviderTransient(String),

    /// Relational or vector store error.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Operation exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EccmsError {
    /// Returns `true` for error classes a client may retry after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EccmsError::ProviderRateLimited(_)
                | EccmsError::ProviderTransient(_)
                | EccmsError::Timeout(_)
        )
    }

    /// Stable string code for the error class, for admin-surface responses.
    pub fn code(&self) -> &'static str {
        match self {
            EccmsError::InvalidArgument(_) => "invalid_argument",
            EccmsError::NotFound(_) => "not_found",
            EccmsError::Conflict(_) => "conflict",
            EccmsError::AuthFailure(_) => "auth_failure",
            EccmsError::ProviderRateLimited(_) => "provider_rate_limited",
            EccmsError::ProviderUnavailable(_) => "provider_unavailable",
            EccmsError::ProviderTransient(_) => "provider_transient",
            EccmsError::StorageFailure(_) => "storage_failure",
            EccmsError::Timeout(_) => "timeout",
            EccmsError::Internal(_) => "internal",
        }
    }
}
