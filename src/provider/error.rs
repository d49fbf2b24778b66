//! Provider adapter error taxonomy.

use thiserror::Error;

/// Errors returned by an [`super::adapter::EmbeddingProvider`]. Every variant maps to
/// one of five categorized failure modes.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    /// The supplied credential was rejected or is malformed.
    #[error("invalid credential for provider '{provider}'")]
    InvalidCredential {
        /// Provider tag.
        provider: String,
    },

    /// The provider is throttling this credential.
    #[error("rate limited by provider '{provider}', retry after {retry_after_secs:?}s")]
    RateLimited {
        /// Provider tag.
        provider: String,
        /// Hint from the provider, if given.
        retry_after_secs: Option<u64>,
    },

    /// The requested model is not offered by this provider.
    #[error("model '{model}' is unavailable on provider '{provider}'")]
    ModelUnavailable {
        /// Provider tag.
        provider: String,
        /// Model tag.
        model: String,
    },

    /// A transient failure (timeout, connection reset); safe to retry.
    #[error("transient provider failure for '{provider}': {message}")]
    Transient {
        /// Provider tag.
        provider: String,
        /// Error message.
        message: String,
    },

    /// A permanent failure; retrying will not help.
    #[error("permanent provider failure for '{provider}': {message}")]
    Permanent {
        /// Provider tag.
        provider: String,
        /// Error message.
        message: String,
    },
}

impl ProviderError {
    /// Whether a caller should retry this error (with backoff).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }
}
