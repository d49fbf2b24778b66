//! Key resolver error types.

use thiserror::Error;

/// Errors raised while resolving a credential.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No credential was found anywhere in the fallback chain.
    #[error("no credential available for tenant '{tenant}', provider '{provider}'")]
    NoCredential {
        /// Tenant id.
        tenant: String,
        /// Provider tag.
        provider: String,
    },

    /// The underlying credential store failed.
    #[error("credential store error: {0}")]
    Storage(String),
}
