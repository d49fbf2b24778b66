//! Compatibility validator error types.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors raised by the compatibility validator. Most validation outcomes are encoded
/// as [`super::types::Issue`] entries on a report, not as errors — these variants are
/// reserved for truly malformed requests.
#[derive(Debug, Error)]
pub enum CompatError {
    /// The request itself was malformed (e.g. empty provider tag).
    #[error("invalid validation request: {0}")]
    InvalidArgument(String),

    /// The underlying provider registry lookup failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
