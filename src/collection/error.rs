//! Vector collection error types.

use thiserror::Error;

/// Errors returned by [`super::client::CollectionClient`] implementations.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Could not reach the vector store.
    #[error("failed to connect to vector store at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Collection creation failed.
    #[error("failed to create collection '{collection}': {message}")]
    CreateFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// The collection does not exist.
    #[error("collection not found: {collection}")]
    NotFound {
        /// Collection name.
        collection: String,
    },

    /// Upsert failed.
    #[error("failed to upsert points to '{collection}': {message}")]
    UpsertFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Delete failed.
    #[error("failed to delete points from '{collection}': {message}")]
    DeleteFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// A vector did not match the collection's declared dimension.
    #[error("invalid vector dimension for '{collection}': expected {expected}, got {actual}")]
    InvalidDimension {
        /// Collection name.
        collection: String,
        /// Expected dimension.
        expected: u64,
        /// Actual dimension.
        actual: u64,
    },
}
