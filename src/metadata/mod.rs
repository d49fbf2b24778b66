//! Collection Metadata Store: versioned per-tenant collection descriptors.

pub mod error;
pub mod store;
pub mod types;

pub use error::MetadataError;
pub use store::MetadataStore;
pub use types::{CollectionMetadata, CollectionStatus, ConfigHistoryEntry, EmbeddingConfig};
