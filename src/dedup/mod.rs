//! Chunk deduplication engine: similarity detection, merge/preserve decisioning, and
//! manual conflict resolution.

pub mod engine;
pub mod error;
pub mod grouping;
pub mod manager;
pub mod similarity;
pub mod store;
pub mod types;

pub use engine::DedupEngine;
pub use error::DedupError;
pub use manager::DedupManager;
pub use store::{ChunkStore, InMemoryChunkStore};
pub use types::{
    ConflictCase, ConflictType, DedupAction, DedupDecision, DedupStrategy, DedupThresholds,
    DeduplicationResult, DocumentChunk, ManualResolution, Similarity, SourceAttribution,
    CRITICAL_METADATA_FIELDS,
};
