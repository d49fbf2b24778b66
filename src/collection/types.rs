//! Vector collection data model.

use std::collections::BTreeMap;

use serde_json::Value;

/// A single point stored in a collection: a chunk's vector plus carried-forward
/// identity and metadata.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    /// Point id, stable across migrations (carried forward from the source chunk).
    pub id: u64,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Owning chunk id.
    pub chunk_id: String,
    /// Payload metadata copied alongside the vector.
    pub metadata: BTreeMap<String, Value>,
}

impl VectorPoint {
    /// Builds a point from a chunk id and vector, with no extra metadata.
    pub fn new(id: u64, vector: Vec<f32>, chunk_id: impl Into<String>) -> Self {
        Self {
            id,
            vector,
            chunk_id: chunk_id.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches metadata, builder-style.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Derives a stable point id from a chunk id, so re-embedding the same chunk during a
/// migration reuses its original point identity.
pub fn point_id_for_chunk(chunk_id: &str) -> u64 {
    crate::hashing::fingerprint_u64(chunk_id.as_bytes())
}
