//! Chunk storage abstraction.
//!
//! Chunks are owned by the relational store; this trait is the
//! seam ECCMS uses to read/mutate them, following the crate's usual
//! one-trait-per-concern pattern (`VectorDbClient`, `CloudOps`).

use async_trait::async_trait;

use super::error::DedupError;
use super::types::DocumentChunk;

/// Storage seam for tenant document chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Lists all chunks for a tenant, optionally restricted to `chunk_ids`.
    async fn list(
        &self,
        tenant: &str,
        chunk_ids: Option<&[String]>,
    ) -> Result<Vec<DocumentChunk>, DedupError>;

    /// Lists all chunks for a single document.
    async fn list_for_document(
        &self,
        tenant: &str,
        document_id: &str,
    ) -> Result<Vec<DocumentChunk>, DedupError>;

    /// Replaces a chunk's metadata (used after a merge folds sources into the primary).
    async fn update_metadata(
        &self,
        tenant: &str,
        chunk_id: &str,
        metadata: std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Result<(), DedupError>;

    /// Deletes chunks, as a single logical transaction: either all succeed or none do.
    async fn delete_many(&self, tenant: &str, chunk_ids: &[String]) -> Result<(), DedupError>;
}

/// In-memory [`ChunkStore`] used by tests and as the default deployable backend when no
/// external relational store is wired in.
#[derive(Default)]
pub struct InMemoryChunkStore {
    chunks: parking_lot::RwLock<Vec<DocumentChunk>>,
}

impl InMemoryChunkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with chunks (test/demo helper).
    pub fn seed(&self, chunks: Vec<DocumentChunk>) {
        self.chunks.write().extend(chunks);
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn list(
        &self,
        tenant: &str,
        chunk_ids: Option<&[String]>,
    ) -> Result<Vec<DocumentChunk>, DedupError> {
        let guard = self.chunks.read();
        Ok(guard
            .iter()
            .filter(|c| c.tenant == tenant)
            .filter(|c| chunk_ids.is_none_or(|ids| ids.contains(&c.chunk_id)))
            .cloned()
            .collect())
    }

    async fn list_for_document(
        &self,
        tenant: &str,
        document_id: &str,
    ) -> Result<Vec<DocumentChunk>, DedupError> {
        let guard = self.chunks.read();
        Ok(guard
            .iter()
            .filter(|c| c.tenant == tenant && c.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn update_metadata(
        &self,
        tenant: &str,
        chunk_id: &str,
        metadata: std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Result<(), DedupError> {
        let mut guard = self.chunks.write();
        let chunk = guard
            .iter_mut()
            .find(|c| c.tenant == tenant && c.chunk_id == chunk_id)
            .ok_or_else(|| DedupError::ChunkNotFound {
                chunk_id: chunk_id.to_string(),
            })?;
        chunk.metadata = metadata;
        Ok(())
    }

    async fn delete_many(&self, tenant: &str, chunk_ids: &[String]) -> Result<(), DedupError> {
        let mut guard = self.chunks.write();
        guard.retain(|c| !(c.tenant == tenant && chunk_ids.contains(&c.chunk_id)));
        Ok(())
    }
}
