//! In-memory [`CollectionClient`], the default test and demo backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::client::CollectionClient;
use super::error::CollectionError;
use super::types::VectorPoint;

#[derive(Default, Clone)]
struct MockCollection {
    dimension: u64,
    points: HashMap<u64, VectorPoint>,
}

/// In-memory collection store, keyed by collection name. Used by every test in this
/// crate that exercises migration, compat, or cache-residual persistence.
#[derive(Default)]
pub struct MockCollectionClient {
    collections: RwLock<HashMap<String, MockCollection>>,
}

impl MockCollectionClient {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of collections currently held, canonical and temporary alike.
    /// Used by tests to confirm a rollback or cleanup phase left no stray temporary
    /// collections behind.
    pub fn collection_count(&self) -> usize {
        self.collections.read().len()
    }
}

#[async_trait]
impl CollectionClient for MockCollectionClient {
    async fn create_collection(&self, name: &str, dimension: u64) -> Result<(), CollectionError> {
        self.collections.write().insert(
            name.to_string(),
            MockCollection {
                dimension,
                points: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, CollectionError> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn delete_collection(&self, name: &str) -> Result<(), CollectionError> {
        self.collections.write().remove(name);
        Ok(())
    }

    async fn dimension(&self, name: &str) -> Result<Option<u64>, CollectionError> {
        Ok(self.collections.read().get(name).map(|c| c.dimension))
    }

    async fn point_count(&self, name: &str) -> Result<u64, CollectionError> {
        self.collections
            .read()
            .get(name)
            .map(|c| c.points.len() as u64)
            .ok_or_else(|| CollectionError::NotFound {
                collection: name.to_string(),
            })
    }

    async fn upsert_points(&self, name: &str, points: Vec<VectorPoint>) -> Result<(), CollectionError> {
        let mut guard = self.collections.write();
        let coll = guard.get_mut(name).ok_or_else(|| CollectionError::NotFound {
            collection: name.to_string(),
        })?;
        for point in points {
            if point.vector.len() as u64 != coll.dimension {
                return Err(CollectionError::InvalidDimension {
                    collection: name.to_string(),
                    expected: coll.dimension,
                    actual: point.vector.len() as u64,
                });
            }
            coll.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn delete_points(&self, name: &str, ids: &[u64]) -> Result<(), CollectionError> {
        let mut guard = self.collections.write();
        let coll = guard.get_mut(name).ok_or_else(|| CollectionError::NotFound {
            collection: name.to_string(),
        })?;
        for id in ids {
            coll.points.remove(id);
        }
        Ok(())
    }

    async fn list_points(&self, name: &str) -> Result<Vec<VectorPoint>, CollectionError> {
        let guard = self.collections.read();
        let coll = guard.get(name).ok_or_else(|| CollectionError::NotFound {
            collection: name.to_string(),
        })?;
        Ok(coll.points.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let client = MockCollectionClient::new();
        client.ensure_collection("t1", 3).await.unwrap();
        client.upsert_points("t1", vec![VectorPoint::new(1, vec![1.0, 2.0, 3.0], "c1")])
            .await
            .unwrap();
        client.ensure_collection("t1", 3).await.unwrap();
        assert_eq!(client.point_count("t1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_rejects_dimension_mismatch() {
        let client = MockCollectionClient::new();
        client.create_collection("t1", 3).await.unwrap();
        let result = client
            .upsert_points("t1", vec![VectorPoint::new(1, vec![1.0, 2.0], "c1")])
            .await;
        assert!(matches!(result, Err(CollectionError::InvalidDimension { .. })));
    }

    #[tokio::test]
    async fn delete_collection_then_exists_is_false() {
        let client = MockCollectionClient::new();
        client.create_collection("t1", 3).await.unwrap();
        client.delete_collection("t1").await.unwrap();
        assert!(!client.collection_exists("t1").await.unwrap());
    }
}
