//! Per-tenant vector collection abstraction.
//!
//! Canonical collection keys are tenant ids; migrations use timestamped prefixes
//! (`new_<tenant>_<epoch>`, `backup_<tenant>_<epoch>`) to avoid name collisions with the
//! canonical key or with each other.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::{CollectionClient, QdrantCollectionClient};
pub use error::CollectionError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockCollectionClient;
pub use types::{point_id_for_chunk, VectorPoint};

/// Canonical collection key for a tenant.
pub fn canonical_key(tenant: &str) -> String {
    tenant.to_string()
}

/// Temporary collection key used while migrating a tenant, distinct from the canonical
/// key and timestamped so repeated migrations never collide.
pub fn temp_key(prefix: &str, tenant: &str, epoch_secs: i64) -> String {
    format!("{prefix}_{tenant}_{epoch_secs}")
}
