//! Provider Adapter Layer: a uniform embedding API over heterogeneous providers.

pub mod adapter;
pub mod cloud_a;
pub mod cloud_b;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod registry;

pub use adapter::{Credential, EmbeddingProvider};
pub use cloud_a::CloudAProvider;
pub use cloud_b::CloudBProvider;
pub use error::ProviderError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockProvider;
pub use registry::ProviderRegistry;
