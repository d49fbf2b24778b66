//! Provider tag → [`EmbeddingProvider`] instance map.

use std::collections::HashMap;
use std::sync::Arc;

use super::adapter::EmbeddingProvider;
use super::error::ProviderError;

/// Resolves a provider tag to its adapter.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn EmbeddingProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own tag, builder-style.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.providers.insert(provider.tag().to_string(), provider);
        self
    }

    /// Looks up an adapter by provider tag.
    pub fn get(&self, provider: &str) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        self.providers
            .get(provider)
            .cloned()
            .ok_or_else(|| ProviderError::ModelUnavailable {
                provider: provider.to_string(),
                model: String::new(),
            })
    }

    /// Lists every registered provider tag.
    pub fn tags(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}
