//! Deterministic in-process [`EmbeddingProvider`] used by every test in this crate that
//! does not specifically exercise HTTP error mapping.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::adapter::{Credential, EmbeddingProvider};
use super::error::ProviderError;

/// Mock provider: deterministically "embeds" text by hashing it into a fixed-dimension
/// vector, and can be configured to fail specific calls for testing retry/backoff and
/// failure-ratio logic.
pub struct MockProvider {
    tag: String,
    dimension: u64,
    valid_credential: Option<String>,
    failures: RwLock<BTreeMap<String, ProviderError>>,
}

impl MockProvider {
    /// Builds a mock provider with a fixed output dimension.
    pub fn new(tag: impl Into<String>, dimension: u64) -> Self {
        Self {
            tag: tag.into(),
            dimension,
            valid_credential: None,
            failures: RwLock::new(BTreeMap::new()),
        }
    }

    /// Requires `secret` as the only valid credential.
    pub fn with_credential(mut self, secret: impl Into<String>) -> Self {
        self.valid_credential = Some(secret.into());
        self
    }

    /// Forces every `embed` call for `text` to fail with `error` (test hook for
    /// exercising migration retry/backoff and the 0.5 failure-ratio stop condition).
    pub fn fail_on(&self, text: &str, error: ProviderError) {
        self.failures.write().insert(text.to_string(), error);
    }

    fn pseudo_embed(&self, text: &str) -> Vec<f32> {
        let hash = crate::hashing::fingerprint(text.as_bytes());
        (0..self.dimension)
            .map(|i| {
                let byte = hash[(i as usize) % hash.len()];
                (byte as f32 / 255.0) - 0.5
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn requires_credential(&self) -> bool {
        self.valid_credential.is_some()
    }

    async fn embed(
        &self,
        texts: &[String],
        _model: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = &self.valid_credential {
            let ok = credential.map(|c| c.expose() == expected).unwrap_or(false);
            if !ok {
                return Err(ProviderError::InvalidCredential {
                    provider: self.tag.clone(),
                });
            }
        }

        let failures = self.failures.read();
        for text in texts {
            if let Some(err) = failures.get(text) {
                return Err(err.clone());
            }
        }
        Ok(texts.iter().map(|t| self.pseudo_embed(t)).collect())
    }

    async fn validate_credential(&self, credential: &Credential) -> Result<(), ProviderError> {
        match &self.valid_credential {
            Some(expected) if credential.expose() == expected => Ok(()),
            Some(_) => Err(ProviderError::InvalidCredential {
                provider: self.tag.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn list_models(&self, _credential: Option<&Credential>) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["mock-model".to_string()])
    }

    async fn dimension(&self, _model: &str) -> Result<u64, ProviderError> {
        Ok(self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_preserves_order_and_is_deterministic() {
        let provider = MockProvider::new("mock", 8);
        let texts = vec!["a".to_string(), "b".to_string()];
        let first = provider.embed(&texts, "mock-model", None).await.unwrap();
        let second = provider.embed(&texts, "mock-model", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].len(), 8);
    }

    #[tokio::test]
    async fn empty_input_returns_empty_output_without_credential_check() {
        let provider = MockProvider::new("mock", 8).with_credential("secret");
        let result = provider.embed(&[], "mock-model", None).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn missing_required_credential_is_invalid_credential() {
        let provider = MockProvider::new("mock", 8).with_credential("secret");
        let result = provider.embed(&["x".to_string()], "mock-model", None).await;
        assert!(matches!(result, Err(ProviderError::InvalidCredential { .. })));
    }

    #[tokio::test]
    async fn fail_on_forces_a_specific_text_to_error() {
        let provider = MockProvider::new("mock", 4);
        provider.fail_on(
            "poison",
            ProviderError::Transient {
                provider: "mock".to_string(),
                message: "boom".to_string(),
            },
        );
        let result = provider.embed(&["poison".to_string()], "mock-model", None).await;
        assert!(matches!(result, Err(ProviderError::Transient { .. })));
    }
}
