//! Uniform embedding provider interface.

use async_trait::async_trait;

use super::error::ProviderError;

/// A credential handed to a provider adapter. Adapters never log this value — the
/// resolver never logs the credential itself, and the same discipline applies once
/// it reaches the adapter.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret for use in an authenticated request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One capability interface collapsing every provider-specific embedding client. One
/// concrete implementation exists per provider; [`super::registry::ProviderRegistry`]
/// maps provider tags to instances.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider tag, e.g. `"cloud-a"`.
    fn tag(&self) -> &str;

    /// Whether this provider requires a credential to embed.
    fn requires_credential(&self) -> bool {
        true
    }

    /// Embeds `texts` under `model`, preserving input order. Empty input returns empty
    /// output without a network call.
    async fn embed(
        &self,
        texts: &[String],
        model: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Validates a credential without embedding anything.
    async fn validate_credential(&self, credential: &Credential) -> Result<(), ProviderError>;

    /// Lists models this provider offers, if discoverable without a credential;
    /// providers that require one may accept `None` and return their static catalog.
    async fn list_models(&self, credential: Option<&Credential>) -> Result<Vec<String>, ProviderError>;

    /// Returns the output vector dimension for `model`, if known without a network
    /// call (most providers publish this statically per model).
    async fn dimension(&self, model: &str) -> Result<u64, ProviderError>;
}
