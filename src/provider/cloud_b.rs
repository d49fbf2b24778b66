//! "cloud-b" embedding provider adapter.
//!
//! Structurally close to [`super::cloud_a::CloudAProvider`] but with its own model
//! catalog and response shape, demonstrating why the capability interface exists:
//! callers never branch on provider identity.

use async_trait::async_trait;
use std::time::Duration;

use super::adapter::{Credential, EmbeddingProvider};
use super::error::ProviderError;

const MODELS: &[(&str, u64)] = &[("text-small", 384), ("text-large", 1024)];

/// Adapter for the "cloud-b" embedding API.
pub struct CloudBProvider {
    base_url: String,
    http: reqwest::Client,
}

impl CloudBProvider {
    /// Builds an adapter targeting `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    fn model_dimension(model: &str) -> Option<u64> {
        MODELS.iter().find(|(m, _)| *m == model).map(|(_, d)| *d)
    }
}

#[async_trait]
impl EmbeddingProvider for CloudBProvider {
    fn tag(&self) -> &str {
        "cloud-b"
    }

    async fn embed(
        &self,
        texts: &[String],
        model: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let credential = credential.ok_or_else(|| ProviderError::InvalidCredential {
            provider: self.tag().to_string(),
        })?;
        let dimension = self.dimension(model).await?;

        let response = self
            .http
            .post(format!("{}/embed", self.base_url))
            .header("X-Api-Key", credential.expose())
            .json(&serde_json::json!({"model": model, "texts": texts}))
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: self.tag().to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::InvalidCredential {
                provider: self.tag().to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                provider: self.tag().to_string(),
                retry_after_secs: response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            });
        }
        if status.is_server_error() {
            return Err(ProviderError::Transient {
                provider: self.tag().to_string(),
                message: status.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Permanent {
                provider: self.tag().to_string(),
                message: status.to_string(),
            });
        }

        let payload: CloudBEmbedResponse = response.json().await.map_err(|e| ProviderError::Permanent {
            provider: self.tag().to_string(),
            message: format!("malformed response: {e}"),
        })?;

        for vector in &payload.vectors {
            if vector.len() as u64 != dimension {
                return Err(ProviderError::Permanent {
                    provider: self.tag().to_string(),
                    message: format!("vector length {} does not match declared dimension {dimension}", vector.len()),
                });
            }
        }
        Ok(payload.vectors)
    }

    async fn validate_credential(&self, credential: &Credential) -> Result<(), ProviderError> {
        self.embed(&["ping".to_string()], "text-small", Some(credential))
            .await
            .map(|_| ())
    }

    async fn list_models(&self, _credential: Option<&Credential>) -> Result<Vec<String>, ProviderError> {
        Ok(MODELS.iter().map(|(m, _)| m.to_string()).collect())
    }

    async fn dimension(&self, model: &str) -> Result<u64, ProviderError> {
        Self::model_dimension(model).ok_or_else(|| ProviderError::ModelUnavailable {
            provider: self.tag().to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(serde::Deserialize)]
struct CloudBEmbedResponse {
    vectors: Vec<Vec<f32>>,
}
