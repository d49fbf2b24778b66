//! "cloud-a" embedding provider adapter, a REST API reached over `reqwest`.

use async_trait::async_trait;
use std::time::Duration;

use super::adapter::{Credential, EmbeddingProvider};
use super::error::ProviderError;

const MODELS: &[(&str, u64)] = &[("model-1", 768), ("model-2", 1536)];

/// Adapter for the "cloud-a" embedding API.
pub struct CloudAProvider {
    base_url: String,
    http: reqwest::Client,
}

impl CloudAProvider {
    /// Builds an adapter targeting `base_url`, with a sane request timeout.
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

    fn map_status(&self, status: reqwest::StatusCode, body: &str) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::InvalidCredential {
                provider: self.tag().to_string(),
            },
            429 => ProviderError::RateLimited {
                provider: self.tag().to_string(),
                retry_after_secs: None,
            },
            408 | 502 | 503 | 504 => ProviderError::Transient {
                provider: self.tag().to_string(),
                message: body.to_string(),
            },
            _ => ProviderError::Permanent {
                provider: self.tag().to_string(),
                message: format!("{status}: {body}"),
            },
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CloudAProvider {
    fn tag(&self) -> &str {
        "cloud-a"
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

        let response = self
            .http
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(credential.expose())
            .json(&serde_json::json!({"model": model, "input": texts}))
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                provider: self.tag().to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_status(status, &body));
        }

        let payload: CloudAEmbeddingResponse =
            response.json().await.map_err(|e| ProviderError::Permanent {
                provider: self.tag().to_string(),
                message: format!("malformed response: {e}"),
            })?;

        Ok(payload.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn validate_credential(&self, credential: &Credential) -> Result<(), ProviderError> {
        self.embed(&["ping".to_string()], "model-1", Some(credential))
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
struct CloudAEmbeddingResponse {
    data: Vec<CloudAEmbeddingDatum>,
}

#[derive(serde::Deserialize)]
struct CloudAEmbeddingDatum {
    embedding: Vec<f32>,
}
