//! Compatibility validation logic.

use std::sync::Arc;
use std::time::Duration;

use crate::config::CompatConfig;
use crate::metadata::EmbeddingConfig;
use crate::migration::estimate::estimate;
use crate::provider::{Credential, ProviderError, ProviderRegistry};

use super::dim_cache::DimensionCompatibilityCache;
use super::error::CompatError;
use super::types::{Issue, ProviderModelInfo, Severity, ValidationReport};

const CREDENTIAL_TIMEOUT_SECS: u64 = 30;

/// Validates provider/model combinations and proposed tenant configuration changes.
pub struct CompatValidator {
    registry: ProviderRegistry,
    dim_cache: DimensionCompatibilityCache,
}

impl CompatValidator {
    /// Builds a validator over a provider registry and a compat-specific config.
    pub fn new(registry: ProviderRegistry, config: &CompatConfig) -> Self {
        Self {
            registry,
            dim_cache: DimensionCompatibilityCache::new(config.cache_ttl_hours),
        }
    }

    /// Validates a bare (provider, model), optionally with a credential to check.
    pub async fn validate(
        &self,
        provider: &str,
        model: &str,
        credential: Option<&Credential>,
    ) -> Result<ValidationReport, CompatError> {
        if provider.is_empty() || model.is_empty() {
            return Err(CompatError::InvalidArgument(
                "provider and model must be non-empty".to_string(),
            ));
        }

        let mut report = ValidationReport::builder(provider, model);

        let adapter = match self.registry.get(provider) {
            Ok(adapter) => adapter,
            Err(_) => {
                report.push_issue(
                    Issue::new(Severity::Error, "unsupported_provider", format!("unknown provider '{provider}'")),
                    0.0,
                );
                self.dim_cache.put(provider, model, None, false, Some("unsupported provider".to_string()));
                return Ok(report.finalize());
            }
        };

        match adapter.dimension(model).await {
            Ok(dimension) => {
                report.dimension = Some(dimension);
                self.dim_cache.put(provider, model, Some(dimension), true, None);
            }
            Err(ProviderError::ModelUnavailable { .. }) => {
                report.push_issue(
                    Issue::new(Severity::Error, "unknown_model", format!("model '{model}' is not known to provider '{provider}'")),
                    0.5,
                );
                self.dim_cache.put(provider, model, None, false, Some("unknown model".to_string()));
            }
            Err(e) => {
                report.push_issue(
                    Issue::new(Severity::Warning, "dimension_lookup_failed", e.to_string())
                        .with_remediation("retry once the provider recovers"),
                    0.8,
                );
                self.dim_cache.put(provider, model, None, false, Some(e.to_string()));
            }
        }

        if let Some(credential) = credential {
            self.validate_credential(&adapter, credential, &mut report).await;
        }

        Ok(report.finalize())
    }

    async fn validate_credential(
        &self,
        adapter: &Arc<dyn crate::provider::EmbeddingProvider>,
        credential: &Credential,
        report: &mut ValidationReport,
    ) {
        let outcome = tokio::time::timeout(
            Duration::from_secs(CREDENTIAL_TIMEOUT_SECS),
            adapter.validate_credential(credential),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                report.push_issue(
                    Issue::new(Severity::Error, "credential_invalid", e.to_string())
                        .with_remediation("re-check the credential for this provider"),
                    0.3,
                );
            }
            Err(_) => {
                report.push_issue(
                    Issue::new(Severity::Warning, "credential_check_timed_out", "credential validation timed out"),
                    0.9,
                );
            }
        }
    }

    /// Validates a proposed configuration change against a tenant's current
    /// configuration, attaching a migration estimate when dimensions disagree.
    pub async fn validate_change(
        &self,
        current: &EmbeddingConfig,
        new_provider: &str,
        new_model: &str,
        chunk_count: u64,
        migration_batch_size: u64,
        credential: Option<&Credential>,
    ) -> Result<ValidationReport, CompatError> {
        let mut report = self.validate(new_provider, new_model, credential).await?;

        if current.provider == new_provider && current.model == new_model {
            report.issues.push(Issue::new(Severity::Info, "no_change", "requested configuration matches the current one"));
            return Ok(report);
        }

        if let Some(new_dimension) = report.dimension {
            if new_dimension != current.dimension {
                report.migration_required = true;
                let est = estimate(chunk_count, migration_batch_size);
                report.estimated_migration_time_secs = Some(est.seconds);
                report.metadata = serde_json::json!({
                    "chunk_count": chunk_count,
                    "batches": est.batches,
                    "estimated_human": est.human,
                });
            }
        }

        Ok(report)
    }

    /// Lists known (provider, model) pairs whose dimension matches `target_dimension`,
    /// excluding any tag in `exclude`.
    pub fn alternatives(&self, target_dimension: u64, exclude: &[String]) -> Vec<ProviderModelInfo> {
        self.dim_cache
            .known_pairs()
            .into_iter()
            .filter_map(|(provider, model)| {
                if exclude.contains(&provider) {
                    return None;
                }
                let entry = self.dim_cache.get(&provider, &model)?;
                let dimension = entry.dimension.filter(|d| *d == target_dimension)?;
                Some(ProviderModelInfo { provider, model, dimension })
            })
            .collect()
    }

    /// Re-validates every provider/model pair this validator's registry knows about,
    /// refreshing the matrix used by [`Self::alternatives`].
    pub async fn validate_all(&self) -> Result<Vec<ValidationReport>, CompatError> {
        let mut reports = Vec::new();
        for tag in self.registry.tags() {
            let adapter = self.registry.get(&tag)?;
            let models = adapter.list_models(None).await.unwrap_or_default();
            for model in models {
                reports.push(self.validate(&tag, &model, None).await?);
            }
        }
        Ok(reports)
    }
}
