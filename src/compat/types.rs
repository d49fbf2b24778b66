//! Compatibility validator data model.

use serde_json::Value;

/// How serious a validation [`Issue`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fails validation outright.
    Error,
    /// Degrades the compatibility score but does not fail validation by itself.
    Warning,
    /// Informational only.
    Info,
}

/// A single finding attached to a [`ValidationReport`].
#[derive(Debug, Clone)]
pub struct Issue {
    /// Severity.
    pub severity: Severity,
    /// Machine-readable code, e.g. `"unsupported_provider"`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Suggested remediation, if any.
    pub remediation: Option<String>,
}

impl Issue {
    /// Builds an issue.
    pub fn new(severity: Severity, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message: message.into(),
            remediation: None,
        }
    }

    /// Attaches a remediation, builder-style.
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}

/// A (provider, model, dimension) triple offered as an alternative.
#[derive(Debug, Clone)]
pub struct ProviderModelInfo {
    /// Provider tag.
    pub provider: String,
    /// Model tag.
    pub model: String,
    /// Output dimension.
    pub dimension: u64,
}

/// Result of validating a provider/model (or a proposed configuration change).
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Whether the configuration is usable (`score >= 0.7` and no error-level issues).
    pub is_valid: bool,
    /// Provider tag validated.
    pub provider: String,
    /// Model tag validated.
    pub model: String,
    /// Discovered dimension, if determinable.
    pub dimension: Option<u64>,
    /// Findings.
    pub issues: Vec<Issue>,
    /// Suggested next steps.
    pub recommendations: Vec<String>,
    /// Score in `[0, 1]`.
    pub compatibility_score: f64,
    /// Whether adopting this configuration requires a migration.
    pub migration_required: bool,
    /// Estimated migration duration in seconds, if `migration_required`.
    pub estimated_migration_time_secs: Option<f64>,
    /// Free-form extra detail (chunk counts, batch estimate, etc).
    pub metadata: Value,
}

impl ValidationReport {
    fn new(provider: &str, model: &str) -> Self {
        Self {
            is_valid: false,
            provider: provider.to_string(),
            model: model.to_string(),
            dimension: None,
            issues: Vec::new(),
            recommendations: Vec::new(),
            compatibility_score: 1.0,
            migration_required: false,
            estimated_migration_time_secs: None,
            metadata: Value::Null,
        }
    }

    pub(super) fn builder(provider: &str, model: &str) -> Self {
        Self::new(provider, model)
    }

    pub(super) fn push_issue(&mut self, issue: Issue, score_multiplier: f64) {
        self.compatibility_score *= score_multiplier;
        self.issues.push(issue);
    }

    pub(super) fn finalize(mut self) -> Self {
        self.compatibility_score = self.compatibility_score.clamp(0.0, 1.0);
        let has_error = self.issues.iter().any(|i| i.severity == Severity::Error);
        self.is_valid = self.compatibility_score >= 0.7 && !has_error;
        self
    }
}
