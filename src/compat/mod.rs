//! Compatibility Validator: provider/model dimension checks and their memoization
//!.

pub mod dim_cache;
pub mod error;
pub mod types;
pub mod validator;

pub use dim_cache::{DimCacheEntry, DimensionCompatibilityCache};
pub use error::CompatError;
pub use types::{Issue, ProviderModelInfo, Severity, ValidationReport};
pub use validator::CompatValidator;
