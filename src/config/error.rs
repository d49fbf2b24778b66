//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or validating [`super::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric environment variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    ParseError {
        /// Environment variable name.
        name: &'static str,
        /// Raw string value.
        value: String,
        /// Underlying parse error.
        #[source]
        source: std::num::ParseIntError,
    },

    /// A float environment variable could not be parsed.
    #[error("failed to parse {name}='{value}' as a float: {source}")]
    FloatParseError {
        /// Environment variable name.
        name: &'static str,
        /// Raw string value.
        value: String,
        /// Underlying parse error.
        #[source]
        source: std::num::ParseFloatError,
    },

    /// A value was parsed but falls outside the allowed range.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Configuration field name.
        name: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}
