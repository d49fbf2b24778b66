//! Cache-surface error types.
//!
//! Cache Core itself is infallible by design: reads degrade to misses, writes are
//! swallowed with a log — only the Warming Scheduler's synchronous entry points can
//! reject a call outright.

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors raised by the warming scheduler's public surface. Failures *during*
/// warming execution are recorded on the task instead.
#[derive(Debug, Error)]
pub enum CacheError {
    /// `priority` was outside `[1, 10]`.
    #[error("warming priority must be in [1, 10], got {priority}")]
    InvalidPriority {
        /// The rejected priority.
        priority: u8,
    },

    /// More texts were submitted than the admin surface's cap allows.
    #[error("warming batch of {count} texts exceeds the cap of {max}")]
    TooManyTexts {
        /// Number of texts submitted.
        count: usize,
        /// The configured cap.
        max: usize,
    },

    /// No warming task exists with this id.
    #[error("warming task not found: {task_id}")]
    TaskNotFound {
        /// Task id.
        task_id: String,
    },

    /// The requested provider is not registered.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
