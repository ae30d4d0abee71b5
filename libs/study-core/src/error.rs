//! Error types for study-core.

use thiserror::Error;

/// Result type alias using ValidationError.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rating {0} is outside 0..=3")]
    RatingOutOfRange(i64),

    #[error("goal must be >= 0, got {0}")]
    NegativeGoal(i64),

    #[error("goal {value} exceeds the maximum of {max}")]
    GoalTooLarge { value: i64, max: i64 },

    #[error("requested count must be >= 0, got {0}")]
    NegativeCount(i64),

    #[error("malformed date '{0}', expected YYYY-MM-DD")]
    MalformedDate(String),

    #[error("batch of {size} items exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("batch is empty")]
    EmptyBatch,

    #[error("{field} must not be empty (item {index})")]
    EmptyField { field: &'static str, index: usize },
}
