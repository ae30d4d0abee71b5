//! Error handling for the study engine

use serde::Serialize;
use study_core::ValidationError;
use thiserror::Error;

/// Engine error types
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure taxonomy seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    Validation,
    Conflict,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }

    /// Whether the caller may simply retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}

impl StudyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Database(_) | Self::Migration(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for StudyError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_check_violation() => {
                Self::Internal(format!("constraint violated: {}", db.message()))
            }
            sqlx::Error::PoolTimedOut => Self::Timeout("database pool".to_string()),
            _ => {
                tracing::error!(error = %err, "database error");
                Self::Database(err)
            }
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StudyError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for StudyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {err}"))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, StudyError>;
