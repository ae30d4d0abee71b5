//! Collaborators that fail on purpose.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use study_backend::models::{Counter, DailyProgress, UserId};
use study_backend::services::audit::{AuditEntry, AuditLog};
use study_backend::store::{MemoryStore, ProgressStore};
use study_backend::{Result, StudyError};

/// Audit sink that rejects every entry.
pub struct FailingAuditLog;

#[async_trait]
impl AuditLog for FailingAuditLog {
    async fn append(&self, _entry: &AuditEntry) -> Result<()> {
        Err(StudyError::Internal("audit sink unavailable".to_string()))
    }
}

/// Progress store that reads and creates rows but cannot change counters.
pub struct FrozenCounters {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl ProgressStore for FrozenCounters {
    async fn get_progress(&self, user: UserId, day: NaiveDate) -> Result<Option<DailyProgress>> {
        self.inner.get_progress(user, day).await
    }

    async fn ensure_progress(&self, user: UserId, day: NaiveDate) -> Result<DailyProgress> {
        self.inner.ensure_progress(user, day).await
    }

    async fn compare_and_set(
        &self,
        _user: UserId,
        _day: NaiveDate,
        _counter: Counter,
        _expected: u32,
        _next: u32,
    ) -> Result<bool> {
        Err(StudyError::Internal("counter write failed".to_string()))
    }

    async fn add_to_counter(
        &self,
        _user: UserId,
        _day: NaiveDate,
        _counter: Counter,
        _delta: u32,
    ) -> Result<DailyProgress> {
        Err(StudyError::Internal("counter write failed".to_string()))
    }

    async fn set_goal_override(
        &self,
        user: UserId,
        day: NaiveDate,
        value: Option<u32>,
    ) -> Result<DailyProgress> {
        self.inner.set_goal_override(user, day, value).await
    }
}
