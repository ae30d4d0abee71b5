//! Per-request context: caller identity, deadline and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, StudyError};
use crate::models::UserId;

/// Default bound for a single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything an operation needs to know about the request that triggered it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    principal: Option<UserId>,
    cancel: CancellationToken,
    timeout: Duration,
}

impl RequestContext {
    /// Anonymous context; operations will fail with `Unauthorized`.
    pub fn anonymous() -> Self {
        Self {
            principal: None,
            cancel: CancellationToken::new(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Context for an authenticated user.
    pub fn for_user(user: UserId) -> Self {
        Self {
            principal: Some(user),
            ..Self::anonymous()
        }
    }

    /// Bound every collaborator call made on behalf of this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tie the request to an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn principal(&self) -> Option<UserId> {
        self.principal
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with `Cancelled` if the caller has gone away.
    pub fn ensure_active(&self, stage: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::debug!(stage, "request cancelled");
            return Err(StudyError::Cancelled(stage.to_string()));
        }
        Ok(())
    }

    /// Run one external call under the request's timeout.
    pub async fn bounded<T, F>(&self, call: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(call, timeout_ms = self.timeout.as_millis() as u64, "call timed out");
                Err(StudyError::Timeout(call.to_string()))
            }
        }
    }
}
