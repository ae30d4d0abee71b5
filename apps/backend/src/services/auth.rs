//! Caller identity resolution

use crate::context::RequestContext;
use crate::error::{Result, StudyError};
use crate::models::UserId;

pub trait AuthResolver: Send + Sync {
    fn current_user(&self, ctx: &RequestContext) -> Result<UserId>;
}

/// Trusts the principal the transport layer placed on the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAuth;

impl AuthResolver for ContextAuth {
    fn current_user(&self, ctx: &RequestContext) -> Result<UserId> {
        ctx.principal()
            .ok_or_else(|| StudyError::Unauthorized("no authenticated user".to_string()))
    }
}
