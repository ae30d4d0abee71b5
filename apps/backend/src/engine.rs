//! The study engine: collaborators wired together.

use std::sync::Arc;

use study_core::{SpacedRepetitionAlgorithm, Sm2};

use crate::config::EngineConfig;
use crate::context::RequestContext;
use crate::db::Database;
use crate::error::Result;
use crate::models::{StudySettings, UserId};
use crate::services::audit::{AuditEntry, AuditEvent, AuditLog, TracingAuditLog};
use crate::services::auth::{AuthResolver, ContextAuth};
use crate::services::canonicalize::{Canonicalizer, NormalizingCanonicalizer};
use crate::services::clock::{Clock, SystemClock};
use crate::services::settings::SettingsProvider;
use crate::store::{CardStore, IdempotencyStore, MemoryStore, ProgressStore};

/// Largest batch accepted by `batch_save` unless configured otherwise.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Shared, cheaply clonable handle to every collaborator an operation needs.
#[derive(Clone)]
pub struct StudyEngine {
    pub(crate) cards: Arc<dyn CardStore>,
    pub(crate) progress: Arc<dyn ProgressStore>,
    pub(crate) idempotency: Arc<dyn IdempotencyStore>,
    pub(crate) settings: Arc<dyn SettingsProvider>,
    pub(crate) audit: Arc<dyn AuditLog>,
    pub(crate) canonicalizer: Arc<dyn Canonicalizer>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) auth: Arc<dyn AuthResolver>,
    pub(crate) algorithm: Arc<dyn SpacedRepetitionAlgorithm>,
    pub(crate) max_batch_size: usize,
}

impl StudyEngine {
    /// Engine over an in-process store.
    pub fn with_memory_store(store: Arc<MemoryStore>) -> Self {
        Self {
            cards: store.clone(),
            progress: store.clone(),
            idempotency: store.clone(),
            settings: store,
            audit: Arc::new(TracingAuditLog),
            canonicalizer: Arc::new(NormalizingCanonicalizer),
            clock: Arc::new(SystemClock::default()),
            auth: Arc::new(ContextAuth),
            algorithm: Arc::new(Sm2::default()),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Engine over PostgreSQL. The audit trail goes to the `audit_log` table.
    pub fn with_database(db: Arc<Database>, config: &EngineConfig) -> Self {
        Self {
            cards: db.clone(),
            progress: db.clone(),
            idempotency: db.clone(),
            settings: db.clone(),
            audit: db,
            canonicalizer: Arc::new(NormalizingCanonicalizer),
            clock: Arc::new(SystemClock {
                rollover_hour: config.day_rollover_hour,
            }),
            auth: Arc::new(ContextAuth),
            algorithm: Arc::new(Sm2::default()),
            max_batch_size: config.max_batch_size,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_canonicalizer(mut self, canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_card_store(mut self, cards: Arc<dyn CardStore>) -> Self {
        self.cards = cards;
        self
    }

    pub fn with_progress_store(mut self, progress: Arc<dyn ProgressStore>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthResolver>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub(crate) fn current_user(&self, ctx: &RequestContext) -> Result<UserId> {
        self.auth.current_user(ctx)
    }

    /// Stored settings, or defaults when the user has none.
    pub(crate) async fn settings_for(
        &self,
        ctx: &RequestContext,
        user: UserId,
    ) -> Result<StudySettings> {
        let settings = ctx
            .bounded("settings.get", self.settings.get_settings(user))
            .await?;
        Ok(settings.unwrap_or_default())
    }

    /// Append to the audit trail. Failures are logged and swallowed.
    pub(crate) async fn record_audit(&self, ctx: &RequestContext, actor: UserId, event: AuditEvent) {
        let entry = AuditEntry {
            actor,
            at: self.clock.now(),
            event,
        };
        if let Err(err) = ctx.bounded("audit.append", self.audit.append(&entry)).await {
            tracing::warn!(
                error = %err,
                action = entry.event.action(),
                "failed to append audit entry"
            );
        }
    }
}
