//! Best-effort audit trail.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};
use crate::models::{CardId, CardStatus, UserId};

/// One audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: UserId,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuditEvent {
    Review {
        card_id: CardId,
        rating: u8,
        new_state: CardStatus,
        due_at: Option<DateTime<Utc>>,
    },
    PromoteNew {
        count: usize,
        card_ids: Vec<CardId>,
    },
    BatchSave {
        idempotency_key: Option<String>,
        saved: usize,
        skipped: usize,
    },
    CreateCard {
        card_id: CardId,
    },
}

impl AuditEvent {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Review { .. } => "review",
            Self::PromoteNew { .. } => "promote_new",
            Self::BatchSave { .. } => "batch_save",
            Self::CreateCard { .. } => "create_card",
        }
    }

    pub fn card_id(&self) -> Option<CardId> {
        match self {
            Self::Review { card_id, .. } | Self::CreateCard { card_id } => Some(*card_id),
            _ => None,
        }
    }
}

/// Sink for audit entries. Failures never fail the audited operation.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<()>;
}

/// Emits entries as `tracing` events on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.event)?;
        tracing::info!(
            target: "audit",
            actor = %entry.actor,
            action = entry.event.action(),
            %payload,
            "audit entry"
        );
        Ok(())
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| StudyError::Internal("audit log lock poisoned".to_string()))?
            .push(entry.clone());
        Ok(())
    }
}
