//! Card creation and content hashing.

use sha2::{Digest, Sha256};
use study_core::dedup::dedup_key;
use study_core::ValidationError;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::engine::StudyEngine;
use crate::error::{Result, StudyError};
use crate::models::{CardSnapshot, CreateCardRequest, NewCard};
use crate::services::audit::AuditEvent;

/// Hash a dedup key for storage and the per-user uniqueness constraint.
pub fn hash_content(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Reject blank front or back text. `index` locates the item in a batch.
pub(crate) fn require_text(front: &str, back: &str, index: usize) -> Result<()> {
    if front.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            field: "front",
            index,
        }
        .into());
    }
    if back.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            field: "back",
            index,
        }
        .into());
    }
    Ok(())
}

impl StudyEngine {
    /// Duplicate key for a front/back pair, through the canonicalizer.
    pub(crate) async fn content_key(
        &self,
        ctx: &RequestContext,
        front: &str,
        back: &str,
    ) -> Result<String> {
        let front = ctx
            .bounded("canonicalize", self.canonicalizer.canonicalize(front))
            .await?;
        let back = ctx
            .bounded("canonicalize", self.canonicalizer.canonicalize(back))
            .await?;
        Ok(dedup_key(&front, &back))
    }

    /// Create one card. Fails with `Conflict` if the user already has a live
    /// card with the same content.
    #[tracing::instrument(skip(self, ctx, request))]
    pub async fn create_card(
        &self,
        ctx: &RequestContext,
        request: CreateCardRequest,
    ) -> Result<CardSnapshot> {
        let user = self.current_user(ctx)?;
        require_text(&request.front, &request.back, 0)?;
        ctx.ensure_active("create_card")?;

        let key = self.content_key(ctx, &request.front, &request.back).await?;
        let draft = NewCard {
            id: Uuid::new_v4(),
            front: request.front,
            back: request.back,
            provenance: request.provenance,
            content_hash: hash_content(&key),
        };

        let now = self.clock.now();
        let card = ctx
            .bounded(
                "cards.insert",
                self.cards
                    .insert_ignoring_duplicates(user, std::slice::from_ref(&draft), now),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StudyError::Conflict("a card with the same content already exists".to_string())
            })?;

        tracing::info!(%user, card_id = %card.id, provenance = card.provenance.as_str(), "card created");
        self.record_audit(ctx, user, AuditEvent::CreateCard { card_id: card.id })
            .await;

        Ok(card.to_snapshot())
    }
}
